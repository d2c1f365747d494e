//! Definitions for Portable Executable (PE) COFF binaries (Windows binaries)

#![allow(non_camel_case_types)]
#![forbid(unsafe_code)]

pub mod debug_directory;
pub mod dll_characteristics;
pub mod dos_header;
pub mod image;
pub mod machine;
pub mod reloc;
pub mod section;

pub use debug_directory::*;
pub use dll_characteristics::*;
pub use dos_header::*;
pub use image::*;
pub use machine::*;
pub use reloc::*;
pub use section::*;
