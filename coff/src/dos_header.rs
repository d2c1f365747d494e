//! The MS-DOS stub header that begins every PE image.
//!
//! # References
//! * <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format#ms-dos-stub-image-only>

use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy_derive::*;

/// The magic number at the start of an MS-DOS (and therefore PE) executable: `"MZ"`.
pub const IMAGE_DOS_SIGNATURE: u16 = 0x5a4d;

/// The MS-DOS header. Only `e_magic` and `e_lfanew` are meaningful to a PE reader; the
/// remaining fields describe the real-mode stub program and are not used here.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Default, Eq, PartialEq, IntoBytes, FromBytes, Immutable, KnownLayout)]
pub struct IMAGE_DOS_HEADER {
    pub e_magic: u16,
    pub e_cblp: u16,
    pub e_cp: u16,
    pub e_crlc: u16,
    pub e_cparhdr: u16,
    pub e_minalloc: u16,
    pub e_maxalloc: u16,
    pub e_ss: u16,
    pub e_sp: u16,
    pub e_csum: u16,
    pub e_ip: u16,
    pub e_cs: u16,
    pub e_lfarlc: u16,
    pub e_ovno: u16,
    pub e_res: [u16; 4],
    pub e_oemid: u16,
    pub e_oeminfo: u16,
    pub e_res2: [u16; 10],
    /// File offset of the PE header (the `"PE\0\0"` signature).
    pub e_lfanew: i32,
}

pub const IMAGE_SIZEOF_DOS_HEADER: usize = 64;

const_assert_eq!(size_of::<IMAGE_DOS_HEADER>(), IMAGE_SIZEOF_DOS_HEADER);
