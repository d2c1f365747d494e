//! The Modules substream of the DBI stream: one entry per compiland (object file) plus a
//! handful of linker-synthesized pseudo-modules (`* Linker *`, `* CIL *`, etc).
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/dbi/modules.rs`

use super::header::StreamIndexU16;
use super::section_contrib::SectionContribEntry;
use bstr::BStr;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, U16, U32};
use zerocopy_derive::FromBytes;

/// The fixed-size portion of one Modules substream entry.
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct ModuleInfoFixed {
    pub unused1: U32<zerocopy::LE>,
    pub section_contrib: SectionContribEntry,
    pub flags: U16<zerocopy::LE>,
    pub stream: StreamIndexU16,
    /// Size, in bytes, of the symbol data within this module's stream (the CodeView symbol
    /// records).
    pub sym_byte_size: U32<zerocopy::LE>,
    pub c11_byte_size: U32<zerocopy::LE>,
    pub c13_byte_size: U32<zerocopy::LE>,
    pub source_file_count: U16<zerocopy::LE>,
    pub padding: [u8; 2],
    pub unused2: U32<zerocopy::LE>,
    pub source_file_name_index: U32<zerocopy::LE>,
    pub pdb_file_path_name_index: U32<zerocopy::LE>,
}

pub const MODULE_INFO_FIXED_LEN: usize = 64;

const_assert_eq!(size_of::<ModuleInfoFixed>(), MODULE_INFO_FIXED_LEN);

/// One entry of the Modules substream: the fixed header plus the module name and object-file
/// path that follow it.
#[derive(Debug)]
pub struct ModuleInfo<'a> {
    pub header: &'a ModuleInfoFixed,
    pub module_name: &'a BStr,
    pub obj_file: &'a BStr,
}

impl<'a> ModuleInfo<'a> {
    pub fn module_name(&self) -> &'a BStr {
        self.module_name
    }

    pub fn obj_file(&self) -> &'a BStr {
        self.obj_file
    }

    /// The module's own symbol stream, if it has compiled code (some linker-synthesized
    /// modules do not).
    pub fn stream(&self) -> Option<u32> {
        self.header.stream.get()
    }

    /// The number of bytes of CodeView symbol records at the start of the module's stream
    /// (after the 4-byte signature).
    pub fn sym_byte_size(&self) -> u32 {
        self.header.sym_byte_size.get()
    }
}

/// Iterates the entries of the Modules substream.
pub struct IterModuleInfo<'a> {
    rest: &'a [u8],
}

impl<'a> IterModuleInfo<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

impl<'a> Iterator for IterModuleInfo<'a> {
    type Item = ModuleInfo<'a>;

    fn next(&mut self) -> Option<ModuleInfo<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let mut p = codeview::parser::Parser::new(self.rest);
        let header: &'a ModuleInfoFixed = p.get().ok()?;
        let module_name = p.strz().ok()?;
        let obj_file = p.strz().ok()?;

        let mod_record_bytes = self.rest.len() - p.len();
        let alignment = (4 - (mod_record_bytes & 3)) & 3;
        if p.skip(alignment).is_err() {
            self.rest = &[];
            return None;
        }

        self.rest = p.into_rest();

        Some(ModuleInfo {
            header,
            module_name,
            obj_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module_bytes(name: &str, obj: &str) -> Vec<u8> {
        let mut data = vec![0u8; MODULE_INFO_FIXED_LEN];
        // stream index = nil (offset of `stream` within ModuleInfoFixed)
        let stream_off = 4 + size_of::<SectionContribEntry>() + 2;
        data[stream_off..stream_off + 2].copy_from_slice(&0xffffu16.to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.extend_from_slice(obj.as_bytes());
        data.push(0);
        let unaligned = data.len() & 3;
        let pad = (4 - unaligned) & 3;
        data.extend(std::iter::repeat(0u8).take(pad));
        data
    }

    #[test]
    fn iterates_one_module() {
        let data = sample_module_bytes("a.obj", "/src/a.obj");
        let mut it = IterModuleInfo::new(&data);
        let m = it.next().expect("one module");
        assert_eq!(m.module_name(), "a.obj");
        assert_eq!(m.obj_file(), "/src/a.obj");
        assert_eq!(m.stream(), None);
        assert!(it.next().is_none());
    }

    #[test]
    fn iterates_two_modules_back_to_back() {
        let mut data = sample_module_bytes("a.obj", "/src/a.obj");
        data.extend_from_slice(&sample_module_bytes("b.obj", "/src/b.obj"));
        let names: Vec<_> = IterModuleInfo::new(&data)
            .map(|m| m.module_name().to_string())
            .collect();
        assert_eq!(names, vec!["a.obj", "b.obj"]);
    }
}
