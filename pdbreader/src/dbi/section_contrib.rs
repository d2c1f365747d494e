//! The Section Contributions substream of the DBI stream: which object file contributed which
//! byte range of which COFF section of the linked image.
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/dbi/section_contrib.rs`

use anyhow::bail;
use codeview::parser::Parser;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, LE, U16, U32, I32};
use zerocopy_derive::FromBytes;

/// Describes one section contribution: a byte range of a linked COFF section, and which module
/// (object file) contributed it.
#[allow(missing_docs)]
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
pub struct SectionContribEntry {
    /// One-based section index, matching the section headers stream.
    pub section: U16<LE>,
    pub padding1: [u8; 2],
    pub offset: I32<LE>,
    pub size: I32<LE>,
    pub characteristics: U32<LE>,
    /// Zero-based index into the Modules substream.
    pub module_index: U16<LE>,
    pub padding2: [u8; 2],
    pub data_crc: U32<LE>,
    pub reloc_crc: U32<LE>,
}

pub const SECTION_CONTRIB_ENTRY_LEN: usize = 28;

const_assert_eq!(size_of::<SectionContribEntry>(), SECTION_CONTRIB_ENTRY_LEN);

impl SectionContribEntry {
    /// Whether `offset` falls within this contribution's byte range.
    pub fn contains_offset(&self, offset: i32) -> bool {
        let self_offset = self.offset.get();
        if offset < self_offset {
            return false;
        }
        let overshoot = offset - self_offset;
        overshoot < self.size.get()
    }
}

/// Version tag at the start of a Section Contributions substream. This is the only version this
/// reader understands; anything else is rejected.
pub const SECTION_CONTRIBUTIONS_SUBSTREAM_VER60: u32 = 0xeffe_0000 + 19970605;

/// A parsed Section Contributions substream, sorted by `(section, offset)`.
pub struct SectionContributionsSubstream<'a> {
    pub contribs: &'a [SectionContribEntry],
}

impl<'a> SectionContributionsSubstream<'a> {
    /// Parses the substream. It is legal for it to be entirely empty.
    pub fn parse(bytes: &'a [u8]) -> anyhow::Result<Self> {
        let mut p = Parser::new(bytes);
        if p.is_empty() {
            return Ok(Self { contribs: &[] });
        }

        let version = p.u32()?;
        if version != SECTION_CONTRIBUTIONS_SUBSTREAM_VER60 {
            bail!(
                "section contributions substream has an unsupported version: 0x{version:08x}"
            );
        }

        let records_bytes = p.into_rest();
        let contribs = <[SectionContribEntry]>::ref_from_bytes(records_bytes).map_err(|_| {
            anyhow::anyhow!(
                "section contributions substream size {} is not a multiple of the record size",
                records_bytes.len()
            )
        })?;
        Ok(Self { contribs })
    }

    /// Finds the contribution containing `offset` within `section`, by binary search.
    pub fn find(&self, section: u16, offset: i32) -> Option<&SectionContribEntry> {
        let i = self.find_index(section, offset)?;
        Some(&self.contribs[i])
    }

    pub fn find_index(&self, section: u16, offset: i32) -> Option<usize> {
        match self
            .contribs
            .binary_search_by_key(&(section, offset), |c| (c.section.get(), c.offset.get()))
        {
            Ok(i) => Some(i),
            Err(i) => {
                if i > 0 && self.contribs[i - 1].contains_offset(offset) {
                    return Some(i - 1);
                }
                if i + 1 < self.contribs.len() && self.contribs[i + 1].contains_offset(offset) {
                    return Some(i + 1);
                }
                None
            }
        }
    }

    /// Finds the contribution containing `offset` within `section`, by linear scan. Used as a
    /// fallback, and in tests, to cross-check [`Self::find`].
    pub fn find_brute(&self, section: u16, offset: i32) -> Option<&SectionContribEntry> {
        let i = self.find_index_brute(section, offset)?;
        Some(&self.contribs[i])
    }

    pub fn find_index_brute(&self, section: u16, offset: i32) -> Option<usize> {
        self.contribs
            .iter()
            .position(|c| c.section.get() == section && c.contains_offset(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(section: u16, offset: i32, size: i32, module_index: u16) -> SectionContribEntry {
        SectionContribEntry {
            section: U16::new(section),
            padding1: [0; 2],
            offset: I32::new(offset),
            size: I32::new(size),
            characteristics: U32::new(0),
            module_index: U16::new(module_index),
            padding2: [0; 2],
            data_crc: U32::new(0),
            reloc_crc: U32::new(0),
        }
    }

    fn substream_bytes(entries: &[SectionContribEntry]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&SECTION_CONTRIBUTIONS_SUBSTREAM_VER60.to_le_bytes());
        for e in entries {
            data.extend_from_slice(e.as_bytes());
        }
        data
    }

    #[test]
    fn empty_substream_parses_to_no_contribs() {
        let s = SectionContributionsSubstream::parse(&[]).unwrap();
        assert!(s.contribs.is_empty());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        assert!(SectionContributionsSubstream::parse(&data).is_err());
    }

    #[test]
    fn find_locates_contribution_by_binary_search() {
        let entries = vec![
            entry(1, 0, 16, 0),
            entry(1, 16, 32, 1),
            entry(2, 0, 8, 2),
        ];
        let data = substream_bytes(&entries);
        let s = SectionContributionsSubstream::parse(&data).unwrap();

        let found = s.find(1, 20).expect("offset 20 in section 1");
        assert_eq!(found.module_index.get(), 1);

        assert_eq!(
            s.find(1, 20).map(|c| c.module_index.get()),
            s.find_brute(1, 20).map(|c| c.module_index.get())
        );
        assert!(s.find(1, 48).is_none());
        assert!(s.find(3, 0).is_none());
    }
}
