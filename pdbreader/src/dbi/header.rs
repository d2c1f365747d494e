//! The fixed-size header of the DBI (Debug Information) stream.
//!
//! # References
//! * `examples/microsoft-pdb-rs/mspdb/src/dbi.rs` (`DbiStreamHeader`)
//! * `examples/original_source/src/pdbfile.cpp` (`flags & 0x1`, `flags & 0x2` literal bit tests)

use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, LE, I32, U16, U32};
use zerocopy_derive::FromBytes;

/// A 16-bit stream index, as stored on disk. The nil value `0xffff` means "no stream".
#[derive(Copy, Clone, Eq, PartialEq, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(transparent)]
pub struct StreamIndexU16(pub U16<LE>);

/// The stream index value that means "this stream does not exist".
pub const NIL_STREAM_INDEX: u16 = 0xffff;

impl StreamIndexU16 {
    /// Decodes this value, returning `None` if it is the nil stream index.
    pub fn get(&self) -> Option<u32> {
        let v = self.0.get();
        if v == NIL_STREAM_INDEX {
            None
        } else {
            Some(v as u32)
        }
    }
}

/// DBI stream version numbers. See `DbiStreamHeader::version`.
#[allow(missing_docs)]
pub mod dbi_version {
    pub const V41: u32 = 930803;
    pub const V50: u32 = 19960307;
    pub const V60: u32 = 19970606;
    pub const V70: u32 = 19990903;
    pub const V110: u32 = 20091201;
}

bitflags::bitflags! {
    /// Flags stored in [`DbiStreamHeader::flags`].
    ///
    /// The original implementation tests these as raw bit masks (`flags & 0x1`,
    /// `flags & 0x2`); this wraps them the way the rest of this codebase wraps flag words.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DbiFlags: u16 {
        /// The program was linked incrementally. Size figures may not reflect a from-scratch
        /// build.
        const INCREMENTALLY_LINKED = 0x1;
        /// Private symbols have been stripped from this PDB.
        const STRIPPED = 0x2;
        /// The PDB was built with `/DEBUG:CTYPES`.
        const HAS_CTYPES = 0x4;
    }
}

/// The fixed-size header at the start of the DBI stream (stream 3).
///
/// See `NewDBIHdr` in `microsoft-pdb`.
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct DbiStreamHeader {
    /// Always `-1`.
    pub signature: I32<LE>,
    pub version: U32<LE>,
    pub age: U32<LE>,
    pub global_symbol_index_stream: StreamIndexU16,
    pub build_number: U16<LE>,
    pub public_symbol_index_stream: StreamIndexU16,
    pub pdb_dll_version: U16<LE>,
    /// The coalesced symbol record stream (confusingly named in the original format; this is
    /// *not* the GSI, it is the stream that GSI/PSI hash records point into).
    pub global_symbol_stream: StreamIndexU16,
    pub pdb_dll_rbld: U16<LE>,
    pub mod_info_size: I32<LE>,
    pub section_contribution_size: I32<LE>,
    pub section_map_size: I32<LE>,
    pub source_info_size: I32<LE>,
    pub type_server_map_size: I32<LE>,
    pub mfc_type_server_index: U32<LE>,
    pub optional_dbg_header_size: I32<LE>,
    pub edit_and_continue_size: I32<LE>,
    pub flags: U16<LE>,
    pub machine: U16<LE>,
    pub padding: U32<LE>,
}

pub const DBI_STREAM_HEADER_LEN: usize = 64;

const_assert_eq!(size_of::<DbiStreamHeader>(), DBI_STREAM_HEADER_LEN);

impl DbiStreamHeader {
    /// The stream containing the coalesced symbol record stream (GSS).
    pub fn sym_record_stream(&self) -> Option<u32> {
        self.global_symbol_stream.get()
    }

    /// The stream containing the Global Symbol Index (GSI) hash table.
    pub fn global_stream_index(&self) -> Option<u32> {
        self.global_symbol_index_stream.get()
    }

    /// The stream containing the Public Symbol Index (PSI) hash table.
    pub fn public_stream_index(&self) -> Option<u32> {
        self.public_symbol_index_stream.get()
    }

    pub fn flags(&self) -> DbiFlags {
        DbiFlags::from_bits_truncate(self.flags.get())
    }
}

/// Byte ranges of each DBI substream, relative to the start of the DBI stream (after the
/// header).
pub struct DbiSubstreamRanges {
    pub modules: core::ops::Range<usize>,
    pub section_contributions: core::ops::Range<usize>,
    pub section_map: core::ops::Range<usize>,
    pub source_info: core::ops::Range<usize>,
    pub type_server_map: core::ops::Range<usize>,
    pub optional_dbg_header: core::ops::Range<usize>,
    pub edit_and_continue: core::ops::Range<usize>,
}

impl DbiSubstreamRanges {
    pub fn from_header(header: &DbiStreamHeader, stream_len: usize) -> anyhow::Result<Self> {
        let sizes = [
            header.mod_info_size.get(),
            header.section_contribution_size.get(),
            header.section_map_size.get(),
            header.source_info_size.get(),
            header.type_server_map_size.get(),
            header.optional_dbg_header_size.get(),
            header.edit_and_continue_size.get(),
        ];

        let mut ranges = Vec::with_capacity(sizes.len());
        let mut pos = DBI_STREAM_HEADER_LEN;
        for size in sizes {
            if size < 0 {
                anyhow::bail!("DBI stream has a substream with a negative size ({size})");
            }
            let end = pos
                .checked_add(size as usize)
                .ok_or_else(|| anyhow::anyhow!("DBI substream size overflows"))?;
            if end > stream_len {
                anyhow::bail!(
                    "DBI stream is too small for its substreams (need {end} bytes, have {stream_len})"
                );
            }
            ranges.push(pos..end);
            pos = end;
        }

        Ok(Self {
            modules: ranges[0].clone(),
            section_contributions: ranges[1].clone(),
            section_map: ranges[2].clone(),
            source_info: ranges[3].clone(),
            type_server_map: ranges[4].clone(),
            optional_dbg_header: ranges[5].clone(),
            edit_and_continue: ranges[6].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_decode_incremental_and_stripped() {
        let flags = DbiFlags::from_bits_truncate(0x3);
        assert!(flags.contains(DbiFlags::INCREMENTALLY_LINKED));
        assert!(flags.contains(DbiFlags::STRIPPED));
    }

    #[test]
    fn nil_stream_index_decodes_to_none() {
        let s = StreamIndexU16(U16::new(NIL_STREAM_INDEX));
        assert_eq!(s.get(), None);
    }
}
