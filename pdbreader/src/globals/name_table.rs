//! The name-to-symbol hash table shared by the GSI and PSI streams.
//!
//! The on-disk format supports two historical layouts ("large" and "small"); only the "small"
//! layout (identified by [`GSI_HASH_HEADER_SIGNATURE`]/[`GSI_HASH_HEADER_VERSION`]) has been
//! observed in any PDB produced since Visual C++ 7, so that is the only one this reader
//! understands. Bucket offsets exist only to accelerate name lookup, which this reader never
//! does (it enumerates every record exhaustively); they are skipped over rather than decoded.
//!
//! # References
//! * `examples/microsoft-pdb-rs/mspdb/src/globals/name_table.rs` (`NameTable::parse`, "small" branch)

use codeview::parser::Parser;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, LE, I32, U32};
use zerocopy_derive::FromBytes;

/// Signature value for [`NameTableHeader::signature`] that marks the "small" hash table format.
pub const GSI_HASH_HEADER_SIGNATURE: u32 = 0xffff_ffff;

/// Version tag for the "small" hash table format, as written by Visual C++ since VS2002.
pub const GSI_HASH_SC_IMPV_V70: u32 = 0xeffe_0000 + 19990810;

/// The header at the start of a name table (the entire GSI stream, or the name table region
/// embedded in the PSI stream).
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct NameTableHeader {
    pub signature: U32<LE>,
    pub version: U32<LE>,
    /// Size in bytes of the hash records region that immediately follows this header.
    pub hash_records_size: U32<LE>,
    /// Size in bytes of the hash buckets region that immediately follows the hash records.
    pub buckets_size: U32<LE>,
}

pub const NAME_TABLE_HEADER_LEN: usize = 16;

const_assert_eq!(size_of::<NameTableHeader>(), NAME_TABLE_HEADER_LEN);

/// One entry in a name table: the byte offset (plus one; zero is reserved) of a symbol record
/// in the coalesced symbol record stream.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct HashRecord {
    pub offset: I32<LE>,
    pub c_ref: I32<LE>,
}

pub const HASH_RECORD_LEN: usize = 8;

const_assert_eq!(size_of::<HashRecord>(), HASH_RECORD_LEN);

impl HashRecord {
    /// The byte offset of the referenced symbol record in the coalesced symbol record stream.
    pub fn gss_offset(&self) -> Option<u32> {
        let v = self.offset.get();
        if v <= 0 {
            None
        } else {
            Some((v - 1) as u32)
        }
    }
}

/// A parsed name table: just the hash records, enumerated in on-disk order. Bucket offsets are
/// discarded.
pub struct NameTable {
    pub hash_records: Vec<HashRecord>,
}

impl NameTable {
    /// An empty name table, for the (legal) case where the stream it would come from does not
    /// exist at all.
    pub fn empty() -> Self {
        Self {
            hash_records: Vec::new(),
        }
    }

    /// Parses a name table from `bytes`, which must begin with a [`NameTableHeader`].
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut p = Parser::new(bytes);
        let header: &NameTableHeader = p
            .get()
            .map_err(|_| anyhow::anyhow!("name table is too small for its header"))?;

        if header.signature.get() != GSI_HASH_HEADER_SIGNATURE
            || header.version.get() != GSI_HASH_SC_IMPV_V70
        {
            anyhow::bail!(
                "name table uses an unsupported hash table format (signature 0x{:08x}, version 0x{:08x})",
                header.signature.get(),
                header.version.get()
            );
        }

        let hash_records_size = header.hash_records_size.get() as usize;
        let buckets_size = header.buckets_size.get() as usize;

        let hash_records_bytes = p
            .bytes(hash_records_size)
            .map_err(|_| anyhow::anyhow!("name table hash records region is truncated"))?;
        p.skip(buckets_size)
            .map_err(|_| anyhow::anyhow!("name table bucket region is truncated"))?;

        if hash_records_size % HASH_RECORD_LEN != 0 {
            anyhow::bail!(
                "name table hash records size {hash_records_size} is not a multiple of {HASH_RECORD_LEN}"
            );
        }
        let num_records = hash_records_size / HASH_RECORD_LEN;
        let hash_records = <[HashRecord]>::ref_from_bytes(hash_records_bytes)
            .map_err(|_| anyhow::anyhow!("name table hash records are misaligned"))?
            .get(..num_records)
            .ok_or_else(|| anyhow::anyhow!("name table hash records region is short"))?
            .to_vec();

        Ok(Self { hash_records })
    }

    /// Iterates the coalesced-symbol-stream offsets of every record in this table.
    pub fn iter_offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.hash_records.iter().filter_map(HashRecord::gss_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_bytes(records: &[(i32, i32)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&GSI_HASH_HEADER_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&GSI_HASH_SC_IMPV_V70.to_le_bytes());
        data.extend_from_slice(&((records.len() * HASH_RECORD_LEN) as u32).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        for (offset, c_ref) in records {
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&c_ref.to_le_bytes());
        }
        data
    }

    #[test]
    fn parses_records_and_skips_reserved_zero_offsets() {
        let data = table_bytes(&[(1, 1), (0, 0), (101, 1)]);
        let table = NameTable::parse(&data).unwrap();
        let offsets: Vec<u32> = table.iter_offsets().collect();
        assert_eq!(offsets, vec![0, 100]);
    }

    #[test]
    fn rejects_unsupported_signature() {
        let mut data = vec![0u8; NAME_TABLE_HEADER_LEN];
        assert!(NameTable::parse(&data[..]).is_err());
        data[0..4].copy_from_slice(&GSI_HASH_HEADER_SIGNATURE.to_le_bytes());
        assert!(NameTable::parse(&data).is_err());
    }
}
