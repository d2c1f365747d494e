//! The Public Symbol Index: a name table over every `S_PUB32` record in the coalesced symbol
//! record stream, plus an address map this reader has no use for (it never does address-based
//! lookup; it enumerates every public symbol exhaustively via the name table alone).
//!
//! # References
//! * `examples/microsoft-pdb-rs/mspdb/src/globals/psi.rs`

use super::name_table::NameTable;
use codeview::parser::Parser;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, LE, U16, U32};
use zerocopy_derive::FromBytes;

/// The fixed-size header at the start of the PSI stream.
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct PsiStreamHeader {
    /// Length in bytes of the name table that immediately follows this header.
    pub name_table_size: U32<LE>,
    /// Length in bytes of the address map that immediately follows the name table.
    pub addr_table_size: U32<LE>,
    pub num_thunks: U32<LE>,
    pub thunk_size: U32<LE>,
    pub thunk_table_section: U16<LE>,
    pub padding: U16<LE>,
    pub thunk_table_offset: U32<LE>,
    pub num_sections: U32<LE>,
}

pub const PSI_STREAM_HEADER_LEN: usize = 28;

const_assert_eq!(size_of::<PsiStreamHeader>(), PSI_STREAM_HEADER_LEN);

/// A parsed PSI stream.
pub struct PublicSymbolIndex {
    name_table: NameTable,
}

impl PublicSymbolIndex {
    pub fn parse(stream_data: &[u8]) -> anyhow::Result<Self> {
        let mut p = Parser::new(stream_data);
        let header: &PsiStreamHeader = p
            .get()
            .map_err(|_| anyhow::anyhow!("PSI stream is too small for its header"))?;

        let name_table_bytes = p
            .bytes(header.name_table_size.get() as usize)
            .map_err(|_| anyhow::anyhow!("PSI name table region is truncated"))?;
        let name_table = NameTable::parse(name_table_bytes)?;

        Ok(Self { name_table })
    }

    /// A PSI with no records, for a PDB that has no public symbol index stream at all.
    pub fn empty() -> Self {
        Self {
            name_table: NameTable::empty(),
        }
    }

    /// Iterates the coalesced-symbol-stream offsets of every public symbol.
    pub fn iter_offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.name_table.iter_offsets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::name_table::{GSI_HASH_HEADER_SIGNATURE, GSI_HASH_SC_IMPV_V70};

    #[test]
    fn parses_header_and_embedded_name_table() {
        let mut name_table = Vec::new();
        name_table.extend_from_slice(&GSI_HASH_HEADER_SIGNATURE.to_le_bytes());
        name_table.extend_from_slice(&GSI_HASH_SC_IMPV_V70.to_le_bytes());
        name_table.extend_from_slice(&8u32.to_le_bytes());
        name_table.extend_from_slice(&0u32.to_le_bytes());
        name_table.extend_from_slice(&101i32.to_le_bytes());
        name_table.extend_from_slice(&1i32.to_le_bytes());

        let mut data = Vec::new();
        data.extend_from_slice(&(name_table.len() as u32).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&name_table);

        let psi = PublicSymbolIndex::parse(&data).unwrap();
        assert_eq!(psi.iter_offsets().collect::<Vec<_>>(), vec![100]);
    }
}
