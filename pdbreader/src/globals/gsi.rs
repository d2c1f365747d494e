//! The Global Symbol Index: a name table over every non-public global symbol in the coalesced
//! symbol record stream (`S_UDT`, `S_LDATA32`/`S_GDATA32`, `S_LTHREAD32`/`S_GTHREAD32`,
//! `S_CONSTANT`, `S_PROCREF` and friends — everything except `S_PUB32`, which is the PSI's job).
//!
//! # References
//! * `examples/microsoft-pdb-rs/mspdb/src/globals/gsi.rs`

use super::name_table::NameTable;

/// A parsed GSI stream: the entire stream is a [`NameTable`].
pub struct GlobalSymbolIndex {
    name_table: NameTable,
}

impl GlobalSymbolIndex {
    pub fn parse(stream_data: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name_table: NameTable::parse(stream_data)?,
        })
    }

    /// A GSI with no records, for a PDB that has no global symbol index stream at all.
    pub fn empty() -> Self {
        Self {
            name_table: NameTable::empty(),
        }
    }

    /// Iterates the coalesced-symbol-stream offsets of every record this index covers.
    pub fn iter_offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.name_table.iter_offsets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::name_table::{GSI_HASH_HEADER_SIGNATURE, GSI_HASH_SC_IMPV_V70};

    #[test]
    fn empty_stream_yields_no_offsets() {
        let mut data = Vec::new();
        data.extend_from_slice(&GSI_HASH_HEADER_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&GSI_HASH_SC_IMPV_V70.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let gsi = GlobalSymbolIndex::parse(&data).unwrap();
        assert_eq!(gsi.iter_offsets().count(), 0);
    }
}
