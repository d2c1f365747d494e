//! The coalesced symbol record stream (the "GSS"): a flat sequence of CodeView symbol records,
//! addressed by byte offset from both the GSI and the PSI hash tables, and from each module's
//! "global refs" section. Unlike a module's own symbol stream, it has no header of its own.
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/globals/gss.rs` (`GlobalSymbolStream`)

use anyhow::bail;
use codeview::syms::{Sym, SymIter};

/// A parsed coalesced symbol record stream.
pub struct GlobalSymbolStream {
    stream_data: Vec<u8>,
}

impl GlobalSymbolStream {
    pub fn new(stream_data: Vec<u8>) -> Self {
        Self { stream_data }
    }

    /// Decodes the symbol record at `record_offset`. Returns an error if the offset is out of
    /// range or does not point at a decodable record.
    pub fn get_sym_at(&self, record_offset: u32) -> anyhow::Result<Sym<'_>> {
        let Some(record_bytes) = self.stream_data.get(record_offset as usize..) else {
            bail!("record offset {record_offset} is out of range for the coalesced symbol stream");
        };

        SymIter::new(record_bytes).next().ok_or_else(|| {
            anyhow::anyhow!(
                "failed to decode a symbol record at offset {record_offset} in the coalesced symbol stream"
            )
        })
    }

    /// Iterates every symbol record in the stream, in on-disk order.
    pub fn iter_syms(&self) -> SymIter<'_> {
        SymIter::new(&self.stream_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeview::syms::SymKind;

    fn gproc32_record() -> Vec<u8> {
        let mut payload = vec![0u8; 4 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 2 + 1];
        payload.extend_from_slice(b"f\0");
        let pad = (4 - (payload.len() & 3)) & 3;
        payload.extend(std::iter::repeat(0u8).take(pad));

        let mut data = Vec::new();
        data.extend_from_slice(&((payload.len() + 2) as u16).to_le_bytes());
        data.extend_from_slice(&SymKind::S_GPROC32.0.to_le_bytes());
        data.extend_from_slice(&payload);
        data
    }

    #[test]
    fn fetches_record_at_offset() {
        let gss = GlobalSymbolStream::new(gproc32_record());
        let sym = gss.get_sym_at(0).unwrap();
        assert_eq!(sym.kind, SymKind::S_GPROC32);
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let gss = GlobalSymbolStream::new(gproc32_record());
        assert!(gss.get_sym_at(1_000_000).is_err());
    }

    #[test]
    fn iterates_all_records() {
        let mut data = gproc32_record();
        data.extend_from_slice(&gproc32_record());
        let gss = GlobalSymbolStream::new(data);
        assert_eq!(gss.iter_syms().count(), 2);
    }
}
