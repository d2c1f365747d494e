//! The Optional Debug Header substream of the DBI stream: an array of stream indexes, each with
//! a fixed meaning determined by its position.
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/dbi/optional_dbg.rs`

use super::header::StreamIndexU16;
use zerocopy::FromBytes;

/// Identifies one of the well-known Optional Debug Header slots, by its index in the stream
/// index array.
#[allow(missing_docs)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct OptionalDebugStream(pub u32);

#[allow(missing_docs)]
impl OptionalDebugStream {
    pub const FPO_DATA: Self = Self(0);
    pub const EXCEPTION_DATA: Self = Self(1);
    pub const FIXUP_DATA: Self = Self(2);
    pub const OMAP_TO_SRC_DATA: Self = Self(3);
    pub const OMAP_FROM_SRC_DATA: Self = Self(4);
    /// A dump of every `IMAGE_SECTION_HEADER` from the linked image; this is what the
    /// size oracle uses to resolve `(section, offset)` pairs to RVAs.
    pub const SECTION_HEADER_DATA: Self = Self(5);
    pub const TOKEN_TO_RECORD_ID_MAP: Self = Self(6);
    pub const XDATA: Self = Self(7);
    pub const PDATA: Self = Self(8);
    pub const NEW_FPO_DATA: Self = Self(9);
    pub const ORIGINAL_SECTION_HEADER_DATA: Self = Self(10);
}

/// Decodes the Optional Debug Header substream.
pub struct OptionalDebugHeader<'a> {
    pub stream_indexes: &'a [StreamIndexU16],
}

impl<'a> OptionalDebugHeader<'a> {
    /// Parses the substream. It is legal for it to be entirely empty (no optional streams
    /// present at all).
    pub fn parse(bytes: &'a [u8]) -> anyhow::Result<Self> {
        let stream_indexes = <[StreamIndexU16]>::ref_from_bytes(bytes).map_err(|_| {
            anyhow::anyhow!(
                "optional debug header substream size {} is not a multiple of 2",
                bytes.len()
            )
        })?;
        Ok(Self { stream_indexes })
    }

    pub fn stream_by_index(&self, i: usize) -> Option<u32> {
        self.stream_indexes.get(i)?.get()
    }

    pub fn stream(&self, s: OptionalDebugStream) -> Option<u32> {
        self.stream_by_index(s.0 as usize)
    }

    pub fn num_streams(&self) -> usize {
        self.stream_indexes.len()
    }

    /// Iterates the present (non-nil) streams as `(index, stream)` pairs.
    pub fn iter_streams(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.stream_indexes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.get().map(|stream| (i, stream)))
    }

    /// The section headers stream index, if present. The size oracle needs this to resolve
    /// `(section, offset)` pairs to RVAs; its absence is a hard error for RVA resolution
    /// (but not for the rest of the report).
    pub fn section_headers_stream(&self) -> anyhow::Result<u32> {
        self.stream(OptionalDebugStream::SECTION_HEADER_DATA).ok_or_else(|| {
            anyhow::anyhow!("this PDB has no section headers stream; RVAs cannot be resolved")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::{LE, U16};

    fn idx(v: u16) -> StreamIndexU16 {
        StreamIndexU16(U16::<LE>::new(v))
    }

    #[test]
    fn empty_substream_has_no_streams() {
        let h = OptionalDebugHeader::parse(&[]).unwrap();
        assert_eq!(h.num_streams(), 0);
        assert_eq!(h.section_headers_stream().is_err(), true);
    }

    #[test]
    fn finds_section_headers_stream_at_its_fixed_slot() {
        let indexes = [idx(0xffff); 6];
        let mut bytes = Vec::new();
        for (i, s) in indexes.iter().enumerate() {
            if i == 5 {
                bytes.extend_from_slice(&42u16.to_le_bytes());
            } else {
                bytes.extend_from_slice(&s.0.get().to_le_bytes());
            }
        }
        let h = OptionalDebugHeader::parse(&bytes).unwrap();
        assert_eq!(h.section_headers_stream().unwrap(), 42);
        assert_eq!(
            h.iter_streams().collect::<Vec<_>>(),
            vec![(5, 42)]
        );
    }
}
