//! Iterates symbol records within a symbol stream (a Module Stream or the Global Symbol Stream).

use super::SymKind;
use crate::parser::{Parser, ParserError};
use crate::utils::iter::HasRestLen;

/// A single symbol record, as enumerated by [`SymIter`].
///
/// `Debug` is implemented by hand in `syms.rs` (prints just the kind).
#[derive(Clone, Copy)]
pub struct Sym<'a> {
    /// The kind of this symbol record.
    pub kind: SymKind,
    /// The payload of this symbol record. Does not include the length or kind fields.
    pub data: &'a [u8],
}

/// Iterates the symbol records within a symbol stream.
///
/// Each symbol record is prefixed by a `u16` length (which covers the kind field and the
/// payload, but not the length field itself) and a `u16` kind. Symbol records are aligned to a
/// 4-byte boundary.
#[derive(Clone)]
pub struct SymIter<'a> {
    rest: &'a [u8],
}

impl<'a> SymIter<'a> {
    /// Starts a new iterator over the given symbol record data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }

    /// Returns the bytes that have not yet been consumed.
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }
}

impl<'a> HasRestLen for SymIter<'a> {
    fn rest_len(&self) -> usize {
        self.rest.len()
    }
}

impl<'a> Iterator for SymIter<'a> {
    type Item = Sym<'a>;

    fn next(&mut self) -> Option<Sym<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let mut p = Parser::new(self.rest);

        let record_len = p.u16().ok()?;
        if record_len < 2 {
            return None;
        }

        let kind = p.u16().ok()?;
        let Ok(data) = p.bytes(record_len as usize - 2) else {
            return None;
        };

        self.rest = p.into_rest();

        Some(Sym {
            kind: SymKind(kind),
            data,
        })
    }
}

/// Parses the 4-byte signature that precedes symbol data in a Module Stream or the Global
/// Symbol Stream, and returns the remaining bytes (the symbol records themselves).
///
/// The only signature value in common use today is `4` (`CV_SIGNATURE_C13`).
pub fn split_sym_data_signature(stream_data: &[u8]) -> Result<(u32, &[u8]), ParserError> {
    let mut p = Parser::new(stream_data);
    let signature = p.u32()?;
    Ok((signature, p.into_rest()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_records() {
        let mut data = Vec::new();
        // S_END, length = 2 (just the kind field)
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&SymKind::S_END.0.to_le_bytes());

        let mut iter = SymIter::new(&data);
        let sym = iter.next().expect("one record");
        assert_eq!(sym.kind, SymKind::S_END);
        assert!(sym.data.is_empty());
        assert!(iter.next().is_none());
    }

    #[test]
    fn stops_on_truncated_record() {
        let data = [5, 0, 0, 0x11];
        let mut iter = SymIter::new(&data);
        assert!(iter.next().is_none());
    }
}
