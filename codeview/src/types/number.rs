//! Decodes "numeric leaves", the variable-length encoding CodeView uses for integer and
//! floating-point constants that appear embedded in type records (array lengths, structure
//! sizes, enumerator values, etc).

use super::Leaf;
use crate::parser::{Parse, Parser, ParserError};
use std::fmt::{Debug, Formatter};

/// A numeric value embedded in a type record.
///
/// Numeric leaves begin with a `u16` tag. If the tag is less than [`Leaf::LF_NUMERIC`]
/// (0x8000), then the tag itself _is_ the value, and no further bytes are consumed. Otherwise,
/// the tag names the representation (e.g. `LF_LONG`, `LF_REAL64`) and is followed by the
/// encoded value.
#[derive(Clone, Copy)]
pub struct Number<'a> {
    /// The raw bytes of this numeric leaf, including the leading tag.
    pub bytes: &'a [u8],
}

impl<'a> Number<'a> {
    /// Returns the leaf tag that describes the representation of this number.
    pub fn kind(&self) -> Leaf {
        Leaf(u16::from_le_bytes([self.bytes[0], self.bytes[1]]))
    }

    /// Returns the raw bytes of this numeric leaf, including the leading tag.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> Debug for Number<'a> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        if let Ok(v) = u64::try_from(*self) {
            write!(fmt, "{v}")
        } else {
            write!(fmt, "Number({:?})", self.kind())
        }
    }
}

impl<'a> Parse<'a> for Number<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let start = p.peek_rest();
        let tag = p.u16()?;

        let more_len: usize = if tag < Leaf::LF_NUMERIC {
            0
        } else {
            match Leaf(tag) {
                Leaf::LF_CHAR => 1,
                Leaf::LF_SHORT | Leaf::LF_USHORT => 2,
                Leaf::LF_LONG | Leaf::LF_ULONG | Leaf::LF_REAL32 => 4,
                Leaf::LF_QUADWORD | Leaf::LF_UQUADWORD | Leaf::LF_REAL64 => 8,
                Leaf::LF_REAL16 => 2,
                Leaf::LF_REAL80 => 10,
                Leaf::LF_REAL128 => 16,
                Leaf::LF_COMPLEX32 => 8,
                Leaf::LF_COMPLEX64 => 16,
                Leaf::LF_COMPLEX80 => 20,
                Leaf::LF_COMPLEX128 => 32,
                Leaf::LF_OCTWORD | Leaf::LF_UOCTWORD | Leaf::LF_DECIMAL => 16,
                Leaf::LF_DATE => 8,
                Leaf::LF_VARSTRING => {
                    let len = p.u16()? as usize;
                    p.bytes(len)?;
                    let consumed = start.len() - p.peek_rest().len();
                    return Ok(Number {
                        bytes: &start[..consumed],
                    });
                }
                Leaf::LF_UTF8STRING => {
                    p.skip_strz()?;
                    let consumed = start.len() - p.peek_rest().len();
                    return Ok(Number {
                        bytes: &start[..consumed],
                    });
                }
                _ => {
                    return Err(ParserError::new());
                }
            }
        };

        p.bytes(more_len)?;
        let consumed = start.len() - p.peek_rest().len();
        Ok(Number {
            bytes: &start[..consumed],
        })
    }
}

macro_rules! try_from_number {
    ($($t:ty),* $(,)?) => {
        $(
            impl<'a> TryFrom<Number<'a>> for $t {
                type Error = ParserError;

                fn try_from(n: Number<'a>) -> Result<Self, ParserError> {
                    let tag = n.kind();
                    if tag.0 < Leaf::LF_NUMERIC {
                        return Ok(tag.0 as $t);
                    }

                    let rest = &n.bytes[2..];
                    match tag {
                        Leaf::LF_CHAR => Ok(rest[0] as i8 as $t),
                        Leaf::LF_SHORT => Ok(i16::from_le_bytes(rest.try_into().unwrap()) as $t),
                        Leaf::LF_USHORT => Ok(u16::from_le_bytes(rest.try_into().unwrap()) as $t),
                        Leaf::LF_LONG => Ok(i32::from_le_bytes(rest.try_into().unwrap()) as $t),
                        Leaf::LF_ULONG => Ok(u32::from_le_bytes(rest.try_into().unwrap()) as $t),
                        Leaf::LF_QUADWORD => Ok(i64::from_le_bytes(rest.try_into().unwrap()) as $t),
                        Leaf::LF_UQUADWORD => Ok(u64::from_le_bytes(rest.try_into().unwrap()) as $t),
                        _ => Err(ParserError::new()),
                    }
                }
            }
        )*
    }
}

try_from_number!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate() {
        let bytes = 100u16.to_le_bytes();
        let n = Number::parse(&bytes).unwrap();
        assert_eq!(u64::try_from(n).unwrap(), 100);
    }

    #[test]
    fn ulong() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Leaf::LF_ULONG.0.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        let n = Number::parse(&bytes).unwrap();
        assert_eq!(u64::try_from(n).unwrap(), 0x0001_0000);
        assert_eq!(n.as_bytes().len(), bytes.len());
    }
}
