//! Decodes type records. Reads the Type Information (TPI) and Item Information (IPI) streams.
//!
//! # References
//!
//! * [`cvinfo.h`](https://github.com/microsoft/microsoft-pdb/blob/805655a28bd8198004be2ac27e6e0290121a5e89/include/cvinfo.h)
//! * [CodeView Type Records](https://llvm.org/docs/PDB/CodeViewTypes.html)

pub mod iter;
pub mod kind;
pub mod number;
pub mod primitive;
pub mod records;

#[doc(inline)]
pub use kind::Leaf;
pub use records::*;

use crate::parser::{Parse, Parser, ParserError};
use std::fmt::{Debug, Formatter};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, LE, U32};

/// Identifies a type record within the TPI stream, or a primitive type.
///
/// Values less than [`TypeIndex::MIN_BEGIN`] (0x1000) identify primitive types (see
/// [`primitive`]); values at or above it identify a record in the TPI stream, numbered in the
/// order in which records appear, starting at `0x1000`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    /// The first type index value that identifies a record in the TPI stream, rather than a
    /// primitive type.
    pub const MIN_BEGIN: TypeIndex = TypeIndex(0x1000);

    /// Returns the raw numeric value of this type index.
    pub fn get(self) -> u32 {
        self.0
    }

    /// True if this type index identifies one of the built-in primitive types, rather than a
    /// record in the TPI stream.
    pub fn is_primitive(self) -> bool {
        self.0 < Self::MIN_BEGIN.0
    }
}

impl Debug for TypeIndex {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_primitive() {
            let mut s = String::new();
            let _ = primitive::dump_primitive_type_index(&mut s, *self);
            fmt.write_str(&s)
        } else {
            write!(fmt, "0x{:x}", self.0)
        }
    }
}

/// The little-endian, on-disk encoding of a [`TypeIndex`].
#[derive(Copy, Clone, Eq, PartialEq, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(transparent)]
pub struct TypeIndexLe(pub U32<LE>);

impl TypeIndexLe {
    /// Decodes this value into a [`TypeIndex`].
    pub fn get(&self) -> TypeIndex {
        TypeIndex(self.0.get())
    }
}

impl Debug for TypeIndexLe {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.get(), fmt)
    }
}

/// Identifies a record within the IPI stream.
pub type ItemId = u32;

/// The little-endian, on-disk encoding of an [`ItemId`].
pub type ItemIdLe = U32<LE>;

/// The decoded payload of a type record.
///
/// Only the record kinds that the size oracle needs to understand are fully decoded; everything
/// else is captured as [`TypeData::Unknown`] along with its raw bytes.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum TypeData<'a> {
    Array(Array<'a>),
    Struct(Struct<'a>),
    Union(Union<'a>),
    Enum(Enum<'a>),
    Proc(&'a Proc),
    Pointer(Pointer<'a>),
    Modifier(TypeModifier),
    Bitfield(Bitfield),
    Unknown,
}

impl<'a> TypeData<'a> {
    /// Parses the payload of a type record, given its `kind`.
    pub fn parse(kind: Leaf, p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(match kind {
            Leaf::LF_ARRAY => Self::Array(p.parse()?),
            Leaf::LF_CLASS | Leaf::LF_STRUCTURE | Leaf::LF_INTERFACE => Self::Struct(p.parse()?),
            Leaf::LF_UNION => Self::Union(p.parse()?),
            Leaf::LF_ENUM => Self::Enum(p.parse()?),
            Leaf::LF_PROCEDURE => Self::Proc(p.get()?),
            Leaf::LF_POINTER => Self::Pointer(p.parse()?),
            Leaf::LF_MODIFIER => Self::Modifier(p.parse()?),
            Leaf::LF_BITFIELD => Self::Bitfield(p.parse()?),
            _ => Self::Unknown,
        })
    }

    /// Parses the payload of a type record from a byte slice.
    pub fn parse_bytes(kind: Leaf, data: &'a [u8]) -> Result<Self, ParserError> {
        Self::parse(kind, &mut Parser::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_type_index_is_not_min_begin() {
        assert!(TypeIndex::T_VOID.is_primitive());
        assert!(!TypeIndex::MIN_BEGIN.is_primitive());
    }
}
