//! Fixed-layout structures for the type records that the TPI size oracle understands.
//!
//! Only the record kinds needed to compute type sizes are represented here: arrays, classes,
//! structures, unions, enums, pointers, modifiers, bitfields, and procedure signatures.

#![allow(missing_docs)]

use super::{TypeIndex, TypeIndexLe};
use crate::parser::{Number, Parse, Parser, ParserError};
use bstr::BStr;
use std::fmt::Debug;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, LE, U16, U32};

bitfield::bitfield! {
    /// Bit field structure describing class/struct/union/enum properties.
    ///
    /// See `CV_prop_t` in `cvinfo.h`.
    pub struct UdtProperties(u16);
    impl Debug;

    pub packed,        set_packed:        0;
    pub ctor,          set_ctor:          1;
    pub ovlops,        set_ovlops:        2;
    pub isnested,      set_isnested:      3;
    pub cnested,       set_cnested:       4;
    pub opassign,      set_opassign:      5;
    pub opcast,        set_opcast:        6;
    pub fwdref,        set_fwdref:        7;
    pub scoped,        set_scoped:        8;
    pub hasuniquename, set_hasuniquename: 9;
    pub sealed,        set_sealed:        10;
    pub hfa,           set_hfa:           11, 12;
    pub intrinsic,     set_intrinsic:     13;
    pub mocom,         set_mocom:         14;
}

#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned)]
#[repr(transparent)]
pub struct UdtPropertiesLe(pub U16<LE>);

impl Debug for UdtPropertiesLe {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        Debug::fmt(&self.get(), fmt)
    }
}

impl UdtPropertiesLe {
    #[inline(always)]
    pub fn get(&self) -> UdtProperties {
        UdtProperties(self.0.get())
    }
}

/// `LF_ENUM`
#[derive(Clone, Debug)]
pub struct Enum<'a> {
    pub fixed: &'a EnumFixed,
    pub name: &'a BStr,
    pub unique_name: Option<&'a BStr>,
}

#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
#[repr(C)]
pub struct EnumFixed {
    pub count: U16<LE>,
    pub property: UdtPropertiesLe,
    pub underlying_type: TypeIndexLe,
    pub fields: TypeIndexLe,
}

impl<'a> Parse<'a> for Enum<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &EnumFixed = p.get()?;
        let name = p.strz()?;
        let unique_name = if fixed.property.get().hasuniquename() {
            Some(p.strz()?)
        } else {
            None
        };
        Ok(Self {
            fixed,
            name,
            unique_name,
        })
    }
}

impl<'a> Enum<'a> {
    /// The underlying integer type of this enumeration. Its size is the size of the enum.
    pub fn underlying_type(&self) -> TypeIndex {
        self.fixed.underlying_type.get()
    }
}

/// For `LF_ARRAY`
#[derive(Clone, Debug)]
pub struct Array<'a> {
    pub fixed: &'a ArrayFixed,
    pub len: Number<'a>,
    pub name: &'a BStr,
}

#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
#[repr(C)]
pub struct ArrayFixed {
    pub element_type: TypeIndexLe,
    pub index_type: TypeIndexLe,
}

impl<'a> Parse<'a> for Array<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Array {
            fixed: p.get()?,
            len: p.number()?,
            name: p.strz()?,
        })
    }
}

impl<'a> Array<'a> {
    /// The total size of the array, in bytes, as encoded directly in the record.
    pub fn byte_size(&self) -> Result<u64, ParserError> {
        u64::try_from(self.len)
    }
}

/// For `LF_CLASS`, `LF_STRUCTURE`, and `LF_INTERFACE`.
#[derive(Clone, Debug)]
pub struct Struct<'a> {
    pub fixed: &'a StructFixed,
    pub length: Number<'a>,
    pub name: &'a BStr,
    pub unique_name: Option<&'a BStr>,
}

#[repr(C)]
#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
pub struct StructFixed {
    /// Number of elements (members, bases, etc) described by the field list.
    pub num_elements: U16<LE>,

    pub property: UdtPropertiesLe,

    pub field_list: TypeIndexLe,

    pub derivation_list: TypeIndexLe,

    pub vtable_shape: TypeIndexLe,
    // numeric leaf (length) and two strings follow
}

impl<'a> Parse<'a> for Struct<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &StructFixed = p.get()?;
        let length = p.number()?;
        let name = p.strz()?;
        let unique_name = if fixed.property.get().hasuniquename() {
            Some(p.strz()?)
        } else {
            None
        };
        Ok(Struct {
            fixed,
            length,
            name,
            unique_name,
        })
    }
}

impl<'a> Struct<'a> {
    /// True if this record is only a forward declaration (no field list / size available).
    pub fn is_forward_ref(&self) -> bool {
        self.fixed.property.get().fwdref()
    }

    /// The size of the class/structure/interface, in bytes.
    pub fn byte_size(&self) -> Result<u64, ParserError> {
        u64::try_from(self.length)
    }
}

/// `LF_UNION`
#[derive(Clone, Debug)]
pub struct Union<'a> {
    pub fixed: &'a UnionFixed,
    pub length: Number<'a>,
    pub name: &'a BStr,
    pub unique_name: Option<&'a BStr>,
}

#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
#[repr(C)]
pub struct UnionFixed {
    pub count: U16<LE>,
    pub property: UdtPropertiesLe,
    pub fields: TypeIndexLe,
}

impl<'a> Parse<'a> for Union<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &UnionFixed = p.get()?;
        let length = p.number()?;
        let name = p.strz()?;
        let unique_name = if fixed.property.get().hasuniquename() {
            Some(p.strz()?)
        } else {
            None
        };
        Ok(Union {
            fixed,
            length,
            name,
            unique_name,
        })
    }
}

impl<'a> Union<'a> {
    pub fn is_forward_ref(&self) -> bool {
        self.fixed.property.get().fwdref()
    }

    pub fn byte_size(&self) -> Result<u64, ParserError> {
        u64::try_from(self.length)
    }
}

/// Type modifier record (`LF_MODIFIER`)
///
/// Defines a qualified variation (`const`, `volatile`, `unaligned`) of another type. Its size is
/// always the same as the size of the underlying type.
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TypeModifier {
    pub underlying_type: TypeIndexLe,
    pub attributes: U16<LE>,
}

impl Parse<'_> for TypeModifier {
    fn from_parser(p: &mut Parser<'_>) -> Result<Self, ParserError> {
        p.copy()
    }
}

impl TypeModifier {
    pub fn attributes(&self) -> TypeModifierBits {
        TypeModifierBits(self.attributes.get())
    }
}

bitfield::bitfield! {
    #[repr(transparent)]
    #[derive(Clone)]
    pub struct TypeModifierBits(u16);
    impl Debug;

    pub is_const, set_is_const: 0;
    pub is_volatile, set_is_volatile: 1;
    pub is_unaligned, set_is_unaligned: 2;
    pub reserved, set_reserved: 3, 15;
}

/// `LF_PROCEDURE` - a free function's signature. This record has no intrinsic byte size; it is
/// only used to resolve call signatures, not to size objects.
#[repr(C)]
#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
pub struct Proc {
    pub return_value: TypeIndexLe,
    pub call: u8,
    pub reserved: u8,
    pub num_params: U16<LE>,
    pub arg_list: TypeIndexLe,
}

/// `LF_BITFIELD` - describes a bitfield member. Its allocated storage is the size of the
/// underlying integer type, not the bit width.
///
/// See `lfBitfield` in `cvinfo.h`.
#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
#[repr(C)]
pub struct Bitfield {
    pub underlying_type: TypeIndexLe,
    pub length_bits: u8,
    pub position_bits: u8,
}

impl Parse<'_> for Bitfield {
    fn from_parser(p: &mut Parser<'_>) -> Result<Self, ParserError> {
        p.copy()
    }
}

/// `LF_POINTER`
#[derive(IntoBytes, Immutable, KnownLayout, FromBytes, Unaligned, Debug)]
#[repr(C)]
pub struct PointerFixed {
    pub ty: TypeIndexLe,
    pub attr: U32<LE>,
}

impl PointerFixed {
    pub fn attr(&self) -> PointerFlags {
        PointerFlags::from_bits(self.attr.get())
    }
}

#[derive(Clone)]
pub struct Pointer<'a> {
    pub fixed: &'a PointerFixed,
    pub variant: &'a [u8],
}

impl<'a> Parse<'a> for Pointer<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed = p.get()?;
        let variant = p.take_rest();
        Ok(Self { fixed, variant })
    }
}

impl<'a> Debug for Pointer<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let attr = self.fixed.attr();
        write!(fmt, "ty: {:?} attr: 0x{:08x} {:?}", self.fixed.ty.get(), attr.0, attr)
    }
}

bitfield::bitfield! {
    pub struct PointerFlags(u32);
    impl Debug;
    pub pointer_kind, set_pointer_kind: 4, 0;
    pub mode, set_mode: 7, 5;
    pub flat32, set_flat32: 8;
    pub volatile, set_volatile: 9;
    pub r#const, set_const: 10;
    pub unaligned, set_unaligned: 11;
    pub restrict, set_restrict: 12;
    pub size, set_size: 13, 18;
    pub ismocom, set_ismocom: 19;
    pub islref, set_islref: 20;
    pub isrref, set_isrref: 21;
    pub unused, set_unused: 31, 22;
}

impl PointerFlags {
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

/// `CV_ptrtype` values for [`PointerFlags::pointer_kind`]. See `cvinfo.h`.
pub mod ptr_kind {
    /// 16-bit near pointer
    pub const CV_PTR_NEAR: u32 = 0x00;
    /// 16-bit far pointer
    pub const CV_PTR_FAR: u32 = 0x01;
    /// 16-bit huge pointer
    pub const CV_PTR_HUGE: u32 = 0x02;
    /// 32-bit near pointer
    pub const CV_PTR_NEAR32: u32 = 0x0a;
    /// 48-bit 16:32 far pointer
    pub const CV_PTR_FAR32: u32 = 0x0b;
    /// 64-bit near pointer
    pub const CV_PTR_64: u32 = 0x0c;
}

/// `CV_ptrmode` values for [`PointerFlags::mode`]. See `cvinfo.h`.
pub mod ptr_mode {
    /// An ordinary pointer
    pub const CV_PTR_MODE_PTR: u32 = 0x00;
    /// A reference
    pub const CV_PTR_MODE_REF: u32 = 0x01;
    /// Pointer-to-data-member
    pub const CV_PTR_MODE_PMEM: u32 = 0x02;
    /// Pointer-to-member-function
    pub const CV_PTR_MODE_PMFUNC: u32 = 0x03;
    /// An rvalue reference
    pub const CV_PTR_MODE_RVREF: u32 = 0x04;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_kind_ptr64_is_8_bytes() {
        let mut attr = PointerFlags::from_bits(0);
        attr.set_pointer_kind(ptr_kind::CV_PTR_64);
        assert_eq!(attr.pointer_kind(), ptr_kind::CV_PTR_64);
    }
}
