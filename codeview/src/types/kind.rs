//! `LF_*` leaf kind constants, used to tag CodeView type records.

use std::fmt::{Debug, Formatter};

macro_rules! cv_leaf {
    (
        $(
            ($value:expr, $name:ident),
        )*
    ) => {
        impl Leaf {
            $(
                #[allow(missing_docs)]
                pub const $name: Leaf = Leaf($value);
            )*
        }

        static LEAF_NAMES: &[(u16, &str)] = &[
            $(
                ($value, stringify!($name)),
            )*
        ];
    }
}

/// Identifies the kind of a CodeView type record (a "leaf").
///
/// This is the `leaf` field that appears at the start of every record in the TPI and IPI
/// streams.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Leaf(pub u16);

impl Leaf {
    /// The boundary between "nested" leaves (field-list members, etc.) and numeric leaves.
    /// Values below this boundary are direct 16-bit numeric values; values at or above it name
    /// a following encoded numeric value (see [`crate::types::number::Number`]).
    pub const LF_NUMERIC: u16 = 0x8000;

    /// True if this value is itself a 16-bit unsigned numeric value, rather than a leaf that
    /// introduces an encoded numeric value.
    pub fn is_immediate_numeric(self) -> bool {
        self.0 < Self::LF_NUMERIC
    }
}

impl Debug for Leaf {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        if let Ok(i) = LEAF_NAMES.binary_search_by_key(&self.0, |&(v, _)| v) {
            fmt.write_str(LEAF_NAMES[i].1)
        } else {
            write!(fmt, "LF_0x{:04x}", self.0)
        }
    }
}

cv_leaf! {
    (0x1001, LF_MODIFIER),
    (0x1002, LF_POINTER),
    (0x1008, LF_PROCEDURE),
    (0x1009, LF_MFUNCTION),
    (0x1201, LF_ARGLIST),
    (0x1203, LF_FIELDLIST),
    (0x1204, LF_METHODLIST),
    (0x1205, LF_BITFIELD),
    (0x1206, LF_METHOD),
    (0x1207, LF_VTSHAPE),
    (0x1402, LF_MFUNC_ID),
    (0x1403, LF_BUILDINFO),
    (0x1501, LF_ALIAS),
    (0x1503, LF_ARRAY),
    (0x1504, LF_CLASS),
    (0x1505, LF_STRUCTURE),
    (0x1506, LF_UNION),
    (0x1507, LF_ENUM),
    (0x1509, LF_MEMBER),
    (0x1519, LF_INTERFACE),
    (0x150c, LF_FUNC_ID),
    (0x150d, LF_STRING_ID),
    (0x150e, LF_UDT_SRC_LINE),
    (0x150f, LF_UDT_MOD_SRC_LINE),
    (0x1520, LF_VFTABLE),
    (0x1604, LF_SUBSTR_LIST),

    // Numeric leaves. These values are >= LF_NUMERIC and indicate the encoding of a following
    // numeric value. See `Number`.
    (0x8000, LF_CHAR),
    (0x8001, LF_SHORT),
    (0x8002, LF_USHORT),
    (0x8003, LF_LONG),
    (0x8004, LF_ULONG),
    (0x8005, LF_REAL32),
    (0x8006, LF_REAL64),
    (0x8007, LF_REAL80),
    (0x8008, LF_REAL128),
    (0x8009, LF_QUADWORD),
    (0x800a, LF_UQUADWORD),
    (0x800d, LF_COMPLEX32),
    (0x800e, LF_COMPLEX64),
    (0x800f, LF_COMPLEX80),
    (0x8010, LF_COMPLEX128),
    (0x8011, LF_VARSTRING),
    (0x8017, LF_OCTWORD),
    (0x8018, LF_UOCTWORD),
    (0x8019, LF_DECIMAL),
    (0x801a, LF_DATE),
    (0x801b, LF_UTF8STRING),
    (0x801c, LF_REAL16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_numeric() {
        assert!(Leaf(0x1234).is_immediate_numeric());
        assert!(!Leaf::LF_CHAR.is_immediate_numeric());
    }

    #[test]
    fn debug_known_name() {
        assert_eq!(format!("{:?}", Leaf::LF_STRUCTURE), "LF_STRUCTURE");
    }

    #[test]
    fn debug_unknown_name() {
        assert_eq!(format!("{:?}", Leaf(0x1234)), "LF_0x1234");
    }
}
