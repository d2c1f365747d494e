//! The PE debug directory, and the CodeView ("RSDS") debug record that names a companion PDB.
//!
//! # References
//! * <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format#debug-directory-image-only>
//! * `original_source/src/pe_utils.cpp` (`PE_IMAGE_DEBUG_DIRECTORY`, `PE_DEBUGTYPE_CODEVIEW`)

use bstr::BStr;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy_derive::*;

/// One entry in the `IMAGE_DIRECTORY_ENTRY_DEBUG` data directory.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(
    Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, IntoBytes, FromBytes, Immutable, KnownLayout,
)]
pub struct IMAGE_DEBUG_DIRECTORY {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// One of the `IMAGE_DEBUG_TYPE_*` constants.
    pub debug_type: u32,
    pub size_of_data: u32,
    /// RVA of the debug data, when it is mapped into the image.
    pub address_of_raw_data: u32,
    /// File offset of the debug data.
    pub pointer_to_raw_data: u32,
}

pub const IMAGE_SIZEOF_DEBUG_DIRECTORY: usize = 28;

const_assert_eq!(
    size_of::<IMAGE_DEBUG_DIRECTORY>(),
    IMAGE_SIZEOF_DEBUG_DIRECTORY
);

/// `debug_type` value identifying a CodeView debug record.
pub const IMAGE_DEBUG_TYPE_CODEVIEW: u32 = 2;

/// Signature of an `IMAGE_DEBUG_TYPE_CODEVIEW` record produced by PDB 7.0-era toolchains
/// (little-endian bytes of `"RSDS"`).
pub const CV_SIGNATURE_RSDS: u32 = 0x5344_5352;

/// The fixed-size header of a `CV_INFO_PDB70` record. An `IMAGE_DEBUG_TYPE_CODEVIEW` entry's raw
/// data is this header immediately followed by a NUL-terminated PDB file path.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Eq, PartialEq, IntoBytes, FromBytes, Immutable, KnownLayout)]
pub struct CV_INFO_PDB70 {
    /// Always [`CV_SIGNATURE_RSDS`].
    pub cv_signature: u32,
    /// The PDB's unique identifier, also stored in the PDB's own PDBI stream.
    pub signature: [u8; 16],
    /// The PDB's age; must match the age recorded in the PDB itself for a valid match.
    pub age: u32,
    // pdb_file_name: NUL-terminated string follows
}

pub const IMAGE_SIZEOF_CV_INFO_PDB70: usize = 24;

const_assert_eq!(size_of::<CV_INFO_PDB70>(), IMAGE_SIZEOF_CV_INFO_PDB70);

/// A parsed `CV_INFO_PDB70` record: the fixed header plus the path that follows it.
pub struct CvInfoPdb70<'a> {
    pub header: CV_INFO_PDB70,
    pub pdb_file_name: &'a BStr,
}

impl<'a> CvInfoPdb70<'a> {
    /// Parses a `CV_INFO_PDB70` record from the raw bytes of an `IMAGE_DEBUG_TYPE_CODEVIEW`
    /// entry. Returns `None` if the bytes are too short or the signature does not match.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < IMAGE_SIZEOF_CV_INFO_PDB70 {
            return None;
        }

        let (header_bytes, rest) = data.split_at(IMAGE_SIZEOF_CV_INFO_PDB70);
        let header = CV_INFO_PDB70::read_from_bytes(header_bytes).ok()?;
        if header.cv_signature != CV_SIGNATURE_RSDS {
            return None;
        }

        let nul_pos = rest.iter().position(|&b| b == 0)?;
        Some(CvInfoPdb70 {
            header,
            pdb_file_name: BStr::new(&rest[..nul_pos]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rsds_record() {
        let mut data = Vec::new();
        data.extend_from_slice(&CV_SIGNATURE_RSDS.to_le_bytes());
        data.extend_from_slice(&[0xAAu8; 16]);
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(b"foo.pdb\0");

        let parsed = CvInfoPdb70::parse(&data).expect("valid record");
        assert_eq!(parsed.header.age, 7);
        assert_eq!(parsed.pdb_file_name, "foo.pdb");
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(b"foo.pdb\0");

        assert!(CvInfoPdb70::parse(&data).is_none());
    }

    #[test]
    fn rejects_truncated_record() {
        assert!(CvInfoPdb70::parse(&[1, 2, 3]).is_none());
    }
}
