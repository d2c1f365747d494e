//! Locates a companion PDB path from a mapped PE image's debug directory (spec.md §4.1).
//!
//! # References
//! * `examples/original_source/src/pe_utils.cpp` (`PEIsValidFile`, `PEGetPDBPath`)

use coff::debug_directory::{CvInfoPdb70, IMAGE_DEBUG_DIRECTORY, IMAGE_DEBUG_TYPE_CODEVIEW};
use coff::dos_header::{IMAGE_DOS_HEADER, IMAGE_DOS_SIGNATURE, IMAGE_SIZEOF_DOS_HEADER};
use coff::image::{
    IMAGE_FILE_HEADER, IMAGE_NT_OPTIONAL_HDR32_MAGIC, IMAGE_NT_OPTIONAL_HDR64_MAGIC,
    IMAGE_OPTIONAL_HEADER32, IMAGE_OPTIONAL_HEADER64,
};
use coff::section::IMAGE_SECTION_HEADER;
use core::mem::size_of;
use tracing::debug;
use zerocopy::FromBytes;

#[cfg(test)]
use zerocopy::IntoBytes;

const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;
const IMAGE_NT_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"

/// Locates the companion PDB path named in `image`'s CodeView debug directory entry.
///
/// `image` is the full contents of a mapped PE file. Returns an empty string on any structural
/// anomaly (not a PE image, no debug directory, no RSDS entry) and never reads past `image`'s
/// length; the caller falls back to a user-supplied PDB path.
pub fn find_pdb_path(image: &[u8]) -> String {
    find_pdb_path_inner(image).unwrap_or_default()
}

/// Reads `count` consecutive, length-prefix-free `T` values starting at the beginning of `bytes`.
/// Copies rather than casting in place, since the source offsets (arbitrary file offsets inside a
/// mapped PE image) carry no alignment guarantee.
fn read_array<T: FromBytes>(bytes: &[u8], count: usize) -> Option<Vec<T>> {
    let elem_size = size_of::<T>();
    let needed = elem_size.checked_mul(count)?;
    let slice = bytes.get(..needed)?;
    slice
        .chunks_exact(elem_size)
        .map(|chunk| T::read_from_bytes(chunk).ok())
        .collect()
}

fn find_pdb_path_inner(image: &[u8]) -> Option<String> {
    let dos_bytes = image.get(..IMAGE_SIZEOF_DOS_HEADER)?;
    let dos = IMAGE_DOS_HEADER::read_from_bytes(dos_bytes).ok()?;
    if dos.e_magic != IMAGE_DOS_SIGNATURE {
        return None;
    }

    let pe_offset: usize = dos.e_lfanew.try_into().ok()?;
    let signature = u32::from_le_bytes(image.get(pe_offset..pe_offset.checked_add(4)?)?.try_into().ok()?);
    if signature != IMAGE_NT_SIGNATURE {
        return None;
    }

    let file_header_offset = pe_offset + 4;
    let file_header = IMAGE_FILE_HEADER::read_from_bytes(
        image.get(file_header_offset..file_header_offset.checked_add(size_of::<IMAGE_FILE_HEADER>())?)?,
    )
    .ok()?;

    let optional_header_offset = file_header_offset + size_of::<IMAGE_FILE_HEADER>();
    let optional_header_bytes = image.get(
        optional_header_offset
            ..optional_header_offset.checked_add(file_header.size_of_optional_header as usize)?,
    )?;
    let magic = u16::from_le_bytes(optional_header_bytes.get(0..2)?.try_into().ok()?);

    let data_directory = match magic {
        IMAGE_NT_OPTIONAL_HDR32_MAGIC => {
            IMAGE_OPTIONAL_HEADER32::read_from_bytes(
                optional_header_bytes.get(..size_of::<IMAGE_OPTIONAL_HEADER32>())?,
            )
            .ok()?
            .data_directory
        }
        IMAGE_NT_OPTIONAL_HDR64_MAGIC => {
            IMAGE_OPTIONAL_HEADER64::read_from_bytes(
                optional_header_bytes.get(..size_of::<IMAGE_OPTIONAL_HEADER64>())?,
            )
            .ok()?
            .data_directory
        }
        _ => return None,
    };

    let debug_dir_entry = data_directory.get(IMAGE_DIRECTORY_ENTRY_DEBUG)?;
    if debug_dir_entry.virtual_address == 0 || debug_dir_entry.size == 0 {
        return None;
    }

    // Find the section whose virtual range covers the debug directory's RVA, and compute that
    // section's file-offset/RVA delta. Every `AddressOfRawData` field inside the debug directory
    // (including each individual entry's) is then interpreted relative to this same section, the
    // way the original implementation does: it never independently re-resolves a covering section
    // for the entry's own `AddressOfRawData`.
    let section_headers_offset = optional_header_offset + file_header.size_of_optional_header as usize;
    let sections: Vec<IMAGE_SECTION_HEADER> = read_array(
        image.get(section_headers_offset..)?,
        file_header.number_of_sections as usize,
    )?;

    let debug_dir_rva = debug_dir_entry.virtual_address;
    let covering = sections.iter().find(|s| {
        let size = s.physical_address_or_virtual_size.max(s.size_of_raw_data);
        debug_dir_rva >= s.virtual_address && debug_dir_rva < s.virtual_address.wrapping_add(size)
    })?;
    let section_delta = covering.pointer_to_raw_data as i64 - covering.virtual_address as i64;

    let debug_dir_file_offset: usize = (debug_dir_rva as i64 + section_delta).try_into().ok()?;
    let num_entries = debug_dir_entry.size as usize / size_of::<IMAGE_DEBUG_DIRECTORY>();
    let entries: Vec<IMAGE_DEBUG_DIRECTORY> =
        read_array(image.get(debug_dir_file_offset..)?, num_entries)?;

    for entry in &entries {
        if entry.debug_type != IMAGE_DEBUG_TYPE_CODEVIEW {
            continue;
        }
        let raw_offset: usize = (entry.address_of_raw_data as i64 + section_delta).try_into().ok()?;
        let raw_len = entry.size_of_data as usize;
        let Some(raw_bytes) = image.get(raw_offset..raw_offset.checked_add(raw_len)?) else {
            continue;
        };
        if let Some(cv) = CvInfoPdb70::parse(raw_bytes) {
            let path = cv.pdb_file_name.to_string();
            debug!(pdb_path = %path, "located companion PDB via PE debug directory");
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal but structurally valid 32-bit PE image with one `.rdata` section holding
    /// a single CodeView debug directory entry that names `foo.pdb`.
    fn build_pe_with_pdb(pdb_name: &str) -> Vec<u8> {
        let mut image = vec![0u8; 0x400];

        let mut dos = IMAGE_DOS_HEADER::default();
        dos.e_magic = IMAGE_DOS_SIGNATURE;
        dos.e_lfanew = 0x80;
        image[..IMAGE_SIZEOF_DOS_HEADER].copy_from_slice(dos.as_bytes());

        let pe_offset = 0x80usize;
        image[pe_offset..pe_offset + 4].copy_from_slice(&IMAGE_NT_SIGNATURE.to_le_bytes());

        let mut file_header = IMAGE_FILE_HEADER::default();
        file_header.number_of_sections = 1;
        file_header.size_of_optional_header = size_of::<IMAGE_OPTIONAL_HEADER32>() as u16;
        let file_header_offset = pe_offset + 4;
        image[file_header_offset..file_header_offset + size_of::<IMAGE_FILE_HEADER>()]
            .copy_from_slice(file_header.as_bytes());

        let optional_header_offset = file_header_offset + size_of::<IMAGE_FILE_HEADER>();
        let section_headers_offset =
            optional_header_offset + size_of::<IMAGE_OPTIONAL_HEADER32>();
        // Leave room for the one section header table entry before the section's own data.
        let section_data_offset = section_headers_offset + size_of::<IMAGE_SECTION_HEADER>() + 0x10;

        // The debug directory and the CV_INFO_PDB70 record both live inside the one section, at
        // RVA == file offset (identity-mapped for simplicity in this test image).
        let debug_dir_rva = section_data_offset as u32;
        let cv_rva = debug_dir_rva + size_of::<IMAGE_DEBUG_DIRECTORY>() as u32;

        let mut optional_header = IMAGE_OPTIONAL_HEADER32::default();
        optional_header.magic = IMAGE_NT_OPTIONAL_HDR32_MAGIC;
        optional_header.data_directory[IMAGE_DIRECTORY_ENTRY_DEBUG].virtual_address = debug_dir_rva;
        optional_header.data_directory[IMAGE_DIRECTORY_ENTRY_DEBUG].size =
            size_of::<IMAGE_DEBUG_DIRECTORY>() as u32;
        image[optional_header_offset..optional_header_offset + size_of::<IMAGE_OPTIONAL_HEADER32>()]
            .copy_from_slice(optional_header.as_bytes());

        let mut section = IMAGE_SECTION_HEADER::default();
        section.virtual_address = section_data_offset as u32;
        section.pointer_to_raw_data = section_data_offset as u32;
        section.size_of_raw_data = 0x100;
        section.physical_address_or_virtual_size = 0x100;
        image[section_headers_offset..section_headers_offset + size_of::<IMAGE_SECTION_HEADER>()]
            .copy_from_slice(section.as_bytes());

        let mut debug_dir = IMAGE_DEBUG_DIRECTORY::default();
        debug_dir.debug_type = IMAGE_DEBUG_TYPE_CODEVIEW;
        debug_dir.address_of_raw_data = cv_rva;
        let mut cv_payload = Vec::new();
        cv_payload.extend_from_slice(&0x5344_5352u32.to_le_bytes());
        cv_payload.extend_from_slice(&[0u8; 16]);
        cv_payload.extend_from_slice(&1u32.to_le_bytes());
        cv_payload.extend_from_slice(pdb_name.as_bytes());
        cv_payload.push(0);
        debug_dir.size_of_data = cv_payload.len() as u32;

        image[section_data_offset..section_data_offset + size_of::<IMAGE_DEBUG_DIRECTORY>()]
            .copy_from_slice(debug_dir.as_bytes());
        let cv_offset = cv_rva as usize;
        image[cv_offset..cv_offset + cv_payload.len()].copy_from_slice(&cv_payload);

        image
    }

    #[test]
    fn finds_pdb_path_in_well_formed_image() {
        let image = build_pe_with_pdb("foo.pdb");
        assert_eq!(find_pdb_path(&image), "foo.pdb");
    }

    #[test]
    fn rejects_non_pe_file() {
        let image = vec![0u8; 128];
        assert_eq!(find_pdb_path(&image), "");
    }

    #[test]
    fn rejects_bad_dos_signature() {
        let mut image = vec![0u8; 128];
        image[0..2].copy_from_slice(b"XX");
        assert_eq!(find_pdb_path(&image), "");
    }

    #[test]
    fn never_panics_on_truncated_image() {
        let full = build_pe_with_pdb("foo.pdb");
        for len in [0, 1, 0x40, 0x80, 0x90, 0x100, 0x101, 0x110] {
            let _ = find_pdb_path(&full[..len.min(full.len())]);
        }
    }
}
