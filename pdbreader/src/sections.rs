//! Resolution of `(section, offset)` pairs to image-relative virtual addresses, using the
//! `IMAGE_SECTION_HEADER` table published in the DBI Optional Debug Header's `SECTION_HEADER_DATA`
//! slot.
//!
//! # References
//! * `spec.md` §3 ("Section index is 1-based; 0 means no section (stripped symbol)")

use coff::IMAGE_SECTION_HEADER;
use zerocopy::FromBytes;

/// The section headers of the linked image, as published inside the PDB.
pub struct SectionHeaders {
    headers: Vec<IMAGE_SECTION_HEADER>,
}

impl SectionHeaders {
    pub fn parse(stream_data: &[u8]) -> anyhow::Result<Self> {
        let headers = <[IMAGE_SECTION_HEADER]>::ref_from_bytes(stream_data)
            .map_err(|_| {
                anyhow::anyhow!(
                    "section headers stream size {} is not a multiple of an IMAGE_SECTION_HEADER",
                    stream_data.len()
                )
            })?
            .to_vec();
        Ok(Self { headers })
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Resolves a 1-based `section` and an `offset` within it to an image-relative virtual
    /// address. A `section` of 0 (a stripped symbol with no section) always resolves to `None`,
    /// as does a `section` past the end of the table.
    pub fn resolve(&self, section: u16, offset: u32) -> Option<u32> {
        if section == 0 {
            return None;
        }
        let header = self.headers.get(section as usize - 1)?;
        Some(header.virtual_address.wrapping_add(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    fn header(virtual_address: u32) -> IMAGE_SECTION_HEADER {
        IMAGE_SECTION_HEADER {
            virtual_address,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_via_one_based_section_index() {
        let headers = vec![header(0x1000), header(0x2000)];
        let mut bytes = Vec::new();
        for h in &headers {
            bytes.extend_from_slice(h.as_bytes());
        }
        let sections = SectionHeaders::parse(&bytes).unwrap();
        assert_eq!(sections.resolve(1, 0x10), Some(0x1010));
        assert_eq!(sections.resolve(2, 0x10), Some(0x2010));
    }

    #[test]
    fn zero_section_and_out_of_range_section_resolve_to_none() {
        let headers = vec![header(0x1000)];
        let mut bytes = Vec::new();
        for h in &headers {
            bytes.extend_from_slice(h.as_bytes());
        }
        let sections = SectionHeaders::parse(&bytes).unwrap();
        assert_eq!(sections.resolve(0, 0x10), None);
        assert_eq!(sections.resolve(5, 0x10), None);
    }
}
