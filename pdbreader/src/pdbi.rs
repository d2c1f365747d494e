//! The PDB Information stream (aka the PDBI stream, aka the "PDB Stream"): signature, age,
//! and the trailing feature-code list used to detect `/DEBUG:FASTLINK` PDBs.
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/pdbi.rs` (`PdbiStream`, `NamedStreams::parse`, `FeatureCode`)
//! * `examples/original_source/src/pdbfile.cpp` (`infoStream.UsesDebugFastLink()`)

use codeview::parser::Parser;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, KnownLayout, Unaligned, LE, U32};
use zerocopy_derive::FromBytes;

/// The fixed-size header of the PDBI stream. A 16-byte GUID follows this header for every
/// version newer than [`PDBI_VERSION_VC70_DEPRECATED`]; this reader has no use for the GUID
/// (it would only matter for binding a PE image to a specific PDB by identity, which is outside
/// this reader's contract) and skips over it without decoding it.
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct PdbiStreamHeader {
    pub version: U32<LE>,
    pub signature: U32<LE>,
    pub age: U32<LE>,
}

pub const PDBI_STREAM_HEADER_LEN: usize = 12;

const_assert_eq!(size_of::<PdbiStreamHeader>(), PDBI_STREAM_HEADER_LEN);

/// The last version of the PDBI stream that does not carry a unique-id GUID after the header.
pub const PDBI_VERSION_VC70_DEPRECATED: u32 = 19990604;

fn pdbi_has_unique_id(version: u32) -> bool {
    version > PDBI_VERSION_VC70_DEPRECATED
}

/// Identifies one optional feature recorded in the PDBI stream's trailing feature-code list.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FeatureCode(pub u32);

impl FeatureCode {
    /// `'MINI'`. Present when the PDB was produced with `/DEBUG:FASTLINK`: most streams this
    /// reader depends on (module symbol streams, section contributions) are absent or empty in
    /// that case, so a PDB carrying this feature is rejected outright.
    pub const MINI_PDB: FeatureCode = FeatureCode(0x494e_494d);
}

/// A parsed PDBI stream.
pub struct PdbiStream {
    pub version: u32,
    pub signature: u32,
    pub age: u32,
    pub features: Vec<FeatureCode>,
}

impl PdbiStream {
    /// Parses the stream.
    pub fn parse(stream_data: &[u8]) -> anyhow::Result<Self> {
        let mut p = Parser::new(stream_data);

        let header: &PdbiStreamHeader = p
            .get()
            .map_err(|_| anyhow::anyhow!("PDBI stream is too small for its header"))?;
        let version = header.version.get();

        if pdbi_has_unique_id(version) {
            p.skip(16)
                .map_err(|_| anyhow::anyhow!("PDBI stream is too small for its unique-id GUID"))?;
        }

        skip_named_streams(&mut p)?;

        let mut features = Vec::with_capacity(p.len() / 4);
        while p.len() >= 4 {
            features.push(FeatureCode(p.u32().map_err(|_| {
                anyhow::anyhow!("PDBI stream feature list is malformed")
            })?));
        }

        Ok(Self {
            version,
            signature: header.signature.get(),
            age: header.age.get(),
            features,
        })
    }

    /// True if this PDB was produced with `/DEBUG:FASTLINK`.
    pub fn uses_debug_fastlink(&self) -> bool {
        self.features.contains(&FeatureCode::MINI_PDB)
    }
}

/// Skips over the Named Streams table without decoding its contents. `sizer` locates every
/// stream it needs (DBI, TPI, GSI/PSI/GSS) via the DBI header's fixed fields, never by name, so
/// the table's name-to-stream map is of no use here; only its byte length matters, to reach the
/// feature-code list that follows it.
fn skip_named_streams(p: &mut Parser) -> anyhow::Result<()> {
    let names_size = p
        .u32()
        .map_err(|_| anyhow::anyhow!("PDBI named streams table is truncated"))?;
    p.skip(names_size as usize)
        .map_err(|_| anyhow::anyhow!("PDBI named streams table names blob is truncated"))?;

    let name_count = p.u32()?;
    let _name_hash_size = p.u32()?;

    let present_u32_count = p.u32()?;
    p.skip(present_u32_count as usize * 4)?;

    let deleted_u32_count = p.u32()?;
    p.skip(deleted_u32_count as usize * 4)?;

    // `(key, value)` pairs, one per present name; each pair is two u32s. The pair count is
    // `name_count`, already read above — there is no separate on-disk count for this array.
    p.skip(name_count as usize * 8)?;

    // Trailing "niMac" field.
    let _num_name_index = p.u32()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(version: u32, signature: u32, age: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&version.to_le_bytes());
        data.extend_from_slice(&signature.to_le_bytes());
        data.extend_from_slice(&age.to_le_bytes());
        data
    }

    fn empty_named_streams() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes()); // names blob size
        data.extend_from_slice(&0u32.to_le_bytes()); // name count
        data.extend_from_slice(&0u32.to_le_bytes()); // name hash size
        data.extend_from_slice(&0u32.to_le_bytes()); // present bitmap u32 count
        data.extend_from_slice(&0u32.to_le_bytes()); // deleted bitmap u32 count
        // no (key, value) pairs: name count is 0
        data.extend_from_slice(&0u32.to_le_bytes()); // niMac
        data
    }

    /// A named-streams table carrying one entry (e.g. "/names"), the way every real-world PDB's
    /// PDBI stream does. Regression fixture for the off-by-one-field bug where the pair count was
    /// misread from a fabricated field instead of reusing `name_count`.
    fn named_streams_with_one_entry() -> Vec<u8> {
        let name = b"/names\0";
        let mut data = Vec::new();
        data.extend_from_slice(&(name.len() as u32).to_le_bytes()); // names blob size
        data.extend_from_slice(name);
        data.extend_from_slice(&1u32.to_le_bytes()); // name count
        data.extend_from_slice(&1u32.to_le_bytes()); // name hash size
        data.extend_from_slice(&1u32.to_le_bytes()); // present bitmap u32 count
        data.extend_from_slice(&[0u8; 4]); // present bitmap
        data.extend_from_slice(&0u32.to_le_bytes()); // deleted bitmap u32 count
        data.extend_from_slice(&0u32.to_le_bytes()); // (key, value) pair 0: key (offset into names blob)
        data.extend_from_slice(&1u32.to_le_bytes()); // (key, value) pair 0: value (stream index)
        data.extend_from_slice(&1u32.to_le_bytes()); // niMac
        data
    }

    #[test]
    fn parses_header_without_guid_on_old_version() {
        let mut data = header_bytes(PDBI_VERSION_VC70_DEPRECATED, 0x1234_5678, 3);
        data.extend_from_slice(&empty_named_streams());

        let stream = PdbiStream::parse(&data).unwrap();
        assert_eq!(stream.signature, 0x1234_5678);
        assert_eq!(stream.age, 3);
        assert!(!stream.uses_debug_fastlink());
    }

    #[test]
    fn skips_guid_on_modern_version_and_reaches_features() {
        let mut data = header_bytes(20140508, 1, 1);
        data.extend_from_slice(&[0xAAu8; 16]);
        data.extend_from_slice(&empty_named_streams());
        data.extend_from_slice(&FeatureCode::MINI_PDB.0.to_le_bytes());

        let stream = PdbiStream::parse(&data).unwrap();
        assert!(stream.uses_debug_fastlink());
    }

    #[test]
    fn detects_no_fastlink_feature() {
        let mut data = header_bytes(20140508, 1, 1);
        data.extend_from_slice(&[0xAAu8; 16]);
        data.extend_from_slice(&empty_named_streams());
        data.extend_from_slice(&0x1234_5678u32.to_le_bytes());

        let stream = PdbiStream::parse(&data).unwrap();
        assert!(!stream.uses_debug_fastlink());
    }

    #[test]
    fn non_empty_named_streams_table_does_not_desync_the_feature_list() {
        let mut data = header_bytes(20140508, 1, 1);
        data.extend_from_slice(&[0xAAu8; 16]);
        data.extend_from_slice(&named_streams_with_one_entry());
        data.extend_from_slice(&FeatureCode::MINI_PDB.0.to_le_bytes());

        let stream = PdbiStream::parse(&data).unwrap();
        assert!(stream.uses_debug_fastlink());
    }
}
