//! The Type Information (TPI) stream, and the type-size oracle built on top of it.
//!
//! # References
//! * `examples/microsoft-pdb-rs/pdb/src/tpi.rs` (`TypeStreamHeader`, `TypeStream`)
//! * `spec.md` §4.3 (fixed primitive-size table, user-type dispatch)

use codeview::types::iter::{build_types_starts, TypesIter};
use codeview::types::{Leaf, TypeData, TypeIndex, TypeIndexLe};
use core::cell::RefCell;
use core::mem::size_of;
use static_assertions::const_assert_eq;
use std::collections::HashMap;
use tracing::warn;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned, LE, I32, U32};
use zerocopy_derive::FromBytes;

use crate::dbi::StreamIndexU16;

/// The fixed-size header at the start of the TPI stream.
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout, Unaligned, Debug)]
pub struct TypeStreamHeader {
    pub version: U32<LE>,
    pub header_size: U32<LE>,
    pub type_index_begin: TypeIndexLe,
    pub type_index_end: TypeIndexLe,
    pub type_record_bytes: U32<LE>,
    pub hash_stream_index: StreamIndexU16,
    pub hash_aux_stream_index: StreamIndexU16,
    pub hash_key_size: U32<LE>,
    pub num_hash_buckets: U32<LE>,
    pub hash_value_buffer_offset: I32<LE>,
    pub hash_value_buffer_length: U32<LE>,
    pub index_offset_buffer_offset: I32<LE>,
    pub index_offset_buffer_length: U32<LE>,
    pub hash_adj_buffer_offset: I32<LE>,
    pub hash_adj_buffer_length: U32<LE>,
}

pub const TPI_STREAM_HEADER_LEN: usize = 56;

const_assert_eq!(size_of::<TypeStreamHeader>(), TPI_STREAM_HEADER_LEN);

/// A parsed TPI stream: the type records, addressable by type index via a "starts" table built
/// once at construction.
pub struct TypeStream {
    type_index_begin: TypeIndex,
    type_index_end: TypeIndex,
    records: Vec<u8>,
    starts: Vec<u32>,
}

impl TypeStream {
    /// Parses a TPI stream. An empty stream (some stripped PDBs have one) yields an empty,
    /// usable `TypeStream` whose oracle always returns 0.
    pub fn parse(stream_data: &[u8]) -> anyhow::Result<Self> {
        if stream_data.is_empty() {
            return Ok(Self {
                type_index_begin: TypeIndex::MIN_BEGIN,
                type_index_end: TypeIndex::MIN_BEGIN,
                records: Vec::new(),
                starts: vec![0],
            });
        }

        if stream_data.len() < TPI_STREAM_HEADER_LEN {
            anyhow::bail!("TPI stream is too small for its header");
        }
        let header = TypeStreamHeader::ref_from_bytes(&stream_data[..TPI_STREAM_HEADER_LEN])
            .map_err(|_| anyhow::anyhow!("TPI stream header is misaligned"))?;

        let type_index_begin = header.type_index_begin.get();
        let type_index_end = header.type_index_end.get();
        let header_size = header.header_size.get() as usize;
        let type_record_bytes = header.type_record_bytes.get() as usize;

        let records_start = header_size;
        let records_end = records_start
            .checked_add(type_record_bytes)
            .ok_or_else(|| anyhow::anyhow!("TPI stream type record region overflows"))?;
        let records = stream_data
            .get(records_start..records_end)
            .ok_or_else(|| anyhow::anyhow!("TPI stream is too small for its type records"))?
            .to_vec();

        let num_types = type_index_end.get().saturating_sub(type_index_begin.get()) as usize;
        let starts = build_types_starts(num_types, &records);

        Ok(Self {
            type_index_begin,
            type_index_end,
            records,
            starts,
        })
    }

    pub fn type_index_begin(&self) -> TypeIndex {
        self.type_index_begin
    }

    pub fn type_index_end(&self) -> TypeIndex {
        self.type_index_end
    }

    /// Looks up and decodes the record for `type_index`. Returns `None` if the index is out of
    /// range or the record fails to decode.
    pub fn lookup(&self, type_index: TypeIndex) -> Option<TypeData<'_>> {
        if type_index < self.type_index_begin || type_index >= self.type_index_end {
            return None;
        }
        let slot = (type_index.get() - self.type_index_begin.get()) as usize;
        let start = *self.starts.get(slot)? as usize;
        let record = TypesIter::new(&self.records[start..]).next()?;
        record.parse().ok()
    }
}

/// Computes byte sizes for CodeView type indexes, memoizing results for user-defined types.
///
/// See `spec.md` §4.3: primitive type indexes are resolved by a fixed table; user-defined type
/// indexes are dispatched by record kind, recursing into the TPI stream as needed.
pub struct TypeSizeOracle<'a> {
    tpi: &'a TypeStream,
    cache: RefCell<HashMap<u32, u32>>,
    in_progress: RefCell<std::collections::HashSet<u32>>,
}

impl<'a> TypeSizeOracle<'a> {
    pub fn new(tpi: &'a TypeStream) -> Self {
        Self {
            tpi,
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(std::collections::HashSet::new()),
        }
    }

    /// Returns the size in bytes of one instance of `type_index`, or 0 if unknown.
    pub fn size_of(&self, type_index: TypeIndex) -> u32 {
        if type_index.is_primitive() {
            return primitive_size(type_index);
        }

        if let Some(&size) = self.cache.borrow().get(&type_index.get()) {
            return size;
        }

        // Guard against a cyclic MODIFIER/ENUM/BITFIELD chain in a malformed PDB.
        if !self.in_progress.borrow_mut().insert(type_index.get()) {
            warn!(type_index = type_index.get(), "cyclic type reference in size oracle");
            return 0;
        }

        let size = self.compute_size(type_index);
        self.in_progress.borrow_mut().remove(&type_index.get());
        self.cache.borrow_mut().insert(type_index.get(), size);
        size
    }

    fn compute_size(&self, type_index: TypeIndex) -> u32 {
        let Some(data) = self.tpi.lookup(type_index) else {
            return 0;
        };

        match data {
            TypeData::Modifier(m) => self.size_of(m.underlying_type.get()),
            TypeData::Bitfield(b) => self.size_of(b.underlying_type.get()),
            TypeData::Enum(e) => self.size_of(e.underlying_type()),
            TypeData::Pointer(p) => {
                if p.fixed.attr().pointer_kind()
                    == codeview::types::ptr_kind::CV_PTR_64
                {
                    8
                } else {
                    4
                }
            }
            TypeData::Proc(_) => 0,
            TypeData::Array(a) => a.byte_size().unwrap_or(0) as u32,
            TypeData::Struct(s) => s.byte_size().unwrap_or(0) as u32,
            TypeData::Union(u) => u.byte_size().unwrap_or(0) as u32,
            TypeData::Unknown => {
                warn!(type_index = type_index.get(), "unrecognized type record kind in size oracle");
                0
            }
        }
    }
}

fn primitive_size(ti: TypeIndex) -> u32 {
    let v = ti.get();

    // Pointer-mode bits: T_32Pxxxx (mode 4) is a 32-bit pointer; T_64Pxxxx (mode 6) is a
    // 64-bit pointer. This applies uniformly regardless of what is pointed to.
    match v & 0x0f00 {
        0x0400 => return 4,
        0x0600 => return 8,
        _ => {}
    }

    if ti == TypeIndex::T_VOID {
        0
    } else if ti == TypeIndex::T_HRESULT {
        4
    } else if ti == TypeIndex::T_BOOL8
        || ti == TypeIndex::T_CHAR
        || ti == TypeIndex::T_UCHAR
        || ti == TypeIndex::T_INT1
        || ti == TypeIndex::T_UINT1
    {
        1
    } else if ti == TypeIndex::T_SHORT
        || ti == TypeIndex::T_USHORT
        || ti == TypeIndex::T_WCHAR
        || ti == TypeIndex::T_CHAR16
    {
        2
    } else if ti == TypeIndex::T_LONG
        || ti == TypeIndex::T_ULONG
        || ti == TypeIndex::T_INT4
        || ti == TypeIndex::T_UINT4
        || ti == TypeIndex::T_REAL32
    {
        4
    } else if ti == TypeIndex::T_QUAD
        || ti == TypeIndex::T_UQUAD
        || ti == TypeIndex::T_REAL64
        || ti == TypeIndex::T_INT8
        || ti == TypeIndex::T_UINT8
    {
        8
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tpi_stream_resolves_nothing() {
        let tpi = TypeStream::parse(&[]).unwrap();
        let oracle = TypeSizeOracle::new(&tpi);
        assert_eq!(oracle.size_of(TypeIndex::MIN_BEGIN), 0);
    }

    #[test]
    fn primitive_sizes_match_the_fixed_table() {
        assert_eq!(primitive_size(TypeIndex::T_VOID), 0);
        assert_eq!(primitive_size(TypeIndex::T_HRESULT), 4);
        assert_eq!(primitive_size(TypeIndex::T_CHAR), 1);
        assert_eq!(primitive_size(TypeIndex::T_SHORT), 2);
        assert_eq!(primitive_size(TypeIndex::T_LONG), 4);
        assert_eq!(primitive_size(TypeIndex::T_QUAD), 8);
        assert_eq!(primitive_size(TypeIndex::T_32PVOID), 4);
        assert_eq!(primitive_size(TypeIndex::T_64PVOID), 8);
    }

    fn struct_record(name: &str, byte_size: u16) -> Vec<u8> {
        // StructFixed (12 bytes) + numeric leaf (LF_USHORT, 2-byte tag + 2-byte value) + name + NUL
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u16.to_le_bytes()); // num_elements
        payload.extend_from_slice(&0u16.to_le_bytes()); // property
        payload.extend_from_slice(&0u32.to_le_bytes()); // field_list
        payload.extend_from_slice(&0u32.to_le_bytes()); // derivation_list
        payload.extend_from_slice(&0u32.to_le_bytes()); // vtable_shape
        payload.extend_from_slice(&0x8003u16.to_le_bytes()); // LF_USHORT tag
        payload.extend_from_slice(&byte_size.to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
        let pad = (4 - (payload.len() & 3)) & 3;
        payload.extend(std::iter::repeat(0u8).take(pad));

        let mut data = Vec::new();
        data.extend_from_slice(&((payload.len() + 2) as u16).to_le_bytes());
        data.extend_from_slice(&Leaf::LF_STRUCTURE.0.to_le_bytes());
        data.extend_from_slice(&payload);
        data
    }

    #[test]
    fn resolves_struct_size_via_numeric_length_field() {
        let records = struct_record("Widget", 24);
        let mut header = vec![0u8; TPI_STREAM_HEADER_LEN];
        header[0..4].copy_from_slice(&20040203u32.to_le_bytes());
        header[4..8].copy_from_slice(&(TPI_STREAM_HEADER_LEN as u32).to_le_bytes());
        header[8..12].copy_from_slice(&0x1000u32.to_le_bytes());
        header[12..16].copy_from_slice(&0x1001u32.to_le_bytes());
        header[16..20].copy_from_slice(&(records.len() as u32).to_le_bytes());

        let mut data = header;
        data.extend_from_slice(&records);

        let tpi = TypeStream::parse(&data).unwrap();
        let oracle = TypeSizeOracle::new(&tpi);
        assert_eq!(oracle.size_of(TypeIndex(0x1000)), 24);
        // Cached on second call.
        assert_eq!(oracle.size_of(TypeIndex(0x1000)), 24);
    }
}
