//! Implements the "PDB-reader contract" that `sizer` needs: a validated, stream-resolved view
//! over a PDB's DBI/PDBI/TPI streams, the two global symbol hash tables, and the per-module
//! symbol streams — everything enumerated in `spec.md` §6 ("PDB-reader contract").
//!
//! # References
//! * `examples/microsoft-pdb-rs/mspdb/src/lib.rs` (`Pdb`, `Stream`)
//! * `examples/microsoft-pdb-rs/mspdb/src/stream_index.rs` (fixed stream indexes)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dbi;
pub mod globals;
pub mod pdbi;
pub mod sections;
pub mod tpi;

use anyhow::{bail, Context};
use codeview::syms::{split_sym_data_signature, SymIter};
use dbi::{
    DbiFlags, DbiStreamHeader, DbiSubstreamRanges, IterModuleInfo, ModuleInfo, OptionalDebugHeader,
    SectionContributionsSubstream,
};
use globals::{GlobalSymbolIndex, GlobalSymbolStream, PublicSymbolIndex};
use msf::Msf;
use pdbi::PdbiStream;
use sections::SectionHeaders;
use sync_file::{RandomAccessFile, ReadAt};
use tpi::{TypeSizeOracle, TypeStream};
use tracing::{trace_span, warn};
use zerocopy::FromBytes;

/// Fixed stream indexes, matching the well-known PDB layout (`mspdb::Stream`).
pub mod stream {
    /// The PDB Information stream.
    pub const PDBI: u32 = 1;
    /// The Type Information stream.
    pub const TPI: u32 = 2;
    /// The Debug Information stream.
    pub const DBI: u32 = 3;
}

/// A validated, fully-indexed view over one PDB file's streams.
///
/// Opening a [`PdbFile`] reads and validates just enough of the PDB (PDBI header, DBI header and
/// substreams, TPI header, section headers) to expose the rest of the pipeline's needs lazily:
/// per-module symbol streams and the global/public hash tables are read on demand.
pub struct PdbFile<F = RandomAccessFile> {
    msf: Msf<F>,
    dbi_header: DbiStreamHeader,
    modules: Vec<u8>,
    section_contributions: Vec<u8>,
    section_headers: SectionHeaders,
    tpi: TypeStream,
}

impl PdbFile<RandomAccessFile> {
    /// Opens a PDB file by path and validates it.
    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        let msf = Msf::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_msf(msf)
    }
}

impl<F: ReadAt> PdbFile<F> {
    /// Validates and indexes an already-opened MSF file as a PDB.
    ///
    /// This is the `validate(bytes)` operation of the reader contract: it reads the PDBI stream
    /// (rejecting `/DEBUG:FASTLINK` PDBs outright, per spec.md §6/§7), the DBI header and its
    /// substreams, the TPI header, and the section headers stream that RVA resolution depends
    /// on.
    pub fn from_msf(msf: Msf<F>) -> anyhow::Result<Self> {
        let _span = trace_span!("PdbFile::from_msf").entered();

        let pdbi_data = msf
            .read_stream_to_vec(stream::PDBI)
            .context("failed to read the PDB Information stream")?;
        let pdbi = PdbiStream::parse(&pdbi_data).context("failed to parse the PDB Information stream")?;
        if pdbi.uses_debug_fastlink() {
            bail!("this PDB was produced with /DEBUG:FASTLINK (uses_debug_fastlink), which is not supported");
        }

        let dbi_data = msf
            .read_stream_to_vec(stream::DBI)
            .context("failed to read the DBI stream")?;
        if dbi_data.len() < dbi::DBI_STREAM_HEADER_LEN {
            bail!("DBI stream is too small for its header");
        }
        let dbi_header =
            DbiStreamHeader::read_from_bytes(&dbi_data[..dbi::DBI_STREAM_HEADER_LEN])
                .map_err(|_| anyhow::anyhow!("DBI stream header is misaligned"))?;

        let flags = dbi_header.flags();
        if flags.contains(DbiFlags::INCREMENTALLY_LINKED) {
            warn!("PDB was produced by an incremental link; size figures may not reflect a from-scratch build");
        }
        if flags.contains(DbiFlags::STRIPPED) {
            warn!("PDB has private symbols stripped");
        }

        let ranges = DbiSubstreamRanges::from_header(&dbi_header, dbi_data.len())
            .context("failed to compute DBI substream ranges")?;
        let modules = dbi_data[ranges.modules.clone()].to_vec();
        let section_contributions = dbi_data[ranges.section_contributions.clone()].to_vec();
        let optional_dbg_data = &dbi_data[ranges.optional_dbg_header.clone()];
        let optional_dbg = OptionalDebugHeader::parse(optional_dbg_data)
            .context("failed to parse the optional debug header")?;

        let section_headers_stream = optional_dbg.section_headers_stream()?;
        let section_headers_data = msf
            .read_stream_to_vec(section_headers_stream)
            .context("failed to read the section headers stream")?;
        let section_headers = SectionHeaders::parse(&section_headers_data)
            .context("failed to parse the section headers stream")?;

        let tpi_data = msf
            .read_stream_to_vec(stream::TPI)
            .context("failed to read the TPI stream")?;
        let tpi = TypeStream::parse(&tpi_data).context("failed to parse the TPI stream")?;

        Ok(Self {
            msf,
            dbi_header,
            modules,
            section_contributions,
            section_headers,
            tpi,
        })
    }

    /// Resolves a `(section, offset)` pair to a relative virtual address. A `section` of 0
    /// (a stripped symbol with no section) always resolves to `None`.
    pub fn resolve_rva(&self, section: u16, offset: u32) -> Option<u32> {
        self.section_headers.resolve(section, offset)
    }

    /// The raw Section Contributions substream bytes, version tag included.
    pub fn section_contributions_bytes(&self) -> &[u8] {
        &self.section_contributions
    }

    /// Parses and returns the Section Contributions substream.
    pub fn section_contributions(&self) -> anyhow::Result<SectionContributionsSubstream<'_>> {
        SectionContributionsSubstream::parse(&self.section_contributions)
            .context("failed to parse the section contributions substream")
    }

    /// Iterates the Modules substream (one entry per compiland plus linker-synthesized
    /// pseudo-modules).
    pub fn iter_modules(&self) -> IterModuleInfo<'_> {
        IterModuleInfo::new(&self.modules)
    }

    /// Decodes a module's own symbol stream, if it has one (some linker-synthesized modules do
    /// not). The 4-byte CodeView signature at the start of the stream is stripped before the
    /// symbol records are handed back.
    pub fn module_symbols(&self, module: &ModuleInfo<'_>) -> anyhow::Result<Option<ModuleSymbols>> {
        let Some(stream_index) = module.stream() else {
            return Ok(None);
        };
        let stream_data = self
            .msf
            .read_stream_to_vec(stream_index)
            .with_context(|| format!("failed to read symbol stream for module {}", module.module_name()))?;
        let (_signature, sym_data) = split_sym_data_signature(&stream_data)
            .map_err(|_| anyhow::anyhow!("module symbol stream is too small for its signature"))?;
        Ok(Some(ModuleSymbols {
            data: sym_data.to_vec(),
        }))
    }

    /// The Global Symbol Index (GSI): a name table over every non-public global symbol.
    pub fn global_symbol_index(&self) -> anyhow::Result<GlobalSymbolIndex> {
        let Some(stream_index) = self.dbi_header.global_stream_index() else {
            return Ok(GlobalSymbolIndex::empty());
        };
        let data = self
            .msf
            .read_stream_to_vec(stream_index)
            .context("failed to read the Global Symbol Index stream")?;
        GlobalSymbolIndex::parse(&data)
    }

    /// The Public Symbol Index (PSI): a name table over every `S_PUB32` record.
    pub fn public_symbol_index(&self) -> anyhow::Result<PublicSymbolIndex> {
        let Some(stream_index) = self.dbi_header.public_stream_index() else {
            return Ok(PublicSymbolIndex::empty());
        };
        let data = self
            .msf
            .read_stream_to_vec(stream_index)
            .context("failed to read the Public Symbol Index stream")?;
        PublicSymbolIndex::parse(&data)
    }

    /// The coalesced symbol record stream (GSS) that the GSI and PSI hash tables point into.
    pub fn global_symbol_stream(&self) -> anyhow::Result<GlobalSymbolStream> {
        let Some(stream_index) = self.dbi_header.sym_record_stream() else {
            return Ok(GlobalSymbolStream::new(Vec::new()));
        };
        let data = self
            .msf
            .read_stream_to_vec(stream_index)
            .context("failed to read the coalesced symbol record stream")?;
        Ok(GlobalSymbolStream::new(data))
    }

    /// The type-size oracle built on this PDB's TPI stream (§4.3).
    pub fn type_size_oracle(&self) -> TypeSizeOracle<'_> {
        TypeSizeOracle::new(&self.tpi)
    }
}

/// A decoded module symbol stream, with the leading CodeView signature already stripped.
pub struct ModuleSymbols {
    data: Vec<u8>,
}

impl ModuleSymbols {
    /// Iterates the symbol records in this module's stream, in on-disk order.
    pub fn iter_syms(&self) -> SymIter<'_> {
        SymIter::new(&self.data)
    }
}

