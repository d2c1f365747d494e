//! The symbol collector (spec.md §4.4): decodes the handful of `S_*` record kinds that describe
//! functions and data, deduplicates by RVA, recovers missing sizes, and attributes each survivor
//! to an object file and section class via the covering contribution.

use crate::contributions::ContributionIndex;
use crate::model::{NamespaceTable, ObjectFileTable, SectionClass, Symbol, NONAME};
use codeview::syms::{Sym, SymData, SymKind};
use codeview::types::TypeIndex;
use pdbreader::tpi::TypeSizeOracle;
use pdbreader::PdbFile;
use std::collections::HashMap;
use sync_file::ReadAt;
use tracing::{trace, trace_span, warn};

/// One decoded, RVA-resolved candidate, before deduplication and length recovery.
struct Candidate {
    rva: u32,
    size: u32,
    name: String,
    /// The CodeView type index to consult during length recovery, for `Data`/`ThreadData`
    /// records whose recorded size is 0. `None` for `Proc` records, which always carry their
    /// own `codeSize`.
    type_index: Option<TypeIndex>,
}

/// Decodes every symbol in `sym`'s stream that matches one of the record kinds spec.md §4.4
/// names, appending RVA-resolved candidates to `out`. Used for both module streams and the
/// coalesced global/public stream.
fn collect_from_syms<F: ReadAt>(
    pdb: &PdbFile<F>,
    syms: impl Iterator<Item = Sym<'_>>,
    out: &mut Vec<Candidate>,
) {
    for sym in syms {
        let data = match sym.kind {
            SymKind::S_LPROC32
            | SymKind::S_GPROC32
            | SymKind::S_LPROC32_ID
            | SymKind::S_GPROC32_ID
            | SymKind::S_LDATA32
            | SymKind::S_GDATA32
            | SymKind::S_LTHREAD32
            | SymKind::S_GTHREAD32 => match sym.parse() {
                Ok(data) => data,
                Err(err) => {
                    warn!(kind = ?sym.kind, ?err, "failed to decode symbol record, skipping");
                    continue;
                }
            },
            _ => continue,
        };

        let (offset_segment, size, name, type_index) = match data {
            SymData::Proc(proc) => (
                proc.fixed.offset_segment,
                proc.fixed.proc_len.get(),
                proc.name.to_string(),
                None,
            ),
            SymData::Data(data) => {
                if sym.kind == SymKind::S_LDATA32 && data.name.is_empty() {
                    // Padding entries frequently show up here with no name; they would
                    // otherwise shadow named data at the same RVA.
                    continue;
                }
                (
                    data.header.offset_segment,
                    0,
                    data.name.to_string(),
                    Some(data.header.type_.get()),
                )
            }
            SymData::ThreadData(thread_data) => (
                thread_data.header.offset_segment,
                0,
                thread_data.name.to_string(),
                Some(thread_data.header.type_.get()),
            ),
            _ => continue,
        };

        let Some(rva) = pdb.resolve_rva(offset_segment.segment(), offset_segment.offset()) else {
            continue;
        };
        if rva == 0 {
            continue;
        }

        out.push(Candidate {
            rva,
            size,
            name: if name.is_empty() { NONAME.to_string() } else { name },
            type_index,
        });
    }
}

/// Runs the full symbol collector (spec.md §4.4): walks every module's symbol stream plus the
/// GSI/PSI-addressed coalesced stream, deduplicates by RVA, recovers missing sizes, and
/// attributes each surviving symbol to an object file and section class.
pub fn collect<F: ReadAt>(
    pdb: &PdbFile<F>,
    contributions: &ContributionIndex,
    object_files: &mut ObjectFileTable,
    namespaces: &mut NamespaceTable,
) -> anyhow::Result<Vec<Symbol>> {
    let _span = trace_span!("collect_symbols").entered();

    let mut candidates = Vec::new();

    for module in pdb.iter_modules() {
        let Some(module_syms) = pdb.module_symbols(&module)? else {
            continue;
        };
        collect_from_syms(pdb, module_syms.iter_syms(), &mut candidates);
    }

    let globals = pdb.global_symbol_index()?;
    let gss = pdb.global_symbol_stream()?;
    let global_syms = globals
        .iter_offsets()
        .filter_map(|offset| gss.get_sym_at(offset).ok());
    collect_from_syms(pdb, global_syms, &mut candidates);

    let publics = pdb.public_symbol_index()?;
    let public_syms = publics
        .iter_offsets()
        .filter_map(|offset| gss.get_sym_at(offset).ok());
    collect_from_syms(pdb, public_syms, &mut candidates);

    trace!(candidates = candidates.len(), "decoded candidate symbols");

    // First-writer-wins dedup by RVA, preserving the walk order (modules, then globals, then
    // publics) established above.
    let mut by_rva: HashMap<u32, usize> = HashMap::new();
    let mut deduped: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if by_rva.contains_key(&candidate.rva) {
            continue;
        }
        by_rva.insert(candidate.rva, deduped.len());
        deduped.push(candidate);
    }
    deduped.sort_by_key(|c| c.rva);

    let oracle = pdb.type_size_oracle();
    recover_sizes(&mut deduped, &oracle, contributions);

    let unknown_object_file = object_files.intern("<unknown>");

    let mut symbols = Vec::with_capacity(deduped.len());
    for candidate in deduped {
        let (object_file, class) = match contributions.lookup(candidate.rva) {
            Some(contrib) => (contrib.object_file, contrib.class),
            None => (unknown_object_file, SectionClass::Unknown),
        };
        let namespace = namespaces.intern_for_symbol(&candidate.name);
        symbols.push(Symbol {
            name: candidate.name,
            object_file,
            namespace,
            class,
            rva: candidate.rva,
            size: candidate.size,
        });
    }

    Ok(symbols)
}

/// Fills in the size of every candidate whose recorded size is 0, taking the smallest non-zero
/// candidate among the type-size oracle, the covering contribution's length, and the gap to the
/// next symbol (spec.md §4.4).
fn recover_sizes(
    deduped: &mut [Candidate],
    oracle: &TypeSizeOracle<'_>,
    contributions: &ContributionIndex,
) {
    for i in 0..deduped.len() {
        if deduped[i].size != 0 {
            continue;
        }

        let mut candidates = Vec::with_capacity(3);

        if let Some(type_index) = deduped[i].type_index {
            if type_index.get() != 0 {
                let size = oracle.size_of(type_index);
                if size != 0 {
                    candidates.push(size);
                }
            }
        }

        if let Some(contrib) = contributions.lookup(deduped[i].rva) {
            if contrib.size != 0 {
                candidates.push(contrib.size);
            }
        }

        if let Some(next) = deduped.get(i + 1) {
            let gap = next.rva.wrapping_sub(deduped[i].rva);
            if gap != 0 {
                candidates.push(gap);
            }
        }

        if let Some(&min) = candidates.iter().min() {
            deduped[i].size = min;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributions::Contribution;

    fn candidate(rva: u32, size: u32, type_index: Option<TypeIndex>) -> Candidate {
        Candidate {
            rva,
            size,
            name: "x".to_string(),
            type_index,
        }
    }

    #[test]
    fn size_recovery_prefers_gap_when_smallest() {
        let mut candidates = vec![candidate(0x1000, 0, None), candidate(0x1010, 4, None)];
        let contributions = ContributionIndex::default();
        let tpi = pdbreader::tpi::TypeStream::parse(&[]).unwrap();
        let oracle = TypeSizeOracle::new(&tpi);
        recover_sizes(&mut candidates, &oracle, &contributions);
        assert_eq!(candidates[0].size, 0x10);
    }

    #[test]
    fn size_recovery_leaves_last_symbol_alone_without_a_contribution() {
        let mut candidates = vec![candidate(0x1000, 0, None)];
        let contributions = ContributionIndex::default();
        let tpi = pdbreader::tpi::TypeStream::parse(&[]).unwrap();
        let oracle = TypeSizeOracle::new(&tpi);
        recover_sizes(&mut candidates, &oracle, &contributions);
        assert_eq!(candidates[0].size, 0);
    }

    #[test]
    fn size_recovery_takes_the_minimum_of_available_candidates() {
        // A zero-size data symbol at 0x2000 whose covering contribution reports 64 bytes, but
        // the next symbol is only 8 bytes away: the gap wins.
        let mut candidates = vec![candidate(0x2000, 0, None), candidate(0x2008, 4, None)];
        let mut contributions = ContributionIndex::default();
        contributions.push_for_test(Contribution {
            rva: 0x2000,
            size: 64,
            class: SectionClass::Data,
            object_file: 0,
        });
        let tpi = pdbreader::tpi::TypeStream::parse(&[]).unwrap();
        let oracle = TypeSizeOracle::new(&tpi);
        recover_sizes(&mut candidates, &oracle, &contributions);
        assert_eq!(candidates[0].size, 8);
    }
}
