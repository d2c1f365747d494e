//! The section-contribution index (spec.md §4.2): resolves each DBI section-contribution record
//! to an RVA, classifies it, and attributes it to an object-file slot.

use crate::model::{classify_section, ObjectFileTable, SectionClass};
use coff::section::SectionCharacteristics;
use pdbreader::PdbFile;
use sync_file::ReadAt;
use tracing::warn;

/// Interns each module's object-file path (in DBI module order, matching the module indices that
/// [`pdbreader::dbi::SectionContribEntry::module_index`] refers to) and returns the resulting
/// module-index → object-file-index table.
pub fn build_module_object_files<F: ReadAt>(
    pdb: &PdbFile<F>,
    object_files: &mut ObjectFileTable,
) -> Vec<u32> {
    pdb.iter_modules()
        .map(|module| object_files.intern(&module.obj_file().to_string()))
        .collect()
}

/// One resolved, classified, attributed section contribution.
#[derive(Debug, Clone, Copy)]
pub struct Contribution {
    pub rva: u32,
    pub size: u32,
    pub class: SectionClass,
    pub object_file: u32,
}

impl Contribution {
    pub fn end(&self) -> u32 {
        self.rva.wrapping_add(self.size)
    }

    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.rva && rva < self.end()
    }
}

/// Contributions sorted ascending by RVA, with a binary-search lookup (spec.md §4.2).
///
/// The PDB already presents contributions sorted by `(section, offset)`; since RVA is monotonic
/// in offset within a fixed section and sections are laid out in increasing virtual-address
/// order, the RVA-resolved list is built already sorted and is not re-sorted.
#[derive(Debug, Default)]
pub struct ContributionIndex {
    contribs: Vec<Contribution>,
}

impl ContributionIndex {
    /// Builds the index from a PDB's Modules substream and Section Contributions substream,
    /// resolving each entry's `(section, offset)` to an RVA via the PDB's section headers.
    pub fn build<F: ReadAt>(pdb: &PdbFile<F>, module_obj_index: &[u32]) -> anyhow::Result<Self> {
        let substream = pdb.section_contributions()?;
        let mut contribs = Vec::new();
        for entry in substream.contribs {
            let Some(rva) = pdb.resolve_rva(entry.section.get(), entry.offset.get() as u32) else {
                warn!(
                    section = entry.section.get(),
                    offset = entry.offset.get(),
                    "section contribution has an unresolvable RVA, dropping"
                );
                continue;
            };
            if rva == 0 {
                warn!("section contribution resolved to RVA 0, dropping");
                continue;
            }

            let module_index = entry.module_index.get() as usize;
            let Some(&object_file) = module_obj_index.get(module_index) else {
                warn!(module_index, "section contribution names an out-of-range module, dropping");
                continue;
            };

            contribs.push(Contribution {
                rva,
                size: entry.size.get() as u32,
                class: classify_section(SectionCharacteristics(entry.characteristics.get())),
                object_file,
            });
        }

        Ok(Self { contribs })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contribution> {
        self.contribs.iter()
    }

    pub fn len(&self) -> usize {
        self.contribs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contribs.is_empty()
    }

    /// Appends a contribution directly, bypassing [`Self::build`]. Used by other modules' unit
    /// tests to exercise RVA lookup/attribution against a hand-built index.
    #[cfg(test)]
    pub fn push_for_test(&mut self, contrib: Contribution) {
        self.contribs.push(contrib);
    }

    /// Returns the contribution whose half-open RVA range covers `rva`, if any.
    pub fn lookup(&self, rva: u32) -> Option<&Contribution> {
        let idx = self.contribs.partition_point(|c| c.rva <= rva);
        if idx == 0 {
            return None;
        }
        let candidate = &self.contribs[idx - 1];
        candidate.contains(rva).then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contrib(rva: u32, size: u32, class: SectionClass, object_file: u32) -> Contribution {
        Contribution { rva, size, class, object_file }
    }

    #[test]
    fn lookup_finds_covering_contribution() {
        let index = ContributionIndex {
            contribs: vec![
                contrib(0x1000, 0x10, SectionClass::Code, 0),
                contrib(0x1020, 0x20, SectionClass::Code, 1),
            ],
        };
        assert_eq!(index.lookup(0x1005).unwrap().object_file, 0);
        assert_eq!(index.lookup(0x1020).unwrap().object_file, 1);
        assert_eq!(index.lookup(0x103f).unwrap().object_file, 1);
    }

    #[test]
    fn lookup_returns_none_for_gaps() {
        let index = ContributionIndex {
            contribs: vec![contrib(0x1000, 0x10, SectionClass::Code, 0)],
        };
        assert!(index.lookup(0x500).is_none());
        assert!(index.lookup(0x1020).is_none());
    }
}
