//! The aggregator (spec.md §4.5): folds the symbol list into object-file and namespace
//! code/data totals and template families, then folds the contribution list into object-file
//! contribution totals.

use crate::contributions::ContributionIndex;
use crate::model::{NamespaceTable, ObjectFileTable, SectionClass, Symbol};
use crate::templates::strip_template_params;
use std::collections::HashMap;

/// One template family: a name with every balanced `<...>` range stripped, the number of
/// distinct instantiations folded into it, and the sum of their sizes (spec.md §3, §4.5).
#[derive(Debug, Clone)]
pub struct TemplateFamily {
    pub name: String,
    pub count: u32,
    pub size: u64,
}

/// Aggregates `symbols` into `object_files`'/`namespaces`' running totals (mutated in place) and
/// returns the resulting template families, and folds `contributions` into the object files'
/// contribution totals.
///
/// This is a single pass over `symbols` (spec.md §4.5): for each symbol it updates the owning
/// object file's and namespace's code/data total, and folds it into its template family if its
/// name contains a balanced `<...>` range. A second pass over `contributions` updates the
/// object files' contribution totals.
pub fn aggregate(
    symbols: &[Symbol],
    contributions: &ContributionIndex,
    object_files: &mut ObjectFileTable,
    namespaces: &mut NamespaceTable,
) -> Vec<TemplateFamily> {
    let mut families: HashMap<String, TemplateFamily> = HashMap::new();

    for symbol in symbols {
        match symbol.class {
            SectionClass::Code => {
                object_files.get_mut(symbol.object_file).symbol_code += symbol.size as u64;
                namespaces.get_mut(symbol.namespace).code += symbol.size as u64;
            }
            SectionClass::Data | SectionClass::Bss => {
                object_files.get_mut(symbol.object_file).symbol_data += symbol.size as u64;
                namespaces.get_mut(symbol.namespace).data += symbol.size as u64;
            }
            SectionClass::Unknown => {}
        }

        let stripped = strip_template_params(&symbol.name);
        if stripped != symbol.name {
            let family = families.entry(stripped.clone()).or_insert_with(|| TemplateFamily {
                name: stripped,
                count: 0,
                size: 0,
            });
            family.count += 1;
            family.size += symbol.size as u64;
        }
    }

    for contrib in contributions.iter() {
        let file = object_files.get_mut(contrib.object_file);
        match contrib.class {
            SectionClass::Code => file.contrib_code += contrib.size as u64,
            SectionClass::Data | SectionClass::Bss => file.contrib_data += contrib.size as u64,
            SectionClass::Unknown => {}
        }
    }

    families.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributions::Contribution;
    use crate::model::NONAME;

    fn symbol(name: &str, object_file: u32, namespace: u32, class: SectionClass, rva: u32, size: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            object_file,
            namespace,
            class,
            rva,
            size,
        }
    }

    #[test]
    fn code_and_data_totals_accumulate_per_object_file_and_namespace() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("/a.obj");
        let mut namespaces = NamespaceTable::new();
        let ns = namespaces.intern("<global>");

        let symbols = vec![
            symbol("foo", f, ns, SectionClass::Code, 0x1000, 100),
            symbol("bar", f, ns, SectionClass::Data, 0x2000, 50),
        ];
        let contributions = ContributionIndex::default();

        aggregate(&symbols, &contributions, &mut object_files, &mut namespaces);

        assert_eq!(object_files.get(f).symbol_code, 100);
        assert_eq!(object_files.get(f).symbol_data, 50);
        assert_eq!(namespaces.get(ns).code, 100);
        assert_eq!(namespaces.get(ns).data, 50);
    }

    #[test]
    fn bss_folds_into_data_totals() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("/a.obj");
        let mut namespaces = NamespaceTable::new();
        let ns = namespaces.intern("<global>");

        let symbols = vec![symbol("bss_var", f, ns, SectionClass::Bss, 0x3000, 200)];
        let contributions = ContributionIndex::default();
        aggregate(&symbols, &contributions, &mut object_files, &mut namespaces);
        assert_eq!(object_files.get(f).symbol_data, 200);
    }

    #[test]
    fn templated_symbols_fold_into_one_family() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("/a.obj");
        let mut namespaces = NamespaceTable::new();
        let ns = namespaces.intern("<global>");

        let symbols = vec![
            symbol("Foo<int>", f, ns, SectionClass::Code, 0x1000, 1024),
            symbol("Foo<long>", f, ns, SectionClass::Code, 0x2000, 1024),
            symbol("Foo<float>", f, ns, SectionClass::Code, 0x3000, 1024),
        ];
        let contributions = ContributionIndex::default();
        let families = aggregate(&symbols, &contributions, &mut object_files, &mut namespaces);

        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Foo");
        assert_eq!(families[0].count, 3);
        assert_eq!(families[0].size, 3072);
    }

    #[test]
    fn non_templated_symbols_are_not_folded() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("/a.obj");
        let mut namespaces = NamespaceTable::new();
        let ns = namespaces.intern("<global>");

        let symbols = vec![symbol(NONAME, f, ns, SectionClass::Code, 0x1000, 16)];
        let contributions = ContributionIndex::default();
        let families = aggregate(&symbols, &contributions, &mut object_files, &mut namespaces);
        assert!(families.is_empty());
    }

    #[test]
    fn contribution_totals_accumulate_independently_of_symbol_totals() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("/a.obj");
        let mut namespaces = NamespaceTable::new();

        let mut contributions = ContributionIndex::default();
        contributions.push_for_test(Contribution {
            rva: 0x1000,
            size: 4096,
            class: SectionClass::Code,
            object_file: f,
        });

        aggregate(&[], &contributions, &mut object_files, &mut namespaces);
        assert_eq!(object_files.get(f).contrib_code, 4096);
        assert_eq!(object_files.get(f).symbol_code, 0);
    }
}
