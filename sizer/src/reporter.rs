//! The reporter (spec.md §4.6): renders the aggregated data into the fixed seven-section plain
//! text report, honoring per-section size thresholds and an optional substring filter.

use crate::aggregator::TemplateFamily;
use crate::contributions::ContributionIndex;
use crate::model::{NamespaceTable, ObjectFileTable, SectionClass, Symbol};

/// Per-section size thresholds (spec.md §6). All comparisons are inclusive (`size >= threshold`).
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_function: u64,
    pub min_data: u64,
    pub min_class: u64,
    pub min_file: u64,
    pub min_template: u64,
    pub min_template_count: u32,
}

impl Default for Thresholds {
    /// The defaults named in spec.md §6, in bytes.
    fn default() -> Self {
        Self {
            min_function: 512,
            min_data: 1024,
            min_class: 2048,
            min_file: 2048,
            min_template: 512,
            min_template_count: 3,
        }
    }
}

impl Thresholds {
    /// Sets every threshold to 0 (`-a`/`--all`).
    pub fn all() -> Self {
        Self {
            min_function: 0,
            min_data: 0,
            min_class: 0,
            min_file: 0,
            min_template: 0,
            min_template_count: 0,
        }
    }

    /// Sets every size threshold (not the template instantiation count) to `kb` kilobytes
    /// (`-m`/`--min`).
    pub fn set_all_min_kb(&mut self, kb: f64) {
        let bytes = (kb * 1024.0) as u64;
        self.min_function = bytes;
        self.min_data = bytes;
        self.min_class = bytes;
        self.min_file = bytes;
        self.min_template = bytes;
    }
}

/// The maximum length, in bytes, of any single emitted line (spec.md §4.6). Lines longer than
/// this are truncated, with the last four bytes forced to `"...\n"` to mark the cut.
const MAX_LINE_BYTES: usize = 512;

/// Renders the full report: functions, templates, data, BSS, namespaces, object files by code
/// size, object files by data size, and totals, in that fixed order (spec.md §4.6).
pub fn generate(
    symbols: &[Symbol],
    families: &[TemplateFamily],
    contributions: &ContributionIndex,
    object_files: &ObjectFileTable,
    namespaces: &NamespaceTable,
    thresholds: &Thresholds,
    filter: Option<&str>,
) -> String {
    let mut out = String::new();

    section_functions(&mut out, symbols, object_files, thresholds, filter);
    section_templates(&mut out, families, thresholds, filter);
    section_data(&mut out, symbols, object_files, thresholds, filter, SectionClass::Data, "Data");
    section_data(&mut out, symbols, object_files, thresholds, filter, SectionClass::Bss, "BSS");
    section_namespaces(&mut out, namespaces, thresholds, filter);
    section_object_files_by(&mut out, object_files, thresholds, filter, true);
    section_object_files_by(&mut out, object_files, thresholds, filter, false);
    section_totals(&mut out, symbols, contributions);

    out
}

fn matches_filter(filter: Option<&str>, fields: &[&str]) -> bool {
    match filter {
        None => true,
        Some(f) => fields.iter().any(|field| field.contains(f)),
    }
}

/// Formats `bytes` as `%5d.%02d` kilobytes (spec.md §4.6).
fn format_kb(bytes: u64) -> String {
    format!("{:5}.{:02}", bytes / 1024, (bytes % 1024) * 100 / 1024)
}

/// Appends `line` to `out`, truncating to [`MAX_LINE_BYTES`] bytes and forcing the last four
/// bytes to `"...\n"` if it would otherwise be longer, then a trailing newline either way.
fn push_line(out: &mut String, line: &str) {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    if bytes.len() > MAX_LINE_BYTES {
        bytes.truncate(MAX_LINE_BYTES);
        let marker = b"...\n";
        let start = MAX_LINE_BYTES - marker.len();
        bytes[start..].copy_from_slice(marker);
    }
    out.push_str(&String::from_utf8_lossy(&bytes));
}

fn section_functions(
    out: &mut String,
    symbols: &[Symbol],
    object_files: &ObjectFileTable,
    thresholds: &Thresholds,
    filter: Option<&str>,
) {
    out.push_str("Functions by size:\n");
    let mut rows: Vec<&Symbol> = symbols
        .iter()
        .filter(|s| s.class == SectionClass::Code && s.size as u64 >= thresholds.min_function)
        .collect();
    rows.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(a.object_file.cmp(&b.object_file))
            .then(a.name.cmp(&b.name))
    });
    for sym in rows {
        let desc = object_files.display_name(sym.object_file);
        if !matches_filter(filter, &[&sym.name, &desc]) {
            continue;
        }
        push_line(out, &format!("{}: {:<50} {}", format_kb(sym.size as u64), sym.name, desc));
    }
    out.push('\n');
}

fn section_templates(
    out: &mut String,
    families: &[TemplateFamily],
    thresholds: &Thresholds,
    filter: Option<&str>,
) {
    out.push_str("Aggregated templates by size:\n");
    let mut rows: Vec<&TemplateFamily> = families
        .iter()
        .filter(|f| f.size >= thresholds.min_template && f.count >= thresholds.min_template_count)
        .collect();
    rows.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(b.count.cmp(&a.count))
            .then(a.name.cmp(&b.name))
    });
    for family in rows {
        if !matches_filter(filter, &[&family.name]) {
            continue;
        }
        push_line(
            out,
            &format!("{}: {:<50} ({} instantiations)", format_kb(family.size), family.name, family.count),
        );
    }
    out.push('\n');
}

fn section_data(
    out: &mut String,
    symbols: &[Symbol],
    object_files: &ObjectFileTable,
    thresholds: &Thresholds,
    filter: Option<&str>,
    class: SectionClass,
    title: &str,
) {
    out.push_str(&format!("{title} by size:\n"));
    let mut rows: Vec<&Symbol> = symbols
        .iter()
        .filter(|s| s.class == class && s.size as u64 >= thresholds.min_data)
        .collect();
    rows.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(a.object_file.cmp(&b.object_file))
            .then(a.name.cmp(&b.name))
    });
    for sym in rows {
        let desc = object_files.display_name(sym.object_file);
        if !matches_filter(filter, &[&sym.name, &desc]) {
            continue;
        }
        push_line(out, &format!("{}: {:<50} {}", format_kb(sym.size as u64), sym.name, desc));
    }
    out.push('\n');
}

fn section_namespaces(
    out: &mut String,
    namespaces: &NamespaceTable,
    thresholds: &Thresholds,
    filter: Option<&str>,
) {
    out.push_str("Classes/Namespaces by code size:\n");
    let mut rows: Vec<_> = namespaces
        .iter()
        .filter(|ns| ns.code >= thresholds.min_class)
        .collect();
    rows.sort_by(|a, b| b.code.cmp(&a.code).then(b.data.cmp(&a.data)).then(a.name.cmp(&b.name)));
    for ns in rows {
        if !matches_filter(filter, &[&ns.name]) {
            continue;
        }
        push_line(
            out,
            &format!("{} code, {} data: {}", format_kb(ns.code), format_kb(ns.data), ns.name),
        );
    }
    out.push('\n');
}

/// Renders one of the two "object files by ..." sections (spec.md §4.6 items 6 and 7).
/// `by_code` selects code totals when true, data totals when false.
fn section_object_files_by(
    out: &mut String,
    object_files: &ObjectFileTable,
    thresholds: &Thresholds,
    filter: Option<&str>,
    by_code: bool,
) {
    out.push_str(if by_code {
        "Object files by code size:\n"
    } else {
        "Object files by data size:\n"
    });

    let mut rows: Vec<_> = object_files
        .iter()
        .filter(|f| {
            let (symbol_total, contrib_total) = if by_code {
                (f.symbol_code, f.contrib_code)
            } else {
                (f.symbol_data, f.contrib_data)
            };
            symbol_total >= thresholds.min_file || contrib_total >= thresholds.min_file
        })
        .collect();
    rows.sort_by(|a, b| {
        let (a_contrib, a_symbol) = if by_code {
            (a.contrib_code, a.symbol_code)
        } else {
            (a.contrib_data, a.symbol_data)
        };
        let (b_contrib, b_symbol) = if by_code {
            (b.contrib_code, b.symbol_code)
        } else {
            (b.contrib_data, b.symbol_data)
        };
        b_contrib
            .cmp(&a_contrib)
            .then(b_symbol.cmp(&a_symbol))
            .then(a.index.cmp(&b.index))
    });

    for file in rows {
        let desc = object_files.display_name(file.index);
        if !matches_filter(filter, &[&desc]) {
            continue;
        }
        let (contrib_total, symbol_total) = if by_code {
            (file.contrib_code, file.symbol_code)
        } else {
            (file.contrib_data, file.symbol_data)
        };
        let mut line = format!("{}: {}", format_kb(contrib_total), desc);
        // contrib_total as f64 * (1.0 / 1.2) without floating point: symbol_total < contrib_total / 1.2
        // is equivalent to symbol_total * 6 < contrib_total * 5.
        if (symbol_total as u128) * 6 < (contrib_total as u128) * 5 {
            line.push_str(&format!(" [{} with symbols]", format_kb(symbol_total)));
        }
        push_line(out, &line);
    }
    out.push('\n');
}

/// Emits the final totals section (spec.md §4.6 item 8): overall code, data, BSS and (if
/// nonzero) other bytes, each as a contribution total, with code and data additionally carrying
/// their symbol-derived total in parentheses. Computed directly from `symbols` and
/// `contributions` (rather than the per-object-file running totals, which merge BSS into the
/// data bucket) so the four classes stay disjoint here.
fn section_totals(out: &mut String, symbols: &[Symbol], contributions: &ContributionIndex) {
    let mut contrib_code = 0u64;
    let mut contrib_data = 0u64;
    let mut bss = 0u64;
    let mut other = 0u64;
    for contrib in contributions.iter() {
        match contrib.class {
            SectionClass::Code => contrib_code += contrib.size as u64,
            SectionClass::Data => contrib_data += contrib.size as u64,
            SectionClass::Bss => bss += contrib.size as u64,
            SectionClass::Unknown => other += contrib.size as u64,
        }
    }

    let mut symbol_code = 0u64;
    let mut symbol_data = 0u64;
    for sym in symbols {
        match sym.class {
            SectionClass::Code => symbol_code += sym.size as u64,
            SectionClass::Data => symbol_data += sym.size as u64,
            SectionClass::Bss | SectionClass::Unknown => {}
        }
    }

    out.push_str(&format!(
        "Overall code: {} kb ({} with symbols)\n",
        format_kb(contrib_code).trim(),
        format_kb(symbol_code).trim()
    ));
    out.push_str(&format!(
        "Overall data: {} kb ({} with symbols)\n",
        format_kb(contrib_data).trim(),
        format_kb(symbol_data).trim()
    ));
    out.push_str(&format!("Overall BSS: {} kb\n", format_kb(bss).trim()));
    if other != 0 {
        out.push_str(&format!("Overall other: {} kb\n", format_kb(other).trim()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn function_below_threshold_is_omitted() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("a.obj");
        let namespaces = NamespaceTable::new();
        let contributions = ContributionIndex::default();
        let symbols = vec![symbol("main", f, 0, SectionClass::Code, 0x1000, 128)];
        let report = generate(&symbols, &[], &contributions, &object_files, &namespaces, &Thresholds::default(), None);
        assert!(!report.contains("main"));
    }

    #[test]
    fn all_thresholds_zero_includes_zero_size_entries() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("a.obj");
        let namespaces = NamespaceTable::new();
        let contributions = ContributionIndex::default();
        let symbols = vec![symbol("tiny", f, 0, SectionClass::Code, 0x1000, 0)];
        let report = generate(&symbols, &[], &contributions, &object_files, &namespaces, &Thresholds::all(), None);
        assert!(report.contains("tiny"));
    }

    #[test]
    fn filter_is_case_sensitive_substring_match() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("a.obj");
        let namespaces = NamespaceTable::new();
        let contributions = ContributionIndex::default();
        let symbols = vec![symbol("DoThing", f, 0, SectionClass::Code, 0x1000, 1024)];
        let report = generate(&symbols, &[], &contributions, &object_files, &namespaces, &Thresholds::all(), Some("DoThing"));
        assert!(report.contains("DoThing"));
        let report = generate(&symbols, &[], &contributions, &object_files, &namespaces, &Thresholds::all(), Some("dothing"));
        assert!(!report.contains("DoThing"));
    }

    #[test]
    fn object_files_with_same_basename_are_disambiguated() {
        let mut object_files = ObjectFileTable::new();
        let a = object_files.intern("/a/util.obj");
        let b = object_files.intern("/b/util.obj");
        object_files.get_mut(a).contrib_code = 4096;
        object_files.get_mut(b).contrib_code = 4096;
        let namespaces = NamespaceTable::new();
        let contributions = ContributionIndex::default();
        let report = generate(&[], &[], &contributions, &object_files, &namespaces, &Thresholds::default(), None);
        assert!(report.contains("util.obj (/a)"));
        assert!(report.contains("util.obj (/b)"));
    }

    #[test]
    fn object_file_symbol_total_well_below_contrib_gets_with_symbols_suffix() {
        let mut object_files = ObjectFileTable::new();
        let f = object_files.intern("a.obj");
        object_files.get_mut(f).contrib_code = 4096;
        object_files.get_mut(f).symbol_code = 100;
        let namespaces = NamespaceTable::new();
        let contributions = ContributionIndex::default();
        let report = generate(&[], &[], &contributions, &object_files, &namespaces, &Thresholds::default(), None);
        assert!(report.contains("with symbols"));
    }

    #[test]
    fn totals_separate_bss_and_code_from_contributions() {
        let object_files = ObjectFileTable::new();
        let namespaces = NamespaceTable::new();
        let mut contributions = ContributionIndex::default();
        contributions.push_for_test(crate::contributions::Contribution {
            rva: 0x1000,
            size: 4096,
            class: SectionClass::Code,
            object_file: 0,
        });
        contributions.push_for_test(crate::contributions::Contribution {
            rva: 0x2000,
            size: 8192,
            class: SectionClass::Bss,
            object_file: 0,
        });
        let report = generate(&[], &[], &contributions, &object_files, &namespaces, &Thresholds::default(), None);
        assert!(report.contains("Overall code: 4.00"));
        assert!(report.contains("Overall BSS: 8.00"));
    }

    #[test]
    fn truncated_line_ends_with_ellipsis_marker() {
        let mut out = String::new();
        let long_name = "x".repeat(1000);
        push_line(&mut out, &long_name);
        assert_eq!(out.len(), MAX_LINE_BYTES);
        assert!(out.ends_with("...\n"));
    }

    #[test]
    fn short_line_is_unaffected() {
        let mut out = String::new();
        push_line(&mut out, "short");
        assert_eq!(out, "short\n");
    }
}
