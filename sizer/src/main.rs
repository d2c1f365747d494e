//! `sizer`: reports a size breakdown of a native executable from its companion PDB (spec.md §1).

#![forbid(unsafe_code)]

mod aggregator;
mod cli;
mod collector;
mod contributions;
mod model;
mod pe_locator;
mod reporter;
mod templates;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use cli::Cli;
use contributions::ContributionIndex;
use model::{NamespaceTable, ObjectFileTable};
use pdbreader::PdbFile;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let pdb_path = resolve_pdb_path(Path::new(&cli.path))?;
    info!(path = %pdb_path.display(), "opening PDB");
    let pdb =
        PdbFile::open(&pdb_path).with_context(|| format!("failed to open {}", pdb_path.display()))?;

    let mut object_files = ObjectFileTable::new();
    let mut namespaces = NamespaceTable::new();

    let module_obj_index = contributions::build_module_object_files(&pdb, &mut object_files);
    let contribution_index = ContributionIndex::build(&pdb, &module_obj_index)
        .context("failed to build the section-contribution index")?;

    let symbols = collector::collect(&pdb, &contribution_index, &mut object_files, &mut namespaces)
        .context("failed to collect symbols")?;

    let families =
        aggregator::aggregate(&symbols, &contribution_index, &mut object_files, &mut namespaces);

    let thresholds = cli.thresholds();
    let report = reporter::generate(
        &symbols,
        &families,
        &contribution_index,
        &object_files,
        &namespaces,
        &thresholds,
        cli.name.as_deref(),
    );

    print!("{report}");
    Ok(())
}

/// Resolves the PDB path for `input_path`: if it names a PE image (case-insensitive `.exe`/`.dll`
/// suffix), reads its companion PDB path from the CodeView debug directory (§4.1); otherwise
/// `input_path` is already a PDB path and is returned unchanged.
fn resolve_pdb_path(input_path: &Path) -> anyhow::Result<PathBuf> {
    let is_pe = input_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe") || ext.eq_ignore_ascii_case("dll"));

    if !is_pe {
        return Ok(input_path.to_path_buf());
    }

    let image = std::fs::read(input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;
    let pdb_name = pe_locator::find_pdb_path(&image);
    if pdb_name.is_empty() {
        bail!(
            "could not locate a companion PDB in the debug directory of {}",
            input_path.display()
        );
    }

    Ok(PathBuf::from(pdb_name))
}

/// Installs a `tracing_subscriber::fmt` subscriber. `RUST_LOG` takes precedence when set;
/// otherwise the verbosity follows `-v`/`--verbose` (warn by default, info at `-v`, debug at
/// `-vv` or higher), matching the teacher's `pdbtool`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pe_path_is_returned_unchanged() {
        let resolved = resolve_pdb_path(Path::new("foo.pdb")).unwrap();
        assert_eq!(resolved, PathBuf::from("foo.pdb"));
    }

    #[test]
    fn pe_extension_matching_is_case_insensitive() {
        // A missing .EXE file fails at the read step, before PDB lookup; this just exercises the
        // extension check's case-insensitivity by confirming it is treated as a PE, not passed
        // through unchanged.
        let err = resolve_pdb_path(Path::new("missing.EXE")).unwrap_err();
        assert!(err.to_string().contains("missing.EXE"));
    }
}
