//! Command-line option parsing (spec.md §6), kept separate from `main` the way the teacher's
//! `pdbtool` splits each subcommand's option struct into its own module.

use clap::Parser;

use crate::reporter::Thresholds;

/// Reports a size breakdown of a native executable from its companion PDB.
#[derive(Parser, Debug)]
#[command(name = "sizer", version, about)]
pub struct Cli {
    /// Path to a PDB file, or to an .exe/.dll whose companion PDB is located automatically.
    pub path: String,

    /// Only report entries whose name (or object-file descriptor) contains this substring.
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Set every threshold to 0, including entries of size 0.
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Set every size threshold (in KB, accepts a fraction).
    #[arg(short = 'm', long = "min")]
    pub min: Option<f64>,

    /// Minimum size, in KB, for a function to be listed.
    #[arg(short = 'f', long = "funcmin")]
    pub funcmin: Option<f64>,

    /// Minimum size, in KB, for a data or BSS symbol to be listed.
    #[arg(short = 'd', long = "datamin")]
    pub datamin: Option<f64>,

    /// Minimum code size, in KB, for a class/namespace to be listed.
    #[arg(short = 'c', long = "classmin")]
    pub classmin: Option<f64>,

    /// Minimum size, in KB, for an object file to be listed.
    #[arg(short = 'F', long = "filemin")]
    pub filemin: Option<f64>,

    /// Minimum size, in KB, for a template family to be listed.
    #[arg(short = 't', long = "templatemin")]
    pub templatemin: Option<f64>,

    /// Minimum number of instantiations for a template family to be listed.
    #[arg(short = 'T', long = "templatecount")]
    pub templatecount: Option<u32>,

    /// Increase logging verbosity. May be repeated.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Builds the report [`Thresholds`] from the parsed options, applying `--all`, then `--min`,
    /// then any of the individual per-section overrides, in that precedence order.
    pub fn thresholds(&self) -> Thresholds {
        let mut thresholds = if self.all {
            Thresholds::all()
        } else {
            Thresholds::default()
        };

        if let Some(kb) = self.min {
            thresholds.set_all_min_kb(kb);
        }
        if let Some(kb) = self.funcmin {
            thresholds.min_function = kb_to_bytes(kb);
        }
        if let Some(kb) = self.datamin {
            thresholds.min_data = kb_to_bytes(kb);
        }
        if let Some(kb) = self.classmin {
            thresholds.min_class = kb_to_bytes(kb);
        }
        if let Some(kb) = self.filemin {
            thresholds.min_file = kb_to_bytes(kb);
        }
        if let Some(kb) = self.templatemin {
            thresholds.min_template = kb_to_bytes(kb);
        }
        if let Some(count) = self.templatecount {
            thresholds.min_template_count = count;
        }

        thresholds
    }
}

fn kb_to_bytes(kb: f64) -> u64 {
    (kb * 1024.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_flag_zeroes_every_threshold_before_overrides() {
        let cli = Cli {
            path: "a.pdb".to_string(),
            name: None,
            all: true,
            min: None,
            funcmin: Some(1.0),
            datamin: None,
            classmin: None,
            filemin: None,
            templatemin: None,
            templatecount: None,
            verbose: 0,
        };
        let thresholds = cli.thresholds();
        assert_eq!(thresholds.min_function, 1024);
        assert_eq!(thresholds.min_data, 0);
    }

    #[test]
    fn min_flag_sets_every_size_threshold_but_not_template_count() {
        let cli = Cli {
            path: "a.pdb".to_string(),
            name: None,
            all: false,
            min: Some(2.0),
            funcmin: None,
            datamin: None,
            classmin: None,
            filemin: None,
            templatemin: None,
            templatecount: None,
            verbose: 0,
        };
        let thresholds = cli.thresholds();
        assert_eq!(thresholds.min_function, 2048);
        assert_eq!(thresholds.min_file, 2048);
        assert_eq!(thresholds.min_template_count, 3);
    }

    #[test]
    fn defaults_match_spec() {
        let cli = Cli {
            path: "a.pdb".to_string(),
            name: None,
            all: false,
            min: None,
            funcmin: None,
            datamin: None,
            classmin: None,
            filemin: None,
            templatemin: None,
            templatecount: None,
            verbose: 0,
        };
        let thresholds = cli.thresholds();
        assert_eq!(thresholds.min_function, 512);
        assert_eq!(thresholds.min_data, 1024);
        assert_eq!(thresholds.min_class, 2048);
        assert_eq!(thresholds.min_file, 2048);
        assert_eq!(thresholds.min_template, 512);
        assert_eq!(thresholds.min_template_count, 3);
    }
}
