//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// fitview - fitness statistics for evolutionary populations
///
/// Loads genomes from fitness files (a directory tree becomes a hybrid
/// population) and reports mean, variance, standard deviation and extremes.
///
/// Examples:
///   fitview --input ./generation-42
///   fitview --input pop.csv --format json --output stats.json
///   fitview --input ./islands --generations 100 --workers 8
///   fitview --input ./islands --dry-run
///   fitview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Population file or directory to analyze
    #[arg(short, long, value_name = "PATH", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Report format (text, markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fitview.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "FITVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// File extensions to load (comma-separated)
    ///
    /// Example: --extensions csv,json
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Names to skip while scanning (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Maximum directory nesting below the input
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Maximum idle view buffers kept for reuse
    #[arg(long, value_name = "COUNT")]
    pub max_idle: Option<usize>,

    /// Decimal places for fitness values
    #[arg(long, value_name = "DIGITS")]
    pub precision: Option<usize>,

    /// Number of best genomes to list
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Leave the per-deme breakdown out of the report
    #[arg(long)]
    pub no_demes: bool,

    /// Replay statistics gathering for this many generations
    #[arg(long, value_name = "COUNT")]
    pub generations: Option<usize>,

    /// Concurrent workers per replayed generation
    #[arg(long, value_name = "NUM")]
    pub workers: Option<usize>,

    /// Fail if the best fitness is below this value
    ///
    /// Useful for CI pipelines. Exit code 2 when the target is missed.
    #[arg(long, value_name = "FITNESS", allow_negative_numbers = true)]
    pub fail_below: Option<f64>,

    /// Dry run: list the files that would be loaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .fitview.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text summary (default)
    #[default]
    Text,
    /// Markdown report
    Markdown,
    /// JSON report
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input {
            Some(ref input) if !input.exists() => {
                return Err(format!("Input does not exist: {}", input.display()));
            }
            None => return Err("An --input path is required".to_string()),
            _ => {}
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.workers == Some(0) {
            return Err("Workers must be at least 1".to_string());
        }

        if let Some(precision) = self.precision {
            if precision > 17 {
                return Err("Precision must be at most 17 digits".to_string());
            }
        }

        if let Some(target) = self.fail_below {
            if target.is_nan() {
                return Err("--fail-below must be a number".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args::parse_from(["fitview", "--input", "."])
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "fitview",
            "--input",
            "pops",
            "--format",
            "markdown",
            "--extensions",
            "csv,json",
            "--generations",
            "20",
            "--fail-below",
            "-1.5",
        ]);
        assert_eq!(args.format, Some(OutputFormat::Markdown));
        assert_eq!(
            args.extensions,
            Some(vec!["csv".to_string(), "json".to_string()])
        );
        assert_eq!(args.generations, Some(20));
        assert_eq!(args.fail_below, Some(-1.5));
    }

    #[test]
    fn test_init_config_needs_no_input() {
        let args = Args::try_parse_from(["fitview", "--init-config"]).unwrap();
        assert!(args.init_config);
        assert!(args.validate().is_ok());
        assert!(Args::try_parse_from(["fitview"]).is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/no/such/population"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut args = make_args();
        assert!(args.validate().is_ok());
        args.workers = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
