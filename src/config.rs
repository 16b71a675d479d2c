//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fitview.toml` files.

use crate::cli::{Args, OutputFormat};
use anyhow::{Context, Result};
use fitview::replay::ReplayOptions;
use fitview::report::ReportOptions;
use fitview::scanner::{default_extensions, ScanConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".fitview.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// View pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Population loader settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Generation replay settings.
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// View pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum idle buffers kept for reuse.
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: default_max_idle(),
        }
    }
}

fn default_max_idle() -> usize {
    fitview::view::DEFAULT_MAX_IDLE
}

/// Population loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions to load.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum directory nesting below the input root.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_depth: default_max_depth(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl ScannerConfig {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            extensions: self.extensions.clone(),
            excludes: self.excludes.clone(),
            max_file_size: self.max_file_size,
            max_depth: self.max_depth,
        }
    }
}

fn default_excludes() -> Vec<String> {
    ScanConfig::default().excludes
}

fn default_max_depth() -> usize {
    ScanConfig::default().max_depth
}

fn default_max_file_size() -> u64 {
    ScanConfig::default().max_file_size
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal places for fitness values.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Number of best genomes to list.
    #[serde(default = "default_top_genomes")]
    pub top_genomes: usize,

    /// Include the per-deme breakdown.
    #[serde(default = "default_true")]
    pub include_demes: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            top_genomes: default_top_genomes(),
            include_demes: true,
        }
    }
}

impl ReportConfig {
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_genomes: self.top_genomes,
            include_demes: self.include_demes,
            precision: self.precision,
        }
    }
}

fn default_precision() -> usize {
    6
}

fn default_top_genomes() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Generation replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Generations to replay; 0 skips the replay.
    #[serde(default)]
    pub generations: usize,

    /// Concurrent workers per generation.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            generations: 0,
            workers: default_workers(),
        }
    }
}

impl ReplayConfig {
    pub fn replay_options(&self, show_progress: bool) -> ReplayOptions {
        ReplayOptions {
            generations: self.generations,
            workers: self.workers,
            show_progress,
        }
    }
}

fn default_workers() -> usize {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        if let Some(max_idle) = args.max_idle {
            self.pool.max_idle = max_idle;
        }

        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }
        if let Some(max_depth) = args.max_depth {
            self.scanner.max_depth = max_depth;
        }

        if let Some(precision) = args.precision {
            self.report.precision = precision;
        }
        if let Some(top) = args.top {
            self.report.top_genomes = top;
        }
        if args.no_demes {
            self.report.include_demes = false;
        }

        if let Some(generations) = args.generations {
            self.replay.generations = generations;
        }
        if let Some(workers) = args.workers {
            self.replay.workers = workers;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
