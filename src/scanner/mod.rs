//! Population loader for discovering and parsing fitness files.
//!
//! A directory becomes a deme whose members are its sub-directories and
//! matching files, each of which becomes a nested deme in turn. Entries are
//! visited in file-name order so the resulting views are reproducible.

mod formats;

pub use formats::{parse_json, parse_text};

use crate::error::LoadError;
use crate::models::{Deme, Individual};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Population tree as loaded from disk.
pub type LoadedDeme = Deme<Arc<Individual>>;

/// Configuration for population scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["txt", "csv", "json"])
    pub extensions: Vec<String>,
    /// Names to skip (e.g., ["target", "archive"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum directory nesting below the root
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excludes: vec!["target".to_string()],
            max_file_size: 16 * 1024 * 1024,
            max_depth: 16,
        }
    }
}

/// Extensions the loader knows how to parse.
pub fn default_extensions() -> Vec<String> {
    vec!["txt", "csv", "fit", "json"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the scan root
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// Loads population trees from a file or directory.
pub struct PopulationScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl PopulationScanner {
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// List every file that [`load`](Self::load) would parse.
    pub fn scan(&self) -> Result<Vec<ScannedFile>, LoadError> {
        let mut files = Vec::new();

        if self.root.is_file() {
            if self.matches(&self.root)? {
                files.push(ScannedFile {
                    path: display_name(&self.root),
                    size: file_size(&self.root)?,
                });
            }
            return Ok(files);
        }

        self.scan_dir(&self.root, 0, &mut files)?;
        Ok(files)
    }

    /// Load the population tree rooted at the scanner's path.
    ///
    /// A root file is held to the same extension and size limits as files
    /// found inside a directory; one that fails them is unsupported.
    pub fn load(&self) -> Result<LoadedDeme, LoadError> {
        if self.root.is_file() {
            if !self.matches(&self.root)? {
                return Err(LoadError::Unsupported(self.root.clone()));
            }
            return self.load_file(&self.root);
        }
        if self.root.is_dir() {
            return self.load_dir(&self.root, 0);
        }
        Err(LoadError::Unsupported(self.root.clone()))
    }

    fn load_dir(&self, dir: &Path, depth: usize) -> Result<LoadedDeme, LoadError> {
        let mut deme = Deme::new(display_name(dir));

        for entry in self.entries(dir)? {
            let path = entry.as_path();
            if path.is_dir() {
                if depth >= self.config.max_depth {
                    warn!("Skipping {}: deeper than {} levels", path.display(), self.config.max_depth);
                    continue;
                }
                deme.push_deme(self.load_dir(path, depth + 1)?);
            } else if self.matches(path)? {
                deme.push_deme(self.load_file(path)?);
            }
        }

        debug!(
            "Loaded deme {} ({} members, {} genomes)",
            deme.name,
            deme.len(),
            deme.leaf_count()
        );
        Ok(deme)
    }

    fn load_file(&self, path: &Path) -> Result<LoadedDeme, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match extension(path).as_str() {
            "json" => parse_json(path, &content),
            "txt" | "csv" | "fit" => parse_text(path, &content),
            _ => Err(LoadError::Unsupported(path.to_path_buf())),
        }
    }

    fn scan_dir(&self, dir: &Path, depth: usize, files: &mut Vec<ScannedFile>) -> Result<(), LoadError> {
        for entry in self.entries(dir)? {
            let path = entry.as_path();
            if path.is_dir() {
                if depth < self.config.max_depth {
                    self.scan_dir(path, depth + 1, files)?;
                }
            } else if self.matches(path)? {
                let rel_path = path.strip_prefix(&self.root).unwrap_or(path);
                files.push(ScannedFile {
                    path: rel_path.to_string_lossy().to_string(),
                    size: file_size(path)?,
                });
            }
        }
        Ok(())
    }

    /// Direct children of `dir`, sorted by name, with exclusions applied.
    fn entries(&self, dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| LoadError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;

            let name = entry.file_name().to_string_lossy();
            if self.is_excluded(&name) {
                debug!("Excluding {}", entry.path().display());
                continue;
            }
            entries.push(entry.into_path());
        }

        Ok(entries)
    }

    /// Check if a file matches scan criteria.
    fn matches(&self, path: &Path) -> Result<bool, LoadError> {
        if !self.config.extensions.contains(&extension(path)) {
            return Ok(false);
        }

        let size = file_size(path)?;
        if size > self.config.max_file_size {
            warn!(
                "Skipping {}: {} bytes exceeds limit of {}",
                path.display(),
                size,
                self.config.max_file_size
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn file_size(path: &Path) -> Result<u64, LoadError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Deme name for a path: its final component, or the whole path for `.`/`/`.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
