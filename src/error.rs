//! Error types for the statistics engine and its loaders.
//!
//! Library code returns these typed errors; the binary wraps them with
//! `anyhow` context at the boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading statistics out of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The view holds no genomes, so extremes and spread are undefined.
    #[error("view is empty: max, min, range and variance need at least one genome")]
    Empty,
}

/// Failures loading a population tree from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid fitness value {value:?}")]
    Parse {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("failed to parse JSON population {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported population source: {0}")]
    Unsupported(PathBuf),
}

/// Failures while replaying statistics gathering over several generations.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("generation {generation}: workers disagree on {field} ({left} vs {right})")]
    Diverged {
        generation: usize,
        field: &'static str,
        left: String,
        right: String,
    },
}
