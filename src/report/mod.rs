//! Statistics reports.
//!
//! A [`Report`] gathers the root population's summary, a per-deme breakdown
//! and the best genomes into one serializable structure, which the
//! [`generator`] functions render as text, Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, generate_text_report};

use crate::models::{Deme, Genome, Individual, Population};
use crate::replay::ReplayOutcome;
use crate::view::{PoolStats, Summary, ViewPool};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Options controlling what goes into a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Number of best genomes to list.
    pub top_genomes: usize,
    /// Include one row per nested deme.
    pub include_demes: bool,
    /// Decimal places for fitness values.
    pub precision: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_genomes: 5,
            include_demes: true,
            precision: 6,
        }
    }
}

/// Metadata about the statistics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// File or directory the population was loaded from.
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of genomes in the population tree.
    pub genomes: usize,
    /// Number of demes, including the root.
    pub demes: usize,
    /// Nesting depth of the population tree.
    pub depth: usize,
    /// Generations replayed.
    pub generations: usize,
    /// Concurrent workers per generation.
    pub workers: usize,
    /// Wall-clock time of the run in seconds.
    pub duration_seconds: f64,
}

/// Statistics for one deme of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemeSummary {
    /// Slash-separated path from the root deme.
    pub path: String,
    /// Genomes in this deme and its descendants.
    pub genomes: usize,
    /// `None` when the deme holds no genomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

/// One entry of the best-genomes table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedGenome {
    pub rank: usize,
    pub id: String,
    pub fitness: f64,
    /// Position within the root view's members.
    pub index: usize,
}

/// The complete statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Root population statistics; `None` for an empty population.
    pub summary: Option<Summary>,
    pub demes: Vec<DemeSummary>,
    pub top: Vec<RankedGenome>,
    pub pool: PoolStats,
}

impl Report {
    /// Build a report over `root`, gathering every view through `pool`.
    pub fn build(
        source: &Path,
        root: &Deme<Arc<Individual>>,
        pool: &ViewPool<Arc<Individual>>,
        replay: Option<&ReplayOutcome>,
        options: &ReportOptions,
        duration_seconds: f64,
    ) -> Self {
        let view = root.view(pool);
        let summary = view.summary().ok();
        let top = rank_genomes(view.members(), options.top_genomes);
        view.release();

        let mut deme_count = 0;
        let mut demes = Vec::new();
        root.walk(&mut |path: &Path, deme: &Deme<Arc<Individual>>| {
            deme_count += 1;
            if options.include_demes {
                let view = deme.view(pool);
                demes.push(DemeSummary {
                    path: path.to_string_lossy().replace('\\', "/"),
                    genomes: view.len(),
                    summary: view.summary().ok(),
                });
            }
        });

        let metadata = ReportMetadata {
            source: source.display().to_string(),
            generated_at: Utc::now(),
            genomes: root.leaf_count(),
            demes: deme_count,
            depth: root.depth(),
            generations: replay.map_or(0, |r| r.generations),
            workers: replay.map_or(0, |r| r.workers),
            duration_seconds,
        };

        Self {
            metadata,
            summary,
            demes,
            top,
            pool: pool.stats(),
        }
    }
}

/// The `n` fittest genomes, best first; ties keep traversal order.
///
/// NaN fitness ranks below every number.
pub fn rank_genomes(members: &[Arc<Individual>], n: usize) -> Vec<RankedGenome> {
    let mut indexed: Vec<(usize, &Arc<Individual>)> = members.iter().enumerate().collect();
    indexed.sort_by(|a, b| {
        let (fa, fb) = (a.1.fitness(), b.1.fitness());
        fa.is_nan()
            .cmp(&fb.is_nan())
            .then_with(|| fb.total_cmp(&fa))
    });

    indexed
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(rank, (index, genome))| RankedGenome {
            rank: rank + 1,
            id: genome.id.clone(),
            fitness: genome.fitness,
            index,
        })
        .collect()
}
