//! Per-generation statistics replay.
//!
//! An evolutionary loop gathers statistics once per generation, often from
//! several threads at once. [`replay`] reproduces that load: every
//! generation, `workers` blocking tasks each build and release a view of the
//! same population through one shared pool.

use crate::error::ReplayError;
use crate::models::{Genome, Population};
use crate::view::{PoolStats, Summary, ViewPool};
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info};

/// Options for a replay run.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub generations: usize,
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            generations: 1,
            workers: 1,
            show_progress: false,
        }
    }
}

/// Result of a replay run.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// Statistics of the final generation; `None` for an empty population.
    pub summary: Option<Summary>,
    pub generations: usize,
    pub workers: usize,
    /// Views built by workers across all generations.
    pub views_built: usize,
    pub pool: PoolStats,
}

/// Gather statistics over `population` for every generation.
///
/// Workers of one generation fold the same input in the same order, so they
/// must agree exactly; any disagreement is reported as
/// [`ReplayError::Diverged`].
pub async fn replay<P, G>(
    population: Arc<P>,
    pool: ViewPool<G>,
    options: &ReplayOptions,
) -> Result<ReplayOutcome, ReplayError>
where
    P: Population<G> + Send + Sync + 'static,
    G: Genome + Send + 'static,
{
    let workers = options.workers.max(1);
    let progress = options
        .show_progress
        .then(|| progress_bar(options.generations as u64));

    info!(
        "Replaying {} generations with {} workers",
        options.generations, workers
    );

    let mut summary = None;
    let mut views_built = 0;

    for generation in 0..options.generations {
        let tasks = (0..workers).map(|_| {
            let population = Arc::clone(&population);
            let pool = pool.clone();
            tokio::task::spawn_blocking(move || {
                let view = population.view(&pool);
                let summary = view.summary().ok();
                view.release();
                summary
            })
        });

        let results = try_join_all(tasks).await?;
        views_built += results.len();
        summary = agree(generation, results)?;

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
        debug!("Generation {} done: {:?}", generation, pool.stats());
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(ReplayOutcome {
        summary,
        generations: options.generations,
        workers,
        views_built,
        pool: pool.stats(),
    })
}

/// Check that every worker of a generation produced the same statistics.
fn agree(generation: usize, results: Vec<Option<Summary>>) -> Result<Option<Summary>, ReplayError> {
    let mut results = results.into_iter();
    let first = results.next().flatten();

    for other in results {
        let difference = match (&first, &other) {
            (Some(a), Some(b)) => first_difference(a, b),
            (Some(a), None) => Some(("count", a.count.to_string(), "empty".to_string())),
            (None, Some(b)) => Some(("count", "empty".to_string(), b.count.to_string())),
            (None, None) => None,
        };

        if let Some((field, left, right)) = difference {
            return Err(ReplayError::Diverged {
                generation,
                field,
                left,
                right,
            });
        }
    }

    Ok(first)
}

/// First field in which two summaries differ. Floats compare bit for bit,
/// so identical NaN statistics still agree.
fn first_difference(a: &Summary, b: &Summary) -> Option<(&'static str, String, String)> {
    let counts = [
        ("count", a.count, b.count),
        ("max_index", a.max_index, b.max_index),
        ("min_index", a.min_index, b.min_index),
    ];
    if let Some((field, l, r)) = counts.into_iter().find(|(_, l, r)| l != r) {
        return Some((field, l.to_string(), r.to_string()));
    }

    let floats = [
        ("mean", a.mean, b.mean),
        ("variance", a.variance, b.variance),
        ("std_deviation", a.std_deviation, b.std_deviation),
        ("max", a.max, b.max),
        ("min", a.min, b.min),
        ("range", a.range, b.range),
    ];
    floats
        .into_iter()
        .find(|(_, l, r)| l.to_bits() != r.to_bits())
        .map(|(field, l, r)| (field, l.to_string(), r.to_string()))
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Deme;

    fn world() -> Arc<Deme<f64>> {
        let mut root = Deme::new("world");
        root.push_deme(Deme::from_genomes("a", [1.0, 2.0, 3.0]));
        root.push_deme(Deme::from_genomes("b", [4.0, 5.0]));
        Arc::new(root)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replay_reuses_pool_across_generations() {
        let pool = ViewPool::new();
        let options = ReplayOptions {
            generations: 10,
            workers: 4,
            show_progress: false,
        };

        let outcome = replay(world(), pool.clone(), &options).await.unwrap();
        let summary = outcome.summary.unwrap();

        assert_eq!(outcome.views_built, 40);
        assert_eq!(summary.count, 5);
        assert!((summary.mean - 3.0).abs() < 1e-12);
        assert!((summary.variance - 2.0).abs() < 1e-12);

        // Each worker view acquires three buffers: root plus two demes.
        assert_eq!(outcome.pool.acquired, 120);
        assert_eq!(outcome.pool.released, 120);
        assert!(outcome.pool.reused > 0);
    }

    #[test]
    fn test_replay_with_tokio_test_runtime() {
        let pool: ViewPool<f64> = ViewPool::new();
        let outcome = tokio_test::block_on(replay(world(), pool, &ReplayOptions::default())).unwrap();
        assert_eq!(outcome.generations, 1);
        assert_eq!(outcome.workers, 1);
        assert_eq!(outcome.views_built, 1);
    }

    #[test]
    fn test_replay_zero_generations() {
        let options = ReplayOptions {
            generations: 0,
            ..ReplayOptions::default()
        };
        let outcome =
            tokio_test::block_on(replay(world(), ViewPool::new(), &options)).unwrap();
        assert!(outcome.summary.is_none());
        assert_eq!(outcome.views_built, 0);
    }

    #[test]
    fn test_replay_empty_population() {
        let empty: Arc<Deme<f64>> = Arc::new(Deme::new("empty"));
        let outcome =
            tokio_test::block_on(replay(empty, ViewPool::new(), &ReplayOptions::default())).unwrap();
        assert!(outcome.summary.is_none());
    }

    #[test]
    fn test_agree_detects_divergence() {
        let base = Summary {
            count: 1,
            mean: 1.0,
            variance: 0.0,
            std_deviation: 0.0,
            max: 1.0,
            min: 1.0,
            range: 0.0,
            max_index: 0,
            min_index: 0,
        };
        let other = Summary { mean: 2.0, ..base };

        assert!(agree(0, vec![Some(base), Some(base)]).is_ok());
        assert!(matches!(
            agree(3, vec![Some(base), Some(other)]),
            Err(ReplayError::Diverged { generation: 3, field: "mean", .. })
        ));
        assert!(agree(0, vec![Some(base), None]).is_err());
        assert_eq!(agree(0, vec![None, None]).unwrap(), None);

        // Same mean, different spread.
        let wider = Summary { variance: 4.0, std_deviation: 2.0, ..base };
        match agree(1, vec![Some(base), Some(base), Some(wider)]) {
            Err(ReplayError::Diverged { field, left, right, .. }) => {
                assert_eq!(field, "variance");
                assert_eq!(left, "0");
                assert_eq!(right, "4");
            }
            other => panic!("expected divergence, got {:?}", other),
        }

        let shifted = Summary { max_index: 1, ..base };
        assert!(matches!(
            agree(0, vec![Some(base), Some(shifted)]),
            Err(ReplayError::Diverged { field: "max_index", .. })
        ));
    }

    #[test]
    fn test_agree_accepts_matching_nan_statistics() {
        let nan = Summary {
            count: 2,
            mean: f64::NAN,
            variance: f64::NAN,
            std_deviation: f64::NAN,
            max: 1.0,
            min: 1.0,
            range: 0.0,
            max_index: 0,
            min_index: 0,
        };
        let agreed = agree(0, vec![Some(nan), Some(nan)]).unwrap().unwrap();
        assert!(agreed.mean.is_nan());
    }
}
