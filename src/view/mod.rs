//! Views: pooled, mergeable fitness statistics.
//!
//! A view is a snapshot of the genomes in a population. In a hybrid
//! population (one whose members are themselves populations) the view holds
//! the genomes of the sub-populations, not the sub-populations themselves.
//! Mean, variance and extremes are computed while the view is built, so every
//! statistics accessor runs in constant time.
//!
//! Views come from a [`ViewPool`] and go back to it on [`View::release`] (or
//! on drop), which keeps repeated per-generation statistics from churning the
//! allocator.

mod aggregator;
mod pool;

pub use pool::{PoolStats, ViewPool, DEFAULT_MAX_IDLE};

use crate::error::ViewError;
use crate::models::Genome;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Fitness statistics over a set of genomes.
pub struct View<G> {
    members: Vec<G>,
    // Indexes of the max/min genomes.
    max: usize,
    min: usize,
    mean: f64,
    // Sum of squared deviations from the mean.
    m2: f64,
    // members.len() as f64, kept to avoid conversions in the merge arithmetic.
    len: f64,
    pool: ViewPool<G>,
}

/// Serializable snapshot of a non-empty view's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_deviation: f64,
    pub max: f64,
    pub min: f64,
    pub range: f64,
    pub max_index: usize,
    pub min_index: usize,
}

impl<G> View<G> {
    pub(crate) fn from_buffer(mut members: Vec<G>, pool: ViewPool<G>) -> Self {
        members.clear();
        Self {
            members,
            max: 0,
            min: 0,
            mean: 0.0,
            m2: 0.0,
            len: 0.0,
            pool,
        }
    }

    /// Returns the view's storage to its pool.
    ///
    /// Dropping a view does the same; this just makes the hand-back explicit
    /// at call sites. The view is consumed, so it cannot be read afterwards.
    pub fn release(self) {
        trace!(len = self.members.len(), "releasing view");
    }

    /// The genomes in the view, in traversal order.
    pub fn members(&self) -> &[G] {
        &self.members
    }

    /// Average fitness; zero for an empty view.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of genomes in the view.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Capacity of the underlying member buffer.
    pub fn capacity(&self) -> usize {
        self.members.capacity()
    }

    /// Index of the best genome within [`members`](Self::members).
    pub fn max_index(&self) -> Result<usize, ViewError> {
        self.ensure_populated().map(|_| self.max)
    }

    /// Index of the worst genome within [`members`](Self::members).
    pub fn min_index(&self) -> Result<usize, ViewError> {
        self.ensure_populated().map(|_| self.min)
    }

    /// The genome with the best fitness. Ties go to the first one folded in.
    pub fn max(&self) -> Result<&G, ViewError> {
        self.members.get(self.max).ok_or(ViewError::Empty)
    }

    /// The genome with the worst fitness. Ties go to the first one folded in.
    pub fn min(&self) -> Result<&G, ViewError> {
        self.members.get(self.min).ok_or(ViewError::Empty)
    }

    /// Population variance of fitness.
    pub fn variance(&self) -> Result<f64, ViewError> {
        self.ensure_populated().map(|_| self.m2 / self.len)
    }

    /// Population standard deviation of fitness.
    pub fn std_deviation(&self) -> Result<f64, ViewError> {
        self.variance().map(f64::sqrt)
    }

    fn ensure_populated(&self) -> Result<(), ViewError> {
        if self.members.is_empty() {
            Err(ViewError::Empty)
        } else {
            Ok(())
        }
    }
}

impl<G: Genome> View<G> {
    /// Difference between the best and worst fitness.
    pub fn range(&self) -> Result<f64, ViewError> {
        Ok(self.max()?.fitness() - self.min()?.fitness())
    }

    /// Snapshot of every statistic at once.
    pub fn summary(&self) -> Result<Summary, ViewError> {
        let max = self.max()?.fitness();
        let min = self.min()?.fitness();
        let variance = self.variance()?;

        Ok(Summary {
            count: self.len(),
            mean: self.mean,
            variance,
            std_deviation: variance.sqrt(),
            max,
            min,
            range: max - min,
            max_index: self.max,
            min_index: self.min,
        })
    }
}

impl<G> Drop for View<G> {
    fn drop(&mut self) {
        let members = std::mem::take(&mut self.members);
        self.pool.return_buffer(members);
    }
}

impl<G: fmt::Debug> fmt::Debug for View<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("members", &self.members)
            .field("max", &self.max)
            .field("min", &self.min)
            .field("mean", &self.mean)
            .field("m2", &self.m2)
            .finish_non_exhaustive()
    }
}

impl<G: Genome> fmt::Display for View<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Ok(s) => write!(
                f,
                "Max: {:.6} | Min: {:.6} | SD: {:.6}",
                s.max, s.min, s.std_deviation
            ),
            Err(_) => write!(f, "empty view"),
        }
    }
}
