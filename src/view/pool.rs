//! Recycling store for view member buffers.
//!
//! Building a view once per generation would otherwise allocate a fresh
//! member vector every time. Released views hand their (cleared) buffer back
//! here, and the next acquisition picks the smallest idle buffer that is
//! already big enough.

use super::View;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Default number of idle buffers a pool keeps around.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Counters describing how a pool has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Views handed out.
    pub acquired: u64,
    /// Acquisitions served from an idle buffer.
    pub reused: u64,
    /// Acquisitions that needed a fresh buffer.
    pub allocated: u64,
    /// Views returned.
    pub released: u64,
    /// Returned buffers dropped because the pool was full.
    pub discarded: u64,
    /// Buffers currently idle.
    pub idle: usize,
}

impl PoolStats {
    /// Fraction of acquisitions served without allocating.
    pub fn reuse_ratio(&self) -> f64 {
        if self.acquired == 0 {
            0.0
        } else {
            self.reused as f64 / self.acquired as f64
        }
    }
}

struct PoolState<G> {
    // Idle buffers bucketed by capacity.
    idle: BTreeMap<usize, Vec<Vec<G>>>,
    max_idle: usize,
    stats: PoolStats,
}

/// Thread-safe pool of view buffers.
///
/// Cloning a `ViewPool` yields another handle to the same pool. Each view it
/// hands out is exclusively owned until it is released or dropped.
pub struct ViewPool<G> {
    state: Arc<Mutex<PoolState<G>>>,
}

impl<G> Clone for ViewPool<G> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<G> Default for ViewPool<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> fmt::Debug for ViewPool<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewPool")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<G> ViewPool<G> {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool that keeps at most `max_idle` released buffers.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState {
                idle: BTreeMap::new(),
                max_idle,
                stats: PoolStats::default(),
            })),
        }
    }

    /// Acquire an empty view.
    pub fn acquire(&self) -> View<G> {
        self.acquire_with_capacity(0)
    }

    /// Acquire an empty view whose buffer can hold at least `capacity` members.
    pub fn acquire_with_capacity(&self, capacity: usize) -> View<G> {
        View::from_buffer(self.take_buffer(capacity), self.clone())
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }

    /// Drops every idle buffer.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.idle.clear();
        state.stats.idle = 0;
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<G>> {
        // A panic while holding the lock cannot leave a half-inserted buffer.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_buffer(&self, capacity: usize) -> Vec<G> {
        let mut state = self.lock();
        state.stats.acquired += 1;

        let key = state
            .idle
            .range(capacity..)
            .next()
            .map(|(k, _)| *k)
            .or_else(|| state.idle.keys().next_back().copied());

        let Some(key) = key else {
            state.stats.allocated += 1;
            trace!(capacity, "allocating view buffer");
            return Vec::with_capacity(capacity);
        };

        let mut buffer = match state.idle.get_mut(&key) {
            Some(bucket) => bucket.pop().unwrap_or_default(),
            None => Vec::new(),
        };
        if state.idle.get(&key).is_some_and(Vec::is_empty) {
            state.idle.remove(&key);
        }
        state.stats.idle = state.stats.idle.saturating_sub(1);
        state.stats.reused += 1;
        drop(state);

        if buffer.capacity() < capacity {
            buffer.reserve(capacity);
        }
        trace!(capacity = buffer.capacity(), "reusing view buffer");
        buffer
    }

    pub(crate) fn return_buffer(&self, mut buffer: Vec<G>) {
        buffer.clear();
        let mut state = self.lock();
        state.stats.released += 1;

        // Nothing worth keeping in an unallocated buffer.
        if buffer.capacity() == 0 {
            return;
        }

        if state.stats.idle >= state.max_idle {
            state.stats.discarded += 1;
            debug!(
                capacity = buffer.capacity(),
                max_idle = state.max_idle,
                "view pool full, discarding buffer"
            );
            return;
        }

        state
            .idle
            .entry(buffer.capacity())
            .or_default()
            .push(buffer);
        state.stats.idle += 1;
    }
}
