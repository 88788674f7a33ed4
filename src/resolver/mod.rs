//! Front-address resolver module.
//!
//! Picks a substitute ("reverse-proxy") address from the configured pool for
//! every node that gets serialized. Selection is random and uncached by
//! default; the [`PoolSelector`] seam lets callers inject a deterministic
//! source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use parking_lot::Mutex;

use crate::types::Node;

pub mod pool;

pub use pool::{import_pool, merge_pool, PoolEntry, UNKNOWN_REGION};

/// Source of pool indices.
pub trait PoolSelector: Send + Sync {
    /// Pick an index in `0..len`. Never called with `len == 0`.
    fn select(&self, len: usize) -> usize;
}

/// Uniformly random selection using the thread-local RNG.
pub struct RandomSelector;

impl RandomSelector {
    /// Create a new random selector.
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolSelector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Always picks the same index (wrapped to the pool length).
pub struct FixedSelector {
    index: usize,
}

impl FixedSelector {
    /// Create a selector that always returns `index % len`.
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Default for FixedSelector {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PoolSelector for FixedSelector {
    fn select(&self, len: usize) -> usize {
        self.index % len
    }
}

/// Reproducible random selection from a seeded RNG.
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    /// Create a selector seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PoolSelector for SeededSelector {
    fn select(&self, len: usize) -> usize {
        self.rng.lock().random_range(0..len)
    }
}

/// Extract the host token from a pool entry.
///
/// Accepts `IP:PORT#REGION`, `IP#REGION`, `IP:PORT` and bare `IP`; port and
/// region are discarded. The host is not validated.
pub fn extract_host(entry: &str) -> &str {
    let head = match entry.split_once('#') {
        Some((left, _)) => left,
        None => entry,
    };
    let host = match head.split_once(':') {
        Some((host, _)) => host,
        None => head,
    };
    host.trim()
}

/// Pick a front address from the pool, or `None` when the pool is empty.
pub fn resolve(pool: &[String], selector: &dyn PoolSelector) -> Option<String> {
    if pool.is_empty() {
        return None;
    }
    let index = selector.select(pool.len()) % pool.len();
    Some(extract_host(&pool[index]).to_string())
}

/// Per-generation resolver binding a pool to a selector.
pub struct FrontResolver<'a> {
    pool: &'a [String],
    selector: &'a dyn PoolSelector,
}

impl<'a> FrontResolver<'a> {
    /// Create a resolver over `pool`.
    pub fn new(pool: &'a [String], selector: &'a dyn PoolSelector) -> Self {
        Self { pool, selector }
    }

    /// Address to embed for `node`: a fresh pool pick, or the node's own
    /// server when the pool is empty.
    pub fn server_for(&self, node: &Node) -> String {
        resolve(self.pool, self.selector).unwrap_or_else(|| node.server.clone())
    }
}
