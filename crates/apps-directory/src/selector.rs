//! Execution server selection.

use rand::seq::IndexedRandom;

/// Picks the host an application session runs on.
pub trait ServerSelector: Send + Sync {
    /// One member of `pool`, or `None` if the pool is empty.
    fn select<'a>(&self, pool: &'a [String]) -> Option<&'a str>;
}

/// Uniform random choice over the pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl ServerSelector for RandomSelector {
    fn select<'a>(&self, pool: &'a [String]) -> Option<&'a str> {
        pool.choose(&mut rand::rng()).map(String::as_str)
    }
}
