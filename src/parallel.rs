//! Dispatch of independent spectral points over a worker pool.
//!
//! Every energy or k-point is an independent unit of work: solvers allocate
//! their own iteration state and never touch shared mutable data, so the
//! outer loop parallelizes with a plain map. The [`Scheduler`] is the seam a
//! caller configures; `Sequential` is the fallback when no pool is wanted.

use rayon::prelude::*;

/// How to map a function over independent work items
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduler {
    /// Plain sequential iteration
    Sequential,
    /// The global rayon thread pool
    Rayon,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::Sequential
    }
}

impl Scheduler {
    /// Applies `f` to every item, preserving input order
    pub fn map<I, O, F>(&self, items: &[I], f: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Send + Sync,
    {
        match self {
            Self::Sequential => items.iter().map(f).collect(),
            Self::Rayon => items.par_iter().map(f).collect(),
        }
    }
}
