//! Query parameters.

use std::time::{Duration, Instant};

use crate::error::{JoinError, Result};

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// How leaf results are combined into the final answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombineMode {
    /// Every leaf writes into one shared result set, then all leaving
    /// cross-edges are expanded against it.
    #[default]
    Flat,
    /// Each internal node waits for both children, merges their private
    /// results and expands the cross-edges created by its own split.
    Hierarchical,
}

/// Parameters for a closest-pairs query.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinParams {
    /// Number of pairs to return.
    pub k: usize,

    /// Only pairs strictly closer than this are reported.
    pub threshold: f32,

    /// Worker threads; 0 uses the available parallelism.
    pub parallelism: usize,

    pub mode: CombineMode,

    /// Wall-clock budget. An expired query returns what it found so far,
    /// flagged as incomplete.
    pub deadline: Option<Duration>,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            k: 10,
            threshold: f32::INFINITY,
            parallelism: default_thread_count(),
            mode: CombineMode::Flat,
            deadline: None,
        }
    }
}

impl JoinParams {
    pub fn new(k: usize, threshold: f32, parallelism: usize) -> Self {
        Self {
            k,
            threshold,
            parallelism,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: CombineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(JoinError::invalid("k must be at least 1"));
        }
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(JoinError::invalid(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        if self.parallelism == 0 {
            default_thread_count()
        } else {
            self.parallelism
        }
    }
}

/// Point in time after which a query stops scheduling work.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn after(budget: Option<Duration>) -> Self {
        Self(budget.map(|d| Instant::now() + d))
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}
