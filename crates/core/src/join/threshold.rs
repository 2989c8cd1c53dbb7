//! Shared pruning threshold.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Current K-th best distance across all workers of one query.
///
/// Stored as the bit pattern of a non-negative `f32`, whose integer order
/// matches the float order, so tightening is a single `fetch_min`. The value
/// never increases.
#[derive(Debug)]
pub struct GlobalThreshold {
    bits: AtomicU32,
    tightenings: AtomicUsize,
}

impl Default for GlobalThreshold {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalThreshold {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(f32::INFINITY.to_bits()),
            tightenings: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Lower the threshold to `value` if that is an improvement.
    /// Returns true when the stored value changed.
    pub fn tighten(&self, value: f32) -> bool {
        if value.is_nan() || value < 0.0 {
            return false;
        }
        // -0.0 has the sign bit set
        let bits = if value == 0.0 { 0 } else { value.to_bits() };
        let prev = self.bits.fetch_min(bits, Ordering::AcqRel);
        let changed = bits < prev;
        if changed {
            self.tightenings.fetch_add(1, Ordering::Relaxed);
        }
        changed
    }

    /// Number of successful tightenings so far.
    pub fn tightenings(&self) -> usize {
        self.tightenings.load(Ordering::Relaxed)
    }
}

/// Combined pruning rule for one search step.
///
/// The caller's threshold is strict: distances equal to it are rejected.
/// The K-th best bound is inclusive, so ties with the current worst pair are
/// still examined and resolved by the result ordering.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cutoff {
    limit: f32,
    kth: f32,
}

impl Cutoff {
    pub const fn new(limit: f32, kth: f32) -> Self {
        Self { limit, kth }
    }

    #[inline]
    pub fn excludes(&self, dist: f32) -> bool {
        dist >= self.limit || dist > self.kth
    }
}
