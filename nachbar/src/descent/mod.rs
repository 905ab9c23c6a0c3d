pub mod index;

use crate::error::Error;

/// Neighbours reported per item when none is configured explicitly.
pub const DEFAULT_K: usize = 10;

/// Convergence threshold on the per-epoch improvement ratio.
pub const DEFAULT_DELTA: f64 = 0.05;

/// Tuning knobs for graph compilation.
///
/// `k` is the number of neighbours each compiled row retains; `delta` is the
/// improvement ratio below which refinement is considered converged. During
/// compilation every working heap holds `2 * k` candidates, twice the
/// reported count, so a good neighbour found early survives the churn of
/// random sampling until refinement can propagate it; the surplus half is
/// discarded at materialisation. The working capacity is always derived
/// from `k` and is not configurable on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescentConfig {
    /// Neighbours retained per item.
    pub k: usize,

    /// Convergence threshold in `(0, 1]`.
    pub delta: f64,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            delta: DEFAULT_DELTA,
        }
    }
}

impl DescentConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// `InvalidK` when `k` is zero, `InvalidDelta` when `delta` lies outside
    /// `(0, 1]`.
    pub fn new(k: usize, delta: f64) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        if !(delta > 0.0 && delta <= 1.0) {
            return Err(Error::InvalidDelta(delta));
        }
        Ok(Self { k, delta })
    }

    /// Candidates each working heap tracks during refinement.
    pub fn working_capacity(&self) -> usize {
        2 * self.k
    }
}
