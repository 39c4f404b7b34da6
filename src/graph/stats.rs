//! Gaussian (mean, variance) estimates
//!
//! Every physical quantity in the scaffold graph — contig lengths, end
//! offsets, edge distances — is carried as a mean/variance pair. Negative
//! means are meaningful (an overlap); negative variances are not, and are
//! clamped at the boundary where they appear.

use tracing::warn;

/// Mean/variance estimate of a physical length or distance in base pairs.
///
/// A negative `mean` encodes an overlap; `variance` must be non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct LengthStat {
    /// Mean length/distance in base pairs.
    pub mean: f64,
    /// Variance of the estimate (bp²).
    pub variance: f64,
}

impl LengthStat {
    /// Construct from mean and variance.
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    /// Zero-length, zero-uncertainty estimate (scaffold anchor point).
    pub fn zero() -> Self {
        Self {
            mean: 0.0,
            variance: 0.0,
        }
    }

    /// Standard deviation.
    pub fn stddev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }

    /// Translate the mean, leaving uncertainty unchanged.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            mean: self.mean + delta,
            variance: self.variance,
        }
    }

    /// Sum of two independent estimates.
    pub fn plus(&self, other: &LengthStat) -> Self {
        Self {
            mean: self.mean + other.mean,
            variance: self.variance + other.variance,
        }
    }

    /// Replace a non-positive variance with `floor`, logging the repair.
    ///
    /// Negative variances indicate corrupt upstream data; they must never
    /// reach the linear system.
    pub fn clamped(&self, floor: f64, context: &str) -> Self {
        if self.variance > 0.0 && self.variance.is_finite() {
            return *self;
        }
        warn!(
            mean = self.mean,
            variance = self.variance,
            context,
            "non-positive variance clamped"
        );
        Self {
            mean: self.mean,
            variance: floor,
        }
    }

    /// Inverse-variance weighted combination of two estimates.
    ///
    /// Standard fixed-effects merge: the result's mean lies between the two
    /// inputs and its variance is at most the smaller input variance.
    pub fn combine(&self, other: &LengthStat) -> Self {
        let wa = 1.0 / self.variance.max(MIN_COMBINE_VARIANCE);
        let wb = 1.0 / other.variance.max(MIN_COMBINE_VARIANCE);
        Self {
            mean: (self.mean * wa + other.mean * wb) / (wa + wb),
            variance: 1.0 / (wa + wb),
        }
    }

    /// Chi-squared compatibility statistic against another estimate:
    /// `(m1 - m2)² / (v1 + v2)`. Symmetric in its arguments.
    pub fn chi_squared(&self, other: &LengthStat) -> f64 {
        let diff = self.mean - other.mean;
        let var = self.variance + other.variance;
        if var <= 0.0 {
            return f64::INFINITY;
        }
        (diff * diff) / var
    }
}

/// Variance floor used when combining estimates, so a (defective)
/// zero-variance observation cannot dominate a merge with infinite weight.
pub const MIN_COMBINE_VARIANCE: f64 = 1.0;
