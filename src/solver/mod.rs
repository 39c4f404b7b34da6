//! Least-squares gap sizing
//!
//! Builds the normal equations from trusted mate constraints, solves them
//! with a banded Cholesky factorization, and enforces hard gap constraints
//! (no implausible overlaps) by iterative re-solving on a reduced free-gap
//! set.

mod banded;
mod recompute;

pub use banded::{BandedMatrix, FactorError};
pub use recompute::{recompute_offsets_in_scaffold, RecomputeResult};
