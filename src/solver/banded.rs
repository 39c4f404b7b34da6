//! Banded symmetric positive-definite linear algebra
//!
//! The gap normal equations are symmetric with bandwidth equal to the
//! longest clone span, so factorization and solves run in O(n·band²) and
//! O(n·band) instead of O(n³)/O(n²). Storage holds the lower band only:
//! `band[i][d]` is A(i, i-d).
//!
//! All accumulation loops run in ascending index order so repeated solves
//! of the same system are bit-identical.

use thiserror::Error;

/// Factorization failure: the matrix is not positive definite, which for
/// gap systems means the scaffold's clone graph is disconnected or
/// degenerate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactorError {
    /// A pivot came out non-positive at the given row.
    #[error("matrix not positive definite at row {row}")]
    NotPositiveDefinite {
        /// Row index of the failing pivot.
        row: usize,
    },
}

/// Symmetric banded matrix in lower-band storage.
#[derive(Debug, Clone)]
pub struct BandedMatrix {
    n: usize,
    bandwidth: usize,
    /// Row-major: `band[i * (bandwidth + 1) + d]` = A(i, i-d), d ≤ bandwidth.
    band: Vec<f64>,
}

impl BandedMatrix {
    /// Zero matrix of dimension `n` with the given bandwidth.
    pub fn zeros(n: usize, bandwidth: usize) -> Self {
        let bandwidth = bandwidth.min(n.saturating_sub(1));
        Self {
            n,
            bandwidth,
            band: vec![0.0; n * (bandwidth + 1)],
        }
    }

    /// Dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Stored bandwidth.
    pub fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    fn idx(&self, row: usize, diag: usize) -> usize {
        debug_assert!(diag <= self.bandwidth);
        row * (self.bandwidth + 1) + diag
    }

    /// Entry A(row, col) for |row-col| ≤ bandwidth; zero outside the band.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (hi, lo) = if row >= col { (row, col) } else { (col, row) };
        let diag = hi - lo;
        if diag > self.bandwidth {
            return 0.0;
        }
        self.band[self.idx(hi, diag)]
    }

    /// Add `value` to A(row, col) and, off the diagonal, to A(col, row).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let (hi, lo) = if row >= col { (row, col) } else { (col, row) };
        let diag = hi - lo;
        debug_assert!(
            diag <= self.bandwidth,
            "accumulation outside declared bandwidth"
        );
        let i = self.idx(hi, diag);
        self.band[i] += value;
    }

    /// Cholesky factorization A = L·Lᵀ computed in place (the band then
    /// holds L). Fails on a non-positive pivot.
    pub fn cholesky_in_place(&mut self) -> Result<(), FactorError> {
        let band = self.bandwidth;
        for j in 0..self.n {
            // Diagonal pivot: A(j,j) - Σ L(j,k)².
            let mut pivot = self.band[self.idx(j, 0)];
            let k_lo = j.saturating_sub(band);
            for k in k_lo..j {
                let l_jk = self.band[self.idx(j, j - k)];
                pivot -= l_jk * l_jk;
            }
            if pivot <= 0.0 || !pivot.is_finite() {
                return Err(FactorError::NotPositiveDefinite { row: j });
            }
            let l_jj = pivot.sqrt();
            let diag = self.idx(j, 0);
            self.band[diag] = l_jj;

            // Column below the pivot.
            let i_hi = (j + band).min(self.n - 1);
            for i in (j + 1)..=i_hi {
                let mut sum = self.band[self.idx(i, i - j)];
                let k_lo = i.saturating_sub(band).max(j.saturating_sub(band));
                for k in k_lo..j {
                    if i - k <= band {
                        sum -= self.band[self.idx(i, i - k)] * self.band[self.idx(j, j - k)];
                    }
                }
                let below = self.idx(i, i - j);
                self.band[below] = sum / l_jj;
            }
        }
        Ok(())
    }

    /// Solve L·Lᵀ·x = b given a factored band.
    pub fn solve_factored(&self, b: &[f64]) -> Vec<f64> {
        debug_assert_eq!(b.len(), self.n);
        let band = self.bandwidth;
        // Forward: L·y = b.
        let mut y = vec![0.0; self.n];
        for i in 0..self.n {
            let mut sum = b[i];
            let k_lo = i.saturating_sub(band);
            for k in k_lo..i {
                sum -= self.band[self.idx(i, i - k)] * y[k];
            }
            y[i] = sum / self.band[self.idx(i, 0)];
        }
        // Backward: Lᵀ·x = y.
        let mut x = vec![0.0; self.n];
        for i in (0..self.n).rev() {
            let mut sum = y[i];
            let k_hi = (i + band).min(self.n - 1);
            for k in (i + 1)..=k_hi {
                sum -= self.band[self.idx(k, k - i)] * x[k];
            }
            x[i] = sum / self.band[self.idx(i, 0)];
        }
        x
    }

    /// Diagonal entry (k,k) of A⁻¹ from a factored band, by solving against
    /// the k-th unit vector. Used for per-gap variances.
    pub fn inverse_diagonal(&self, k: usize) -> f64 {
        let mut unit = vec![0.0; self.n];
        unit[k] = 1.0;
        self.solve_factored(&unit)[k]
    }
}
