//! The "INFERENCE" Engine - Exact Conditional Gaussian Updates
//!
//! Holds the prior of N jointly Gaussian variables and answers evidence
//! queries with the exact conditional distribution (Schur complement).
//!
//! Every query is applied to the stored **prior**. A second call to
//! [`GaussianConditioner::update_mean_cov`] replaces the first result, it is
//! never chained onto it.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::error::InferenceError;

/// Absolute tolerance for the covariance symmetry check at construction.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Smallest squared Cholesky pivot of the evidence block, relative to the
/// variance of the same variable, accepted as non-singular.
pub const SINGULARITY_TOLERANCE: f64 = 1e-10;

/// Which distribution the conditioner currently exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConditionerState {
    PriorActive,
    ConditionedActive,
}

/// Exact conditional-Gaussian updater over a fixed prior.
#[derive(Debug, Clone, Serialize)]
pub struct GaussianConditioner {
    prior_mean: DVector<f64>,
    prior_covariance: DMatrix<f64>,

    /// Nominal number of observations behind the prior; default sample count
    sample_size: usize,

    current_mean: DVector<f64>,
    current_covariance: DMatrix<f64>,

    /// `(index, value)` pairs of the active query, empty while the prior is active
    evidence: Vec<(usize, f64)>,
}

impl GaussianConditioner {
    /// Create a conditioner from a prior mean, covariance and sample size.
    ///
    /// # Errors
    /// `InvalidDistribution` if the shapes disagree, the covariance is not
    /// symmetric within [`SYMMETRY_TOLERANCE`], an entry is not finite, or
    /// `sample_size` is zero. Positive-semi-definiteness is not checked.
    pub fn new(
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        sample_size: usize,
    ) -> Result<Self, InferenceError> {
        let n = mean.len();
        if n == 0 {
            return Err(InferenceError::distribution("distribution has no variables"));
        }
        if covariance.nrows() != covariance.ncols() {
            return Err(InferenceError::distribution(format!(
                "covariance must be square, got {}x{}",
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        if covariance.nrows() != n {
            return Err(InferenceError::distribution(format!(
                "mean has {} entries but covariance is {}x{}",
                n,
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        if sample_size == 0 {
            return Err(InferenceError::distribution("sample size must be at least 1"));
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(InferenceError::distribution("non-finite mean or covariance entry"));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let gap = (covariance[(i, j)] - covariance[(j, i)]).abs();
                if gap > SYMMETRY_TOLERANCE {
                    return Err(InferenceError::distribution(format!(
                        "covariance is not symmetric at ({}, {}): difference {:e}",
                        i, j, gap
                    )));
                }
            }
        }

        Ok(Self {
            current_mean: mean.clone(),
            current_covariance: covariance.clone(),
            prior_mean: mean,
            prior_covariance: covariance,
            sample_size,
            evidence: Vec::new(),
        })
    }

    /// Create a conditioner from plain slices (row-major covariance rows).
    pub fn from_rows(
        mean: &[f64],
        covariance: &[Vec<f64>],
        sample_size: usize,
    ) -> Result<Self, InferenceError> {
        let rows = covariance.len();
        if let Some(bad) = covariance.iter().position(|row| row.len() != rows) {
            return Err(InferenceError::distribution(format!(
                "covariance row {} has {} entries, expected {}",
                bad,
                covariance[bad].len(),
                rows
            )));
        }
        Self::new(
            DVector::from_column_slice(mean),
            DMatrix::from_fn(rows, rows, |i, j| covariance[i][j]),
            sample_size,
        )
    }

    /// Condition on `values` observed at `indices`.
    ///
    /// The previous conditional result (if any) is discarded and the query
    /// is answered from the prior:
    ///
    /// ```text
    /// μ_H|E = μ_H + Σ_HE Σ_EE⁻¹ (v − μ_E)
    /// Σ_H|E = Σ_HH − Σ_HE Σ_EE⁻¹ Σ_EH
    /// ```
    ///
    /// Evidence variables stay in the result as point masses (mean = value,
    /// zero covariance row and column), so shapes remain N and N×N.
    ///
    /// An empty `values` or `indices` is a no-op; it does not reset.
    ///
    /// # Errors
    /// - `InvalidEvidence` for mismatched lengths, out-of-range or duplicate
    ///   indices, or non-finite values.
    /// - `SingularCovariance` if `Σ_EE` cannot be inverted.
    ///
    /// State is untouched on error.
    pub fn update_mean_cov(
        &mut self,
        values: &[f64],
        indices: &[usize],
    ) -> Result<(), InferenceError> {
        if values.is_empty() || indices.is_empty() {
            return Ok(());
        }
        self.check_evidence(values, indices)?;

        let n = self.dimension();
        let mut is_evidence = vec![false; n];
        for &i in indices {
            is_evidence[i] = true;
        }
        let hidden: Vec<usize> = (0..n).filter(|&i| !is_evidence[i]).collect();
        let (k, h) = (indices.len(), hidden.len());

        let prior_mean = &self.prior_mean;
        let prior_cov = &self.prior_covariance;
        let sigma_ee = DMatrix::from_fn(k, k, |r, c| prior_cov[(indices[r], indices[c])]);
        let sigma_eh = DMatrix::from_fn(k, h, |r, c| prior_cov[(indices[r], hidden[c])]);
        let sigma_hh = DMatrix::from_fn(h, h, |r, c| prior_cov[(hidden[r], hidden[c])]);
        let residual = DVector::from_fn(k, |r, _| values[r] - prior_mean[indices[r]]);

        let chol = factor_evidence_block(sigma_ee, indices)?;

        // Σ_EE⁻¹ (v − μ_E) and Σ_EE⁻¹ Σ_EH via triangular solves
        let weights = chol.solve(&residual);
        let gain = chol.solve(&sigma_eh);

        let mean_h = DVector::from_fn(h, |r, _| prior_mean[hidden[r]]) + sigma_eh.tr_mul(&weights);
        let mut cov_h = sigma_hh - sigma_eh.tr_mul(&gain);
        symmetrize(&mut cov_h);
        for r in 0..h {
            // Round-off can push fully explained variances just below zero
            if cov_h[(r, r)] < 0.0 {
                cov_h[(r, r)] = 0.0;
            }
        }

        let mut mean = DVector::zeros(n);
        let mut cov = DMatrix::zeros(n, n);
        for (r, &i) in hidden.iter().enumerate() {
            mean[i] = mean_h[r];
            for (c, &j) in hidden.iter().enumerate() {
                cov[(i, j)] = cov_h[(r, c)];
            }
        }
        for (&i, &v) in indices.iter().zip(values) {
            mean[i] = v;
        }

        self.current_mean = mean;
        self.current_covariance = cov;
        self.evidence = indices.iter().copied().zip(values.iter().copied()).collect();
        Ok(())
    }

    fn check_evidence(&self, values: &[f64], indices: &[usize]) -> Result<(), InferenceError> {
        if values.len() != indices.len() {
            return Err(InferenceError::evidence(format!(
                "{} values for {} indices",
                values.len(),
                indices.len()
            )));
        }
        let n = self.dimension();
        let mut seen = vec![false; n];
        for &i in indices {
            if i >= n {
                return Err(InferenceError::evidence(format!(
                    "index {} out of range for {} variables",
                    i, n
                )));
            }
            if seen[i] {
                return Err(InferenceError::evidence(format!("index {} given twice", i)));
            }
            seen[i] = true;
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::evidence(format!(
                "value for index {} is not finite",
                indices[pos]
            )));
        }
        Ok(())
    }

    /// Restore the prior. Evidence is forgotten.
    pub fn clear(&mut self) {
        self.current_mean = self.prior_mean.clone();
        self.current_covariance = self.prior_covariance.clone();
        self.evidence.clear();
    }

    /// Current mean and covariance (owned copies).
    pub fn params(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.current_mean.clone(), self.current_covariance.clone())
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.current_mean
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.current_covariance
    }

    pub fn prior_mean(&self) -> &DVector<f64> {
        &self.prior_mean
    }

    pub fn prior_covariance(&self) -> &DMatrix<f64> {
        &self.prior_covariance
    }

    pub fn dimension(&self) -> usize {
        self.prior_mean.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Evidence of the active query as `(index, value)` pairs.
    pub fn evidence(&self) -> &[(usize, f64)] {
        &self.evidence
    }

    pub fn state(&self) -> ConditionerState {
        if self.evidence.is_empty() {
            ConditionerState::PriorActive
        } else {
            ConditionerState::ConditionedActive
        }
    }

    /// Correlation matrix of the current distribution.
    ///
    /// A variable with zero variance (an evidence variable) gets 1 on its
    /// diagonal and 0 everywhere else in its row and column. Off-diagonal
    /// entries are clamped to [-1, 1].
    pub fn correlation(&self) -> DMatrix<f64> {
        let cov = &self.current_covariance;
        let n = self.dimension();
        let std_dev: Vec<Option<f64>> = (0..n)
            .map(|i| {
                let var = cov[(i, i)];
                (var > 0.0).then(|| var.sqrt())
            })
            .collect();

        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                return 1.0;
            }
            match (std_dev[i], std_dev[j]) {
                (Some(si), Some(sj)) => (cov[(i, j)] / (si * sj)).clamp(-1.0, 1.0),
                _ => 0.0,
            }
        })
    }

    /// Draw `count` samples (rows) from the current distribution.
    ///
    /// The covariance only needs to be positive-semi-definite: the factor
    /// comes from a symmetric eigendecomposition with negative eigenvalues
    /// clamped to zero, and zero-variance variables are emitted as their
    /// mean exactly.
    pub fn samples<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> DMatrix<f64> {
        let n = self.dimension();
        let cov = &self.current_covariance;
        let mut out = DMatrix::from_fn(count, n, |_, j| self.current_mean[j]);

        let active: Vec<usize> = (0..n).filter(|&i| cov[(i, i)] > 0.0).collect();
        let m = active.len();
        if m == 0 || count == 0 {
            return out;
        }

        let block = DMatrix::from_fn(m, m, |r, c| cov[(active[r], active[c])]);
        let factor = psd_factor(block);
        let z = DMatrix::from_fn(m, count, |_, _| rng.sample::<f64, _>(StandardNormal));
        let draws = factor * z;

        for s in 0..count {
            for (r, &j) in active.iter().enumerate() {
                out[(s, j)] += draws[(r, s)];
            }
        }
        out
    }

    /// [`samples`](Self::samples) with `count = sample_size`.
    pub fn default_samples<R: Rng + ?Sized>(&self, rng: &mut R) -> DMatrix<f64> {
        self.samples(self.sample_size, rng)
    }
}

/// Cholesky of Σ_EE, rejecting numerically singular blocks.
///
/// Each squared pivot is the variance of that evidence variable left after
/// the earlier ones are known; it is compared with the variable's own
/// variance so the test does not depend on how the variables are scaled.
fn factor_evidence_block(
    block: DMatrix<f64>,
    indices: &[usize],
) -> Result<Cholesky<f64, Dyn>, InferenceError> {
    let singular = |min_pivot: f64| InferenceError::SingularCovariance {
        indices: indices.to_vec(),
        min_pivot,
    };

    let variances: Vec<f64> = block.diagonal().iter().copied().collect();
    if variances.iter().any(|&v| v <= 0.0) {
        return Err(singular(0.0));
    }

    let chol = block.cholesky().ok_or_else(|| singular(0.0))?;
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .zip(&variances)
        .map(|(d, v)| d * d / v)
        .fold(f64::INFINITY, f64::min);
    if min_pivot <= SINGULARITY_TOLERANCE {
        return Err(singular(min_pivot));
    }
    Ok(chol)
}

/// A with A·Aᵀ = `cov` for a positive-semi-definite `cov`.
fn psd_factor(cov: DMatrix<f64>) -> DMatrix<f64> {
    let eigen = cov.symmetric_eigen();
    let largest = eigen.eigenvalues.iter().fold(0.0_f64, |acc, &l| acc.max(l));
    let floor = largest * f64::EPSILON * eigen.eigenvalues.len() as f64;
    let scales = eigen
        .eigenvalues
        .map(|l| if l > floor { l.sqrt() } else { 0.0 });
    eigen.eigenvectors * DMatrix::from_diagonal(&scales)
}

fn symmetrize(m: &mut DMatrix<f64>) {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = avg;
            m[(j, i)] = avg;
        }
    }
}
