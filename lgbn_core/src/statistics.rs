//! Sample statistics over data matrices (rows = observations, columns = variables).
//!
//! Used to estimate the prior (mean, covariance, sample size) that seeds a
//! [`GaussianConditioner`](crate::GaussianConditioner) from generated data.

use nalgebra::{DMatrix, DVector};

use crate::error::InferenceError;

/// Column means of `data`.
pub fn column_means(data: &DMatrix<f64>) -> Result<DVector<f64>, InferenceError> {
    let rows = data.nrows();
    if rows == 0 {
        return Err(InferenceError::distribution("cannot average zero observations"));
    }
    let n = rows as f64;
    Ok(DVector::from_fn(data.ncols(), |j, _| data.column(j).sum() / n))
}

/// Unbiased sample covariance (denominator `rows - 1`).
///
/// Only the upper triangle is accumulated; the lower triangle is mirrored so
/// the result is exactly symmetric.
pub fn sample_covariance(data: &DMatrix<f64>) -> Result<DMatrix<f64>, InferenceError> {
    let rows = data.nrows();
    if rows < 2 {
        return Err(InferenceError::distribution(format!(
            "sample covariance needs at least 2 observations, got {}",
            rows
        )));
    }
    let means = column_means(data)?;
    let cols = data.ncols();

    let mut centered = data.clone();
    for j in 0..cols {
        centered.column_mut(j).add_scalar_mut(-means[j]);
    }

    let denom = (rows - 1) as f64;
    let mut cov = DMatrix::zeros(cols, cols);
    for i in 0..cols {
        for j in i..cols {
            let value = centered.column(i).dot(&centered.column(j)) / denom;
            cov[(i, j)] = value;
            cov[(j, i)] = value;
        }
    }
    Ok(cov)
}

/// Estimates the `(mean, covariance, sample_size)` triple for a prior.
pub fn estimate_prior(
    data: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>, usize), InferenceError> {
    Ok((column_means(data)?, sample_covariance(data)?, data.nrows()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_column_means() {
        let data = DMatrix::from_row_slice(3, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
        let means = column_means(&data).unwrap();
        assert_relative_eq!(means[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(means[1], 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_covariance_unbiased() {
        // y = 2x exactly, var(x) = 1 with n - 1 denominator
        let data = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let cov = sample_covariance(&data).unwrap();
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 4.0, epsilon = 1e-12);
        assert_eq!(cov[(0, 1)], cov[(1, 0)]);
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let single = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(
            sample_covariance(&single),
            Err(InferenceError::InvalidDistribution(_))
        ));
        let empty = DMatrix::<f64>::zeros(0, 3);
        assert!(column_means(&empty).is_err());
    }

    #[test]
    fn test_estimate_prior_reports_rows() {
        let data = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let (mean, cov, n) = estimate_prior(&data).unwrap();
        assert_eq!(n, 4);
        assert_relative_eq!(mean[0], 2.5, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 0)], 5.0 / 3.0, epsilon = 1e-12);
    }
}
