//! inference::covariance: parameter covariance for least-squares fits.
//!
//! Purpose
//! -------
//! Turn the Jacobian and residuals at a least-squares optimum into the usual
//! curve-fitting covariance estimate
//! `Cov(θ̂) = s² · (JᵀJ)⁺`, with `s² = ‖r‖² / (m − n)`, plus per-parameter
//! standard errors.
//!
//! Key behaviors
//! -------------
//! - Form the Gauss–Newton information matrix `JᵀJ` and copy it into a
//!   `nalgebra::DMatrix` (`fill_dmatrix`) for eigen-based linear algebra.
//! - Build the Moore–Penrose pseudoinverse from a symmetric
//!   eigendecomposition, discarding directions whose eigenvalue `λ_k` is at
//!   most `ε · max(m, n) · λ_max`.
//! - Return `None` when the residual variance is undefined (`m ≤ n`).
//!
//! Invariants & assumptions
//! ------------------------
//! - `jacobian` is `m × n` and `residuals` has length `m`; both are finite
//!   (validated upstream by the optimizer).
//! - The returned matrix is symmetric `n × n`.
//!
//! Conventions
//! -----------
//! - No explicit matrix inverse is formed.
//! - Errors are reported via [`OptResult<T>`].
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{Information, Jacobian, Residuals},
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Covariance estimate for fitted parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCovariance {
    /// `n × n` covariance matrix `s² · (JᵀJ)⁺`.
    pub matrix: Array2<f64>,
    /// Square roots of the diagonal of `matrix`.
    pub std_errors: Array1<f64>,
    /// Residual variance `s² = ‖r‖² / (m − n)`.
    pub residual_variance: f64,
}

/// param_covariance: covariance of least-squares estimates.
///
/// Parameters
/// ----------
/// - `jacobian`: `&Jacobian`
///   `m × n` Jacobian of the residuals at `θ̂`.
/// - `residuals`: `&Residuals`
///   Length-`m` residual vector at `θ̂`.
///
/// Returns
/// -------
/// `OptResult<Option<ParamCovariance>>`
///   `Ok(None)` when `m ≤ n` (no degrees of freedom for `s²`), otherwise the
///   covariance estimate.
///
/// Errors
/// ------
/// - [`OptError::ResidualDimMismatch`] if `residuals.len() != m`.
/// - [`OptError::InformationDimMismatch`] if `JᵀJ` is not `n × n`.
pub fn param_covariance(
    jacobian: &Jacobian, residuals: &Residuals,
) -> OptResult<Option<ParamCovariance>> {
    let (m, n) = jacobian.dim();
    if residuals.len() != m {
        return Err(OptError::ResidualDimMismatch { expected: m, found: residuals.len() });
    }
    if m <= n {
        return Ok(None);
    }
    let info: Information = jacobian.t().dot(jacobian);
    if info.nrows() != n || info.ncols() != n {
        return Err(OptError::InformationDimMismatch { expected: n, found: info.dim() });
    }
    let mut info_nalg = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(&info, &mut info_nalg);
    let pinv = pseudo_inverse(info_nalg, m.max(n));

    let residual_variance = residuals.dot(residuals) / (m - n) as f64;
    let matrix = pinv * residual_variance;
    let std_errors = matrix.diag().mapv(|v| v.max(0.0).sqrt());
    Ok(Some(ParamCovariance { matrix, std_errors, residual_variance }))
}

/// fill_dmatrix: copy a symmetric `ndarray` matrix into a `nalgebra::DMatrix`.
///
/// Iterates the lower triangle column by column and mirrors off-diagonal
/// entries, matching `DMatrix`'s column-major storage.
fn fill_dmatrix(info: &Array2<f64>, info_nalg: &mut DMatrix<f64>) {
    let n = info.ncols();
    for j in 0..n {
        for i in j..n {
            if j == i {
                info_nalg[(i, i)] = info[[i, i]];
            } else {
                info_nalg[(i, j)] = info[[i, j]];
                info_nalg[(j, i)] = info[[j, i]];
            }
        }
    }
}

/// pseudo_inverse: eigen-truncated Moore–Penrose inverse of `JᵀJ`.
///
/// With `JᵀJ = Q Λ Qᵀ`, returns `Σ_{k kept} q_k q_kᵀ / λ_k`. A direction is
/// kept when `λ_k > ε · dim · λ_max`.
fn pseudo_inverse(info_nalg: DMatrix<f64>, dim: usize) -> Array2<f64> {
    let n = info_nalg.nrows();
    let eigen_decomp = info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    let max_lambda = eigenvals.iter().fold(0.0_f64, |acc, &l| acc.max(l));
    let cutoff = f64::EPSILON * dim as f64 * max_lambda;

    let mut pinv = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigenvals.iter().enumerate() {
        if lambda <= cutoff || lambda <= 0.0 {
            continue;
        }
        for i in 0..n {
            for j in 0..n {
                pinv[[i, j]] += q[(i, k)] * q[(j, k)] / lambda;
            }
        }
    }
    pinv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement with the closed-form OLS covariance for a linear model.
    // - The `m ≤ n` boundary.
    // - Truncation of rank-deficient directions.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // For a design with orthogonal columns the covariance is diagonal with
    // entries `s² / ‖x_j‖²`.
    //
    // Given
    // -----
    // - `J = [[1, -1], [1, 1], [1, -1], [1, 1]]` (orthogonal columns, norms² 4).
    // - `r = (1, -1, 1, -1)`, so `s² = 4 / 2 = 2`.
    //
    // Expect
    // ------
    // - `Cov = diag(0.5, 0.5)`, `SE = (√0.5, √0.5)`.
    fn orthogonal_design_matches_closed_form() {
        let j = array![[1.0, -1.0], [1.0, 1.0], [1.0, -1.0], [1.0, 1.0]];
        let r = array![1.0, -1.0, 1.0, -1.0];

        let cov = param_covariance(&j, &r).unwrap().unwrap();

        assert_relative_eq!(cov.residual_variance, 2.0);
        assert_relative_eq!(cov.matrix[[0, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix[[1, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cov.std_errors[0], 0.5_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn no_degrees_of_freedom_yields_none() {
        let j = array![[1.0, 0.0], [0.0, 1.0]];
        let r = array![0.1, -0.1];

        assert!(param_covariance(&j, &r).unwrap().is_none());
    }

    #[test]
    // Purpose
    // -------
    // A duplicated column makes `JᵀJ` singular; the pseudoinverse must stay
    // finite.
    //
    // Given
    // -----
    // - `J` with two identical columns of ones (m = 3).
    //
    // Expect
    // ------
    // - All covariance entries are finite and the matrix is symmetric.
    // - Only the `(1, 1)/√2` direction survives, so both variances agree.
    fn rank_deficient_information_stays_finite() {
        let j = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let r = array![0.5, -0.5, 0.0];

        let cov = param_covariance(&j, &r).unwrap().unwrap();

        assert!(cov.matrix.iter().all(|v| v.is_finite()));
        assert_relative_eq!(cov.matrix[[0, 1]], cov.matrix[[1, 0]], epsilon = 1e-12);
        assert_relative_eq!(cov.matrix[[0, 0]], cov.matrix[[1, 1]], epsilon = 1e-9);
    }

    #[test]
    fn residual_length_is_checked() {
        let j = array![[1.0], [1.0], [1.0]];
        let r = array![0.0, 0.0];

        assert_eq!(
            param_covariance(&j, &r).unwrap_err(),
            OptError::ResidualDimMismatch { expected: 3, found: 2 }
        );
    }
}
