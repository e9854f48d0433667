//! Validation helpers for least-squares optimization.
//!
//! This module centralizes common consistency checks used across the
//! optimizer interface:
//!
//! - **Tolerance checks**: [`verify_ftol`], [`verify_xtol`], [`verify_gtol`]
//!   ensure numeric tolerances are finite and strictly positive when provided.
//! - **Residual validation**: [`validate_residuals`] enforces length and
//!   finite entries.
//! - **Jacobian validation**: [`validate_jacobian`] enforces an `m × n` shape
//!   and finite entries.
//! - **Parameter estimates**: [`validate_theta_hat`] ensures a candidate
//!   `theta_hat` exists and contains only finite values.
//! - **Objective values**: [`validate_value`] checks cost outputs for
//!   finiteness.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::types::{Jacobian, Residuals, Theta},
};

/// Shared finiteness/positivity rule for optional tolerances.
fn check_tol(tol: Option<f64>) -> Result<(), (f64, &'static str)> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err((tol, "Tolerance must be finite."));
        }
        if tol <= 0.0 {
            return Err((tol, "Tolerance must be positive."));
        }
    }
    Ok(())
}

/// Validate the optional relative cost-reduction tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidFtol`] if the value is non-finite or ≤ 0.0.
pub fn verify_ftol(tol: Option<f64>) -> OptResult<()> {
    check_tol(tol).map_err(|(tol, reason)| OptError::InvalidFtol { tol, reason })
}

/// Validate the optional relative step-size tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidXtol`] if the value is non-finite or ≤ 0.0.
pub fn verify_xtol(tol: Option<f64>) -> OptResult<()> {
    check_tol(tol).map_err(|(tol, reason)| OptError::InvalidXtol { tol, reason })
}

/// Validate the optional gradient infinity-norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidGtol`] if the value is non-finite or ≤ 0.0.
pub fn verify_gtol(tol: Option<f64>) -> OptResult<()> {
    check_tol(tol).map_err(|(tol, reason)| OptError::InvalidGtol { tol, reason })
}

/// Validate a residual vector against length and finiteness.
///
/// # Errors
/// - [`OptError::ResidualDimMismatch`] if `residuals.len() != m`.
/// - [`OptError::NonFiniteResidual`] for the first non-finite entry.
pub fn validate_residuals(residuals: &Residuals, m: usize) -> OptResult<()> {
    if residuals.len() != m {
        return Err(OptError::ResidualDimMismatch { expected: m, found: residuals.len() });
    }
    for (index, &value) in residuals.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::NonFiniteResidual { index, value });
        }
    }
    Ok(())
}

/// Validate the shape and entries of a Jacobian matrix.
///
/// # Checks
/// 1. Matrix dimensions must equal `m × n`.
/// 2. All entries must be finite (no NaN or ±∞).
///
/// # Errors
/// - [`OptError::JacobianDimMismatch`] if dimensions do not match.
/// - [`OptError::InvalidJacobian`] if any entry is non-finite, with offending
///   row/col indices and value.
pub fn validate_jacobian(jacobian: &Jacobian, m: usize, n: usize) -> OptResult<()> {
    if jacobian.nrows() != m || jacobian.ncols() != n {
        return Err(OptError::JacobianDimMismatch {
            expected: (m, n),
            found: (jacobian.nrows(), jacobian.ncols()),
        });
    }
    for ((row, col), &value) in jacobian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidJacobian { row, col, value });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

/// Validate that a scalar cost value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance validation for the three stopping tolerances.
    // - Shape and finiteness checks for residuals and Jacobians.
    // - Unwrapping of `theta_hat`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances accept `None` and positive finite values only.
    //
    // Expect
    // ------
    // - `None` and `1e-8` pass.
    // - `0.0` and `NaN` map to the tolerance-specific error variant.
    fn tolerance_checks_reject_non_positive_and_non_finite() {
        assert!(verify_ftol(None).is_ok());
        assert!(verify_xtol(Some(1e-8)).is_ok());
        assert!(matches!(verify_gtol(Some(0.0)), Err(OptError::InvalidGtol { .. })));
        assert!(matches!(verify_ftol(Some(f64::NAN)), Err(OptError::InvalidFtol { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Residual validation reports the first non-finite entry.
    //
    // Given
    // -----
    // - `r = [0.0, NaN, inf]`.
    //
    // Expect
    // ------
    // - `NonFiniteResidual { index: 1, .. }`.
    fn residuals_report_first_non_finite_index() {
        let r = array![0.0, f64::NAN, f64::INFINITY];

        let err = validate_residuals(&r, 3).unwrap_err();

        assert!(matches!(err, OptError::NonFiniteResidual { index: 1, .. }));
        assert_eq!(
            validate_residuals(&r, 2).unwrap_err(),
            OptError::ResidualDimMismatch { expected: 2, found: 3 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Jacobians must be `m × n`; a transposed matrix is rejected.
    //
    // Given
    // -----
    // - A `2 × 3` matrix validated as `3 × 2`.
    //
    // Expect
    // ------
    // - `JacobianDimMismatch { expected: (3, 2), found: (2, 3) }`.
    fn jacobian_shape_is_enforced() {
        let j = Array2::<f64>::zeros((2, 3));

        assert_eq!(
            validate_jacobian(&j, 3, 2).unwrap_err(),
            OptError::JacobianDimMismatch { expected: (3, 2), found: (2, 3) }
        );
        assert!(validate_jacobian(&j, 2, 3).is_ok());
    }

    #[test]
    fn theta_hat_must_be_present_and_finite() {
        assert_eq!(validate_theta_hat(None).unwrap_err(), OptError::MissingThetaHat);
        assert!(validate_theta_hat(Some(array![1.0, f64::NAN])).is_err());
        assert_eq!(validate_theta_hat(Some(array![1.0, 2.0])).unwrap(), array![1.0, 2.0]);
    }
}
