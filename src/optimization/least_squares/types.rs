//! least_squares::types: shared numeric aliases for the least-squares solver.
//!
//! Purpose
//! -------
//! Centralize the numeric types used by the Levenberg–Marquardt layer so the
//! rest of the optimization code stays agnostic to `ndarray` generics and can
//! evolve if the backend changes.
//!
//! Conventions
//! -----------
//! - `Theta`, `Grad` and `Residuals` are column vectors; `Theta` and `Grad`
//!   have length `n` (free parameters), `Residuals` has length `m`
//!   (observations).
//! - `Jacobian` is a dense `m × n` matrix with `J[i, j] = ∂r_i/∂θ_j`.
//! - `Cost` is the scalar `½‖r‖²`.
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient of the cost, `∇c(θ) = Jᵀr`.
pub type Grad = Array1<f64>;

/// Residual vector `r(θ) = f(x; θ) − y`.
pub type Residuals = Array1<f64>;

/// Dense `m × n` Jacobian of the residuals.
pub type Jacobian = Array2<f64>;

/// Dense `n × n` Gauss–Newton information matrix `JᵀJ`.
pub type Information = Array2<f64>;

/// Scalar objective value `½‖r‖²`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps human-readable counter names (e.g., `"cost_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Default relative cost / step tolerance (`√ε`, matching MINPACK).
pub const DEFAULT_TOL: f64 = 1.490_116_119_384_765_6e-8;

/// Default iteration cap.
pub const DEFAULT_MAX_ITER: usize = 600;

/// Default initial damping factor `λ₀` applied to `diag(JᵀJ)`.
pub const DEFAULT_INITIAL_DAMPING: f64 = 1e-3;
