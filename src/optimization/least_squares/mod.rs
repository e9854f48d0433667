//! least_squares: argmin-powered Levenberg–Marquardt for curve fitting.
//!
//! Purpose
//! -------
//! Provide a high-level optimization layer for **nonlinear least squares**
//! `min_θ ½‖r(θ)‖²`. Callers implement a single trait, [`LeastSquares`], and
//! invoke [`minimize`] to run a Levenberg–Marquardt solver with configurable
//! tolerances and a finite-difference Jacobian fallback.
//!
//! Key behaviors
//! -------------
//! - Expose user residual maps to argmin as `Operator`, `Jacobian`,
//!   `CostFunction` and `Gradient` via [`adapter::ArgMinAdapter`].
//! - Implement the damped Gauss–Newton iteration as an argmin `Solver`
//!   ([`solver::LevenbergMarquardt`]) executed by argmin's `Executor`
//!   ([`run::run_levenberg_marquardt`]).
//! - Normalize results into an [`LsqOutcome`] that distinguishes the solver's
//!   own convergence from iteration-budget exhaustion.
//!
//! Invariants & assumptions
//! ------------------------
//! - Residual vectors have length `m = LeastSquares::n_obs(data)` and
//!   Jacobians are `m × n`; both are validated on every evaluation.
//! - [`LeastSquares::residuals`] and [`LeastSquares::jacobian`] must treat
//!   invalid inputs as recoverable [`OptError`](crate::optimization::errors::OptError)
//!   values, not panics.
//! - Configuration types ([`Tolerances`], [`LMOptions`]) are validated on
//!   construction and are treated as internally consistent by the solver.
//!
//! Downstream usage
//! ----------------
//! - Model code implements [`LeastSquares`] and calls [`minimize`] with an
//!   initial guess, a data payload and [`LMOptions`].
//! - Covariance estimates at the optimum are built from
//!   [`LsqOutcome::jacobian`] and [`LsqOutcome::residuals`] by
//!   `inference::covariance`.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover adapter sign/shape conventions and the
//!   FD fallback, damped solves and damping updates, tolerance validation,
//!   and end-to-end fits of toy exponential models including the
//!   non-convergence path.

pub mod adapter;
pub mod api;
pub mod run;
pub mod solver;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::traits::{LMOptions, LeastSquares, LsqOutcome, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Information, Jacobian, Residuals, Theta};

pub mod prelude {
    pub use super::api::minimize;
    pub use super::traits::{LMOptions, LeastSquares, LsqOutcome, Tolerances};
    pub use super::types::{Jacobian, Residuals, Theta};
}
