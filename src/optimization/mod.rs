//! optimization: least-squares stack and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used for model fitting: an argmin-backed
//! Levenberg–Marquardt solver for nonlinear least squares and a single
//! error/result surface. Callers implement a residual map, choose tolerances,
//! and obtain fitted parameters and diagnostics without touching backend
//! solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **minimizing sums of squared residuals**
//!   (`least_squares`), including configuration of stopping criteria.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Conventions
//! -----------
//! - The objective is always `c(θ) = ½‖r(θ)‖²`; residuals are
//!   `model − observation`.
//! - Parameters, residuals, and Jacobians are `ndarray` aliases (`Theta`,
//!   `Residuals`, `Jacobian`).
//! - Public entrypoints that can fail return `OptResult<T>`; callers never see
//!   raw argmin errors.
//! - This module performs no logging of its own; the model layer reports
//!   progress through its event sink.

pub mod errors;
pub mod least_squares;

// Downstream crates can write
//
//     use order_forecast::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::least_squares::prelude::*;
}
