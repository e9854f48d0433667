//! inference: post-fit uncertainty for least-squares estimates.
//!
//! Purpose
//! -------
//! Provide covariance and standard-error estimates for parameters fitted by
//! the least-squares optimizer, computed from the Jacobian and residuals at
//! the optimum.
//!
//! Key behaviors
//! -------------
//! - [`param_covariance`] returns `s² · (JᵀJ)⁺` and standard errors, or
//!   `None` when there are no residual degrees of freedom.
//!
//! Conventions
//! -----------
//! - All functions are pure: no logging, no global state.
//! - Failures are reported via `OptResult`.

pub mod covariance;

pub use self::covariance::{ParamCovariance, param_covariance};
