//! order_forecast: growth-curve forecasting of daily order volume.
//!
//! Purpose
//! -------
//! Fit a two-parameter exponential growth curve to a daily order series,
//! measure the fitted curve against each calendar month of observed orders,
//! and publish a 30-day forward forecast from the latest observation.
//!
//! Key behaviors
//! -------------
//! - `orders` holds the domain pipeline: input tables, configuration,
//!   partition keys, the growth and additive models, the partition error
//!   evaluator and the forecast generator.
//! - `optimization` provides an argmin-backed Levenberg–Marquardt solver for
//!   nonlinear least squares with a unified error surface (`OptError`).
//! - `inference` turns a least-squares optimum into a parameter covariance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Dates map to the model's time axis as nanoseconds since the Unix epoch
//!   divided by `10^18`.
//! - Every forward window covers `HORIZON_DAYS + 1` dates, both ends
//!   included.
//! - A fit that does not converge is an error; no stage falls back to the
//!   initial guess or to a partial result.
//!
//! Conventions
//! -----------
//! - Pipeline functions return `ForecastResult<T>`; optimizer errors convert
//!   into `ForecastError` through `From`.
//! - Progress is reported through an injected `EventSink`; `TracingSink`
//!   forwards to `tracing`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/` runs the full pipeline on
//!   synthetic data.

pub mod inference;
pub mod optimization;
pub mod orders;

pub use orders::prelude;
