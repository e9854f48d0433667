//! orders::models: fitted models of daily order volume.
//!
//! - [`growth`]: exponential growth curve fitted by Levenberg–Marquardt.
//! - [`additive`]: trend + seasonality model with prediction intervals.
//! - [`predictor`]: the [`OrderPredictor`](predictor::OrderPredictor) trait
//!   both models implement.
pub mod additive;
pub mod growth;
pub mod predictor;
