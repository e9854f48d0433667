//! Run configuration for the growth-curve fitter.
//!
//! Purpose
//! -------
//! Carry the caller-supplied initial guess `(a_init, b_init)` together with
//! the Levenberg–Marquardt options used for the fit.
//!
//! Key behaviors
//! -------------
//! - [`GrowthFitConfig::new`] validates that both initial values are finite.
//! - [`GrowthFitConfig::from_json`] reads `{"a_init": .., "b_init": ..}`
//!   (integers or floats); unknown keys are rejected.
//! - No `Default` impl: a run without an initial guess is a
//!   configuration error.
//!
//! Conventions
//! -----------
//! - Errors are reported as [`ForecastError`] values of kind
//!   `Configuration`.
use serde::Deserialize;

use crate::{
    optimization::least_squares::LMOptions,
    orders::errors::{ForecastError, ForecastResult},
};

/// Initial guess and solver options for one growth-model fit.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthFitConfig {
    pub a_init: f64,
    pub b_init: f64,
    pub lm_opts: LMOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrowthFitConfig {
    a_init: Option<f64>,
    b_init: Option<f64>,
}

impl GrowthFitConfig {
    /// Validated configuration with default solver options.
    ///
    /// # Errors
    /// - [`ForecastError::InvalidConfig`] if either value is NaN or infinite.
    pub fn new(a_init: f64, b_init: f64) -> ForecastResult<Self> {
        validate_init("a_init", a_init)?;
        validate_init("b_init", b_init)?;
        Ok(Self { a_init, b_init, lm_opts: LMOptions::default() })
    }

    /// Build from optional values, reporting the first missing key.
    pub fn from_parts(a_init: Option<f64>, b_init: Option<f64>) -> ForecastResult<Self> {
        let a_init = a_init.ok_or(ForecastError::MissingConfig { key: "a_init" })?;
        let b_init = b_init.ok_or(ForecastError::MissingConfig { key: "b_init" })?;
        Self::new(a_init, b_init)
    }

    /// Parse a JSON object holding `a_init` and `b_init`.
    ///
    /// # Errors
    /// - [`ForecastError::MalformedConfig`] for invalid JSON or unknown keys.
    /// - [`ForecastError::MissingConfig`] if a key is absent or `null`.
    /// - [`ForecastError::InvalidConfig`] for non-finite values.
    pub fn from_json(text: &str) -> ForecastResult<Self> {
        let raw: RawGrowthFitConfig = serde_json::from_str(text)
            .map_err(|e| ForecastError::MalformedConfig { text: e.to_string() })?;
        Self::from_parts(raw.a_init, raw.b_init)
    }

    /// Replace the solver options.
    pub fn with_lm_options(mut self, lm_opts: LMOptions) -> Self {
        self.lm_opts = lm_opts;
        self
    }
}

fn validate_init(key: &'static str, value: f64) -> ForecastResult<()> {
    if !value.is_finite() {
        return Err(ForecastError::InvalidConfig {
            key,
            value,
            reason: "Initial guesses must be finite.",
        });
    }
    Ok(())
}
