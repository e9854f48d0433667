//! Errors for the order-forecasting pipeline (input shape, configuration,
//! data sufficiency, and fitting failures).
//!
//! This module defines [`ForecastError`], the single error type returned by
//! the model fitter, the partitioned error evaluator and the forecast
//! generator, and [`ErrorKind`], the coarse taxonomy callers branch on when
//! deciding whether to retry, reconfigure, or repair upstream data.
//!
//! ## Conventions
//! - Row indices in CSV errors are **0-based data rows** (the header is not
//!   counted).
//! - Optimizer failures arrive as [`OptError`] and are mapped here:
//!   `InsufficientObservations` becomes [`ForecastError::InsufficientData`],
//!   everything else is wrapped in [`ForecastError::Optimization`].
//! - Nothing in this crate downgrades an error into a default result.
use chrono::NaiveDate;

use crate::optimization::errors::OptError;

/// Result alias for pipeline operations that may produce [`ForecastError`].
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Coarse error taxonomy for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Too few data points to fit or to anchor a forecast.
    InsufficientData,
    /// The solver did not meet its convergence test within budget.
    Convergence,
    /// Missing or invalid initial guess, options, or partition key.
    Configuration,
    /// Input table is missing columns or holds malformed values.
    DataShape,
    /// Numerical failure that is not a convergence failure.
    Numerical,
}

/// Unified error type for order forecasting.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    // ---- Insufficient data ----
    /// Fewer data points than the operation needs.
    InsufficientData { needed: usize, found: usize },

    // ---- Convergence ----
    /// The solver stopped without meeting its convergence test.
    Convergence { status: String, iterations: usize },

    // ---- Configuration ----
    /// A required configuration value was not supplied.
    MissingConfig { key: &'static str },

    /// A configuration value is out of its admissible range.
    InvalidConfig { key: &'static str, value: f64, reason: &'static str },

    /// Configuration text could not be parsed.
    MalformedConfig { text: String },

    /// No partition key was supplied to the evaluator.
    MissingPartitionKey,

    /// Partition key is not a `YYYY-MM` / `YYYY-MM-01` month key.
    InvalidPartitionKey { key: String, reason: &'static str },

    /// Partition key lies before the first partition of the definition.
    PartitionBeforeStart { key: String, start: String },

    // ---- Data shape ----
    /// Input table lacks a required column.
    MissingColumn { column: &'static str },

    /// An order count cell is not numeric.
    NonNumericCount { row: usize, value: String },

    /// An order count is negative or fractional.
    InvalidCount { row: usize, value: String, reason: &'static str },

    /// An order date cell could not be parsed.
    InvalidDate { row: usize, value: String },

    /// More than one record for the same date.
    DuplicateDate { date: NaiveDate },

    /// Date cannot be represented as i64 nanoseconds since the epoch.
    TimestampOutOfRange { date: NaiveDate },

    /// Low-level CSV reader/writer failure.
    Csv { text: String },

    // ---- Numerical ----
    /// Additive-model design matrix could not be factorized.
    SingularDesign { columns: usize },

    /// Optimizer failure other than insufficient observations.
    Optimization(OptError),
}

impl ForecastError {
    /// Map a concrete error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::InsufficientData { .. } => ErrorKind::InsufficientData,
            ForecastError::Convergence { .. } => ErrorKind::Convergence,
            ForecastError::MissingConfig { .. }
            | ForecastError::InvalidConfig { .. }
            | ForecastError::MalformedConfig { .. }
            | ForecastError::MissingPartitionKey
            | ForecastError::InvalidPartitionKey { .. }
            | ForecastError::PartitionBeforeStart { .. } => ErrorKind::Configuration,
            ForecastError::MissingColumn { .. }
            | ForecastError::NonNumericCount { .. }
            | ForecastError::InvalidCount { .. }
            | ForecastError::InvalidDate { .. }
            | ForecastError::DuplicateDate { .. }
            | ForecastError::TimestampOutOfRange { .. }
            | ForecastError::Csv { .. } => ErrorKind::DataShape,
            ForecastError::SingularDesign { .. } | ForecastError::Optimization(_) => {
                ErrorKind::Numerical
            }
        }
    }
}

impl std::error::Error for ForecastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForecastError::Optimization(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Insufficient data ----
            ForecastError::InsufficientData { needed, found } => {
                write!(f, "Insufficient data: need at least {needed} distinct dates, found {found}")
            }

            // ---- Convergence ----
            ForecastError::Convergence { status, iterations } => {
                write!(f, "Fit did not converge after {iterations} iterations: {status}")
            }

            // ---- Configuration ----
            ForecastError::MissingConfig { key } => {
                write!(f, "Missing required configuration value '{key}'")
            }
            ForecastError::InvalidConfig { key, value, reason } => {
                write!(f, "Invalid configuration value {key} = {value}: {reason}")
            }
            ForecastError::MalformedConfig { text } => {
                write!(f, "Malformed configuration: {text}")
            }
            ForecastError::MissingPartitionKey => {
                write!(f, "No partition key supplied")
            }
            ForecastError::InvalidPartitionKey { key, reason } => {
                write!(f, "Invalid partition key '{key}': {reason}")
            }
            ForecastError::PartitionBeforeStart { key, start } => {
                write!(f, "Partition '{key}' precedes the first partition '{start}'")
            }

            // ---- Data shape ----
            ForecastError::MissingColumn { column } => {
                write!(f, "Input table is missing required column '{column}'")
            }
            ForecastError::NonNumericCount { row, value } => {
                write!(f, "Non-numeric order count at row {row}: '{value}'")
            }
            ForecastError::InvalidCount { row, value, reason } => {
                write!(f, "Invalid order count at row {row}: '{value}': {reason}")
            }
            ForecastError::InvalidDate { row, value } => {
                write!(f, "Invalid order date at row {row}: '{value}'")
            }
            ForecastError::DuplicateDate { date } => {
                write!(f, "Duplicate record for order date {date}")
            }
            ForecastError::TimestampOutOfRange { date } => {
                write!(f, "Date {date} is outside the nanosecond timestamp range")
            }
            ForecastError::Csv { text } => {
                write!(f, "CSV error: {text}")
            }

            // ---- Numerical ----
            ForecastError::SingularDesign { columns } => {
                write!(f, "Additive model design with {columns} columns is singular")
            }
            ForecastError::Optimization(err) => {
                write!(f, "Optimization failed: {err}")
            }
        }
    }
}

impl From<OptError> for ForecastError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::InsufficientObservations { needed, found } => {
                ForecastError::InsufficientData { needed, found }
            }
            other => ForecastError::Optimization(other),
        }
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Csv { text: err.to_string() }
    }
}
