//! Common capability of the order models: predict a count for each date.
use chrono::NaiveDate;

use crate::orders::errors::ForecastResult;

/// A fitted model that maps calendar dates to predicted order counts.
///
/// The evaluator and the forecast generator are generic over this trait, so
/// the growth curve and the additive model are interchangeable there.
pub trait OrderPredictor: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &str;

    /// One prediction per date, in input order.
    ///
    /// # Errors
    /// - [`ForecastError::TimestampOutOfRange`](crate::orders::errors::ForecastError::TimestampOutOfRange)
    ///   for dates the model's time axis cannot represent.
    fn predict(&self, dates: &[NaiveDate]) -> ForecastResult<Vec<f64>>;
}
