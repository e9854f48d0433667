//! orders: the order-forecasting pipeline.
//!
//! Stages, in dependency order:
//!
//! 1. [`models::growth::fit_growth_model`] fits the growth curve to a
//!    [`DailyOrderSummary`](core::data::DailyOrderSummary).
//! 2. [`evaluation::evaluate_partition`] measures the fitted model against
//!    one calendar month of observed orders.
//! 3. [`forecasts::generate_forecast`] predicts the days following the
//!    latest observation.
//!
//! [`models::additive`] offers an independent trend + seasonality forecast
//! that is not consumed by stages 2 and 3.
pub mod core;
pub mod errors;
pub mod evaluation;
pub mod forecasts;
pub mod models;

pub mod prelude {
    pub use super::core::{
        calendar::{CURVE_SHIFT, HORIZON_DAYS, NORMALIZATION_SCALE},
        config::GrowthFitConfig,
        data::{DailyOrderSummary, OrderRecord},
        events::{EventSink, ForecastEvent, MemorySink, NoopSink, TracingSink},
        partitions::{MonthPartition, MonthlyPartitions},
    };
    pub use super::errors::{ErrorKind, ForecastError, ForecastResult};
    pub use super::evaluation::{
        PartitionErrorReport, evaluate_partition, evaluate_partition_key, evaluate_partitions,
    };
    pub use super::forecasts::{PredictedOrder, PredictedOrders, generate_forecast};
    pub use super::models::{
        additive::{
            AdditiveModel, AdditiveOptions, ForecastRow, SecondaryForecast, fit_additive_model,
        },
        growth::{GrowthFit, GrowthModelParameters, fit_growth_model},
        predictor::OrderPredictor,
    };
}
