//! orders::evaluation: retrospective error per monthly partition.
//!
//! Purpose
//! -------
//! Compare a fitted model against observed orders one calendar month at a
//! time. For a partition starting on `target_date`:
//!
//! - actual `A` = total orders on every date whose month-of-year equals the
//!   partition's month (the year is not compared);
//! - predicted `P` = sum of model predictions over the
//!   `HORIZON_DAYS + 1` dates `[target_date, target_date + HORIZON_DAYS]`;
//! - `error = A − P`.
//!
//! Key behaviors
//! -------------
//! - A month with no data yields `error = −P`, not an error.
//! - Partitions are independent: each evaluation reads only the summary and
//!   the model, so any order of evaluation gives identical reports.
//! - [`evaluate_partitions`] runs a backfill on the rayon pool and returns
//!   reports in input order.
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::orders::{
    core::{
        calendar::horizon_dates,
        data::DailyOrderSummary,
        events::{EventSink, ForecastEvent},
        partitions::{MonthPartition, MonthlyPartitions},
    },
    errors::ForecastResult,
    models::predictor::OrderPredictor,
};

/// Error measurement for one monthly partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionErrorReport {
    pub partition: MonthPartition,
    pub target_date: NaiveDate,
    /// Observed total minus predicted total.
    pub error: f64,
}

/// Evaluate one partition.
///
/// # Errors
/// - [`ForecastError::TimestampOutOfRange`](crate::orders::errors::ForecastError::TimestampOutOfRange)
///   if the prediction window cannot be represented.
/// - Any error returned by the model's `predict`.
pub fn evaluate_partition<P: OrderPredictor + ?Sized>(
    summary: &DailyOrderSummary, model: &P, partition: MonthPartition, sink: &dyn EventSink,
) -> ForecastResult<PartitionErrorReport> {
    let target_date = partition.start_date();
    let actual = summary.orders_in_month_of_year(target_date.month());
    let predicted: f64 = model.predict(&horizon_dates(target_date)?)?.iter().sum();
    let error = actual - predicted;
    sink.emit(ForecastEvent::PartitionEvaluated { target_date, error });
    Ok(PartitionErrorReport { partition, target_date, error })
}

/// Resolve a partition key against `partitions` and evaluate it.
///
/// # Errors
/// - [`ForecastError::MissingPartitionKey`](crate::orders::errors::ForecastError::MissingPartitionKey)
///   when `key` is `None`, plus the key-parsing errors of
///   [`MonthlyPartitions::resolve`].
pub fn evaluate_partition_key<P: OrderPredictor + ?Sized>(
    summary: &DailyOrderSummary, model: &P, partitions: &MonthlyPartitions, key: Option<&str>,
    sink: &dyn EventSink,
) -> ForecastResult<PartitionErrorReport> {
    let partition = partitions.resolve(key)?;
    evaluate_partition(summary, model, partition, sink)
}

/// Evaluate many partitions in parallel; reports follow input order.
///
/// Fails with the first error in input order if any partition fails.
pub fn evaluate_partitions<P: OrderPredictor + ?Sized>(
    summary: &DailyOrderSummary, model: &P, partitions: &[MonthPartition], sink: &dyn EventSink,
) -> ForecastResult<Vec<PartitionErrorReport>> {
    partitions
        .par_iter()
        .map(|&p| evaluate_partition(summary, model, p, sink))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
