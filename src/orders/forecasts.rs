//! orders::forecasts: forward forecast from the latest observed date.
//!
//! The generator anchors on the most recent date in the summary and
//! predicts every day in `[last, last + HORIZON_DAYS]` (both ends included),
//! so the first row overlaps the last observation. Each run is a full
//! recompute; the CSV writer replaces the previous snapshot atomically.
use std::{
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::orders::{
    core::{
        calendar::horizon_dates,
        data::DailyOrderSummary,
        events::{EventSink, ForecastEvent},
    },
    errors::{ForecastError, ForecastResult},
    models::predictor::OrderPredictor,
};

/// One predicted day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedOrder {
    pub order_date: NaiveDate,
    pub num_orders: f64,
}

/// Predicted orders over the forecast horizon, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedOrders {
    pub rows: Vec<PredictedOrder>,
}

impl PredictedOrders {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write `order_date,num_orders` rows with a header.
    pub fn write_csv<W: Write>(&self, writer: W) -> ForecastResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush().map_err(|e| ForecastError::Csv { text: e.to_string() })
    }

    /// Write the snapshot to `path`, replacing any existing file.
    ///
    /// Rows go to a sibling `<name>.tmp` file that is renamed over `path`
    /// only after every row is flushed; on failure the previous snapshot is
    /// left untouched.
    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> ForecastResult<()> {
        let path = path.as_ref();
        let staging = staging_path(path);
        let written = std::fs::File::create(&staging)
            .map_err(|e| ForecastError::Csv { text: e.to_string() })
            .and_then(|file| self.write_csv(std::io::BufWriter::new(file)));
        if let Err(err) = written {
            if staging.is_file() {
                let _ = std::fs::remove_file(&staging);
            }
            return Err(err);
        }
        std::fs::rename(&staging, path).map_err(|e| ForecastError::Csv { text: e.to_string() })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// generate_forecast: predict the horizon following the latest date.
///
/// Parameters
/// ----------
/// - `summary`: `&DailyOrderSummary`
///   Observed history; only its latest date is used.
/// - `model`: `&P`
///   Any fitted [`OrderPredictor`], typically the growth parameters.
/// - `sink`: `&dyn EventSink`
///   Receives one event describing the generated range.
///
/// Returns
/// -------
/// `ForecastResult<PredictedOrders>`
///   `HORIZON_DAYS + 1` rows starting at the latest observed date.
///
/// Errors
/// ------
/// - [`ForecastError::InsufficientData`] for an empty summary.
/// - [`ForecastError::TimestampOutOfRange`] if the horizon cannot be
///   represented.
pub fn generate_forecast<P: OrderPredictor + ?Sized>(
    summary: &DailyOrderSummary, model: &P, sink: &dyn EventSink,
) -> ForecastResult<PredictedOrders> {
    let last = summary.latest_date().ok_or(ForecastError::InsufficientData { needed: 1, found: 0 })?;
    let dates = horizon_dates(last)?;
    let predictions = model.predict(&dates)?;
    let rows: Vec<PredictedOrder> = dates
        .iter()
        .zip(predictions)
        .map(|(&order_date, num_orders)| PredictedOrder { order_date, num_orders })
        .collect();
    if let (Some(first), Some(end)) = (rows.first(), rows.last()) {
        sink.emit(ForecastEvent::ForecastGenerated {
            start: first.order_date,
            end: end.order_date,
            points: rows.len(),
        });
    }
    Ok(PredictedOrders { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{
        core::{calendar::HORIZON_DAYS, events::MemorySink},
        models::growth::GrowthModelParameters,
    };
    use approx::assert_relative_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The forecast starts at the latest date regardless of input order.
    //
    // Given
    // -----
    // - Records for 2023-06-30 and 2023-06-01 with a growth model.
    //
    // Expect
    // ------
    // - 31 rows from 2023-06-30 to 2023-07-30 matching the curve.
    fn forecast_spans_inclusive_horizon_from_latest_date() {
        let summary =
            DailyOrderSummary::from_pairs([(day(2023, 6, 30), 4), (day(2023, 6, 1), 2)]).unwrap();
        let params = GrowthModelParameters::new(50.0, 4.0);
        let sink = MemorySink::new();

        let out = generate_forecast(&summary, &params, &sink).unwrap();

        assert_eq!(out.len(), HORIZON_DAYS as usize + 1);
        assert_eq!(out.rows[0].order_date, day(2023, 6, 30));
        assert_eq!(out.rows[30].order_date, day(2023, 7, 30));
        for row in &out.rows {
            assert_relative_eq!(row.num_orders, params.evaluate_date(row.order_date).unwrap());
        }
        assert_eq!(sink.messages(), vec!["Predicted 31 days from 2023-06-30 to 2023-07-30"]);
    }

    #[test]
    fn empty_summary_has_no_anchor_date() {
        let err = generate_forecast(
            &DailyOrderSummary::default(),
            &GrowthModelParameters::new(1.0, 1.0),
            &MemorySink::new(),
        )
        .unwrap_err();

        assert_eq!(err, ForecastError::InsufficientData { needed: 1, found: 0 });
    }

    fn two_rows() -> PredictedOrders {
        PredictedOrders {
            rows: vec![
                PredictedOrder { order_date: day(2023, 1, 1), num_orders: 1.5 },
                PredictedOrder { order_date: day(2023, 1, 2), num_orders: 2.0 },
            ],
        }
    }

    #[test]
    fn snapshot_file_is_replaced_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("predicted_orders.csv");
        std::fs::write(&target, "order_date,num_orders\n2022-01-01,9.0\n").unwrap();

        two_rows().write_csv_path(&target).unwrap();

        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "order_date,num_orders\n2023-01-01,1.5\n2023-01-02,2.0\n"
        );
        assert!(!dir.path().join("predicted_orders.csv.tmp").exists());
    }

    #[test]
    // Purpose
    // -------
    // A failed write leaves the previous snapshot as it was.
    //
    // Given
    // -----
    // - An existing snapshot and a directory occupying the staging path, so
    //   the new rows cannot be written.
    //
    // Expect
    // ------
    // - `ForecastError::Csv` and the old file content unchanged.
    fn failed_write_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("predicted_orders.csv");
        let previous = "order_date,num_orders\n2022-01-01,9.0\n";
        std::fs::write(&target, previous).unwrap();
        std::fs::create_dir(dir.path().join("predicted_orders.csv.tmp")).unwrap();

        let err = two_rows().write_csv_path(&target).unwrap_err();

        assert!(matches!(err, ForecastError::Csv { .. }));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), previous);
    }

    #[test]
    fn csv_snapshot_has_header_and_rows() {
        let mut buf = Vec::new();

        two_rows().write_csv(&mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "order_date,num_orders\n2023-01-01,1.5\n2023-01-02,2.0\n"
        );
    }
}
