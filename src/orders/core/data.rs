//! Daily order summary: the input table shared by every pipeline stage.
//!
//! Purpose
//! -------
//! Hold one validated record per calendar day with the number of orders
//! placed that day, and read it from the CSV layout produced upstream
//! (`order_date,num_orders`, extra columns ignored).
//!
//! Key behaviors
//! -------------
//! - [`DailyOrderSummary::new`] sorts records by date and rejects duplicate
//!   dates.
//! - [`DailyOrderSummary::from_csv_reader`] looks columns up by header name,
//!   accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` dates (the time part is
//!   dropped), and accepts counts written as integers or integral floats
//!   (`12` or `12.0`).
//! - Aggregation helpers used by the evaluator and the fitter:
//!   [`DailyOrderSummary::orders_in_month_of_year`],
//!   [`DailyOrderSummary::latest_date`], [`DailyOrderSummary::counts`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Records are sorted strictly ascending by `order_date`.
//! - Counts are non-negative integers.
//! - An empty summary is a valid value; stages that need data report
//!   [`ForecastError::InsufficientData`] themselves.
//!
//! Conventions
//! -----------
//! - CSV row numbers in errors are 0-based data rows.
//! - The summary is read-only after construction and may be shared across
//!   threads.
use std::{io::Read, path::Path};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::orders::{
    core::calendar::normalized_times,
    errors::{ForecastError, ForecastResult},
};

/// Header of the date column.
pub const DATE_COLUMN: &str = "order_date";
/// Header of the count column.
pub const COUNT_COLUMN: &str = "num_orders";

/// One day of aggregated orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_date: NaiveDate,
    pub num_orders: u64,
}

impl OrderRecord {
    pub fn new(order_date: NaiveDate, num_orders: u64) -> Self {
        Self { order_date, num_orders }
    }
}

/// Validated, date-sorted table of daily order counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyOrderSummary {
    records: Vec<OrderRecord>,
}

impl DailyOrderSummary {
    /// Build a summary from records in any order.
    ///
    /// # Errors
    /// - [`ForecastError::DuplicateDate`] if two records share a date.
    pub fn new(mut records: Vec<OrderRecord>) -> ForecastResult<Self> {
        records.sort_by_key(|r| r.order_date);
        if let Some(pair) = records.windows(2).find(|w| w[0].order_date == w[1].order_date) {
            return Err(ForecastError::DuplicateDate { date: pair[0].order_date });
        }
        Ok(Self { records })
    }

    /// Build a summary from `(date, count)` pairs.
    pub fn from_pairs<I>(pairs: I) -> ForecastResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, u64)>,
    {
        Self::new(pairs.into_iter().map(|(d, n)| OrderRecord::new(d, n)).collect())
    }

    /// Read a summary from CSV with a header row.
    ///
    /// # Errors
    /// - [`ForecastError::MissingColumn`] if `order_date` or `num_orders` is
    ///   absent from the header.
    /// - [`ForecastError::InvalidDate`], [`ForecastError::NonNumericCount`],
    ///   [`ForecastError::InvalidCount`] for malformed cells.
    /// - [`ForecastError::DuplicateDate`] for repeated dates.
    /// - [`ForecastError::Csv`] for reader failures.
    pub fn from_csv_reader<R: Read>(reader: R) -> ForecastResult<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let date_idx = headers
            .iter()
            .position(|h| h == DATE_COLUMN)
            .ok_or(ForecastError::MissingColumn { column: DATE_COLUMN })?;
        let count_idx = headers
            .iter()
            .position(|h| h == COUNT_COLUMN)
            .ok_or(ForecastError::MissingColumn { column: COUNT_COLUMN })?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let date_cell = record.get(date_idx).unwrap_or_default();
            let count_cell = record.get(count_idx).unwrap_or_default();
            records.push(OrderRecord::new(
                parse_order_date(row, date_cell)?,
                parse_order_count(row, count_cell)?,
            ));
        }
        Self::new(records)
    }

    /// Read a summary from a CSV file on disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> ForecastResult<Self> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| ForecastError::Csv { text: e.to_string() })?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.order_date).collect()
    }

    /// Order counts as floats, aligned with [`Self::dates`].
    pub fn counts(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.num_orders as f64).collect()
    }

    /// Normalized model times, aligned with [`Self::dates`].
    pub fn normalized_times(&self) -> ForecastResult<Array1<f64>> {
        normalized_times(&self.dates())
    }

    /// Most recent date, or `None` for an empty summary.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.order_date)
    }

    /// Total orders on every date whose month-of-year equals `month`,
    /// regardless of year. Accumulated in `f64`, so very large counts lose
    /// precision instead of overflowing.
    pub fn orders_in_month_of_year(&self, month: u32) -> f64 {
        self.records
            .iter()
            .filter(|r| r.order_date.month() == month)
            .map(|r| r.num_orders as f64)
            .sum()
    }
}

// ---- Helper Methods ----

fn parse_order_date(row: usize, cell: &str) -> ForecastResult<NaiveDate> {
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| ForecastError::InvalidDate { row, value: cell.to_string() })
}

fn parse_order_count(row: usize, cell: &str) -> ForecastResult<u64> {
    if let Ok(n) = cell.parse::<u64>() {
        return Ok(n);
    }
    let value: f64 = cell
        .parse()
        .map_err(|_| ForecastError::NonNumericCount { row, value: cell.to_string() })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ForecastError::InvalidCount {
            row,
            value: cell.to_string(),
            reason: "Order counts must be finite and non-negative.",
        });
    }
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(ForecastError::InvalidCount {
            row,
            value: cell.to_string(),
            reason: "Order counts must be whole numbers.",
        });
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Sorting and duplicate detection in `DailyOrderSummary::new`.
    // - CSV ingestion: header lookup, date and count formats, error rows.
    // - Month-of-year aggregation used by the evaluator.
    // -------------------------------------------------------------------------

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_sorts_records_by_date() {
        let summary =
            DailyOrderSummary::from_pairs([(date(2023, 1, 3), 3), (date(2023, 1, 1), 1)]).unwrap();

        assert_eq!(summary.dates(), vec![date(2023, 1, 1), date(2023, 1, 3)]);
        assert_eq!(summary.latest_date(), Some(date(2023, 1, 3)));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = DailyOrderSummary::from_pairs([(date(2023, 1, 1), 1), (date(2023, 1, 1), 2)])
            .unwrap_err();

        assert_eq!(err, ForecastError::DuplicateDate { date: date(2023, 1, 1) });
    }

    #[test]
    // Purpose
    // -------
    // CSV columns are found by name and both cell formats are accepted.
    //
    // Given
    // -----
    // - Columns in reverse order plus an unrelated column.
    // - One timestamp-style date and one float-style count.
    //
    // Expect
    // ------
    // - Two records with the parsed values, sorted by date.
    fn csv_reader_looks_up_columns_by_name() {
        let text = "num_orders,region,order_date\n\
                    7.0,eu,2023-02-02 00:00:00\n\
                    5,us,2023-02-01\n";

        let summary = DailyOrderSummary::from_csv_reader(text.as_bytes()).unwrap();

        assert_eq!(
            summary.records(),
            &[OrderRecord::new(date(2023, 2, 1), 5), OrderRecord::new(date(2023, 2, 2), 7)]
        );
    }

    #[test]
    fn csv_reader_reports_missing_column() {
        let err = DailyOrderSummary::from_csv_reader("order_date,orders\n2023-01-01,4\n".as_bytes())
            .unwrap_err();

        assert_eq!(err, ForecastError::MissingColumn { column: COUNT_COLUMN });
    }

    #[test]
    fn csv_reader_reports_bad_cells_with_row_numbers() {
        let bad_date = "order_date,num_orders\n2023-01-01,1\n01/02/2023,2\n";
        let bad_count = "order_date,num_orders\n2023-01-01,many\n";
        let fractional = "order_date,num_orders\n2023-01-01,2.5\n";
        let negative = "order_date,num_orders\n2023-01-01,-3\n";

        assert!(matches!(
            DailyOrderSummary::from_csv_reader(bad_date.as_bytes()).unwrap_err(),
            ForecastError::InvalidDate { row: 1, .. }
        ));
        assert!(matches!(
            DailyOrderSummary::from_csv_reader(bad_count.as_bytes()).unwrap_err(),
            ForecastError::NonNumericCount { row: 0, .. }
        ));
        assert!(matches!(
            DailyOrderSummary::from_csv_reader(fractional.as_bytes()).unwrap_err(),
            ForecastError::InvalidCount { row: 0, .. }
        ));
        assert!(matches!(
            DailyOrderSummary::from_csv_reader(negative.as_bytes()).unwrap_err(),
            ForecastError::InvalidCount { row: 0, .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // Month aggregation ignores the year.
    //
    // Given
    // -----
    // - March 2022 and March 2023 records plus an April record.
    //
    // Expect
    // ------
    // - Month 3 sums both Marches; month 5 sums to zero.
    fn month_of_year_total_spans_years() {
        let summary = DailyOrderSummary::from_pairs([
            (date(2022, 3, 10), 4),
            (date(2023, 3, 1), 6),
            (date(2023, 4, 1), 100),
        ])
        .unwrap();

        assert_eq!(summary.orders_in_month_of_year(3), 10.0);
        assert_eq!(summary.orders_in_month_of_year(5), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Month totals of extreme counts do not overflow.
    //
    // Given
    // -----
    // - Two June records of `u64::MAX` orders each.
    //
    // Expect
    // ------
    // - A finite total of `2 · u64::MAX` within f64 precision.
    fn month_total_of_extreme_counts_does_not_overflow() {
        let summary =
            DailyOrderSummary::from_pairs([(date(2023, 6, 1), u64::MAX), (date(2023, 6, 2), u64::MAX)])
                .unwrap();

        let total = summary.orders_in_month_of_year(6);

        assert!(total.is_finite());
        assert_eq!(total, 2.0 * u64::MAX as f64);
    }
}
