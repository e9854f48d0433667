//! Calendar and time-axis conventions shared by the fitter, the evaluator
//! and the forecast generator.
//!
//! - Dates are calendar days (`chrono::NaiveDate`) at midnight UTC.
//! - The model's time axis is nanoseconds since the Unix epoch divided by
//!   [`NORMALIZATION_SCALE`], so `t = 1.6095` lands in early January 2021.
//! - Every forward window covers [`HORIZON_DAYS`] + 1 dates: the start date
//!   and the following `HORIZON_DAYS` days, both ends inclusive.
use chrono::{Days, NaiveDate};
use ndarray::Array1;

use crate::orders::errors::{ForecastError, ForecastResult};

/// Number of days forecast beyond a start date.
pub const HORIZON_DAYS: u64 = 30;

/// Divisor turning epoch nanoseconds into the model's time axis.
pub const NORMALIZATION_SCALE: f64 = 1e18;

/// Shift applied inside the exponent of the growth curve.
pub const CURVE_SHIFT: f64 = 1.6095;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Nanoseconds since 1970-01-01T00:00:00Z for midnight of `date`.
///
/// # Errors
/// - [`ForecastError::TimestampOutOfRange`] if the value overflows `i64`
///   (dates outside roughly 1677..2262).
pub fn epoch_nanos(date: NaiveDate) -> ForecastResult<i64> {
    let seconds = date
        .and_hms_opt(0, 0, 0)
        .ok_or(ForecastError::TimestampOutOfRange { date })?
        .and_utc()
        .timestamp();
    seconds.checked_mul(NANOS_PER_SECOND).ok_or(ForecastError::TimestampOutOfRange { date })
}

/// Position of `date` on the model's time axis.
pub fn normalized_time(date: NaiveDate) -> ForecastResult<f64> {
    Ok(epoch_nanos(date)? as f64 / NORMALIZATION_SCALE)
}

/// Normalized times for a slice of dates, in order.
pub fn normalized_times(dates: &[NaiveDate]) -> ForecastResult<Array1<f64>> {
    let times = dates.iter().map(|&d| normalized_time(d)).collect::<ForecastResult<Vec<_>>>()?;
    Ok(Array1::from(times))
}

/// The `HORIZON_DAYS + 1` consecutive dates starting at `start`.
///
/// # Errors
/// - [`ForecastError::TimestampOutOfRange`] if the window runs past the end
///   of the representable calendar.
pub fn horizon_dates(start: NaiveDate) -> ForecastResult<Vec<NaiveDate>> {
    (0..=HORIZON_DAYS)
        .map(|offset| {
            start
                .checked_add_days(Days::new(offset))
                .ok_or(ForecastError::TimestampOutOfRange { date: start })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn epoch_origin_is_zero() {
        assert_eq!(epoch_nanos(date(1970, 1, 1)).unwrap(), 0);
        assert_eq!(epoch_nanos(date(1970, 1, 2)).unwrap(), 86_400 * NANOS_PER_SECOND);
    }

    #[test]
    // Purpose
    // -------
    // The curve shift sits in early 2021 on the normalized axis.
    //
    // Given
    // -----
    // - 2021-01-01 is 1_609_459_200 seconds after the epoch.
    //
    // Expect
    // ------
    // - `normalized_time` equals `1.6094592`.
    fn normalized_time_matches_epoch_seconds() {
        let t = normalized_time(date(2021, 1, 1)).unwrap();

        assert_relative_eq!(t, 1.6094592, epsilon = 1e-12);
        assert!((t - CURVE_SHIFT).abs() < 1e-3);
    }

    #[test]
    fn dates_beyond_nanosecond_range_are_rejected() {
        let err = epoch_nanos(date(2300, 1, 1)).unwrap_err();

        assert!(matches!(err, ForecastError::TimestampOutOfRange { .. }));
    }

    #[test]
    // Purpose
    // -------
    // The horizon is inclusive at both ends.
    //
    // Given
    // -----
    // - Start date 2023-12-15.
    //
    // Expect
    // ------
    // - 31 consecutive dates ending on 2024-01-14.
    fn horizon_is_inclusive_and_consecutive() {
        let dates = horizon_dates(date(2023, 12, 15)).unwrap();

        assert_eq!(dates.len(), HORIZON_DAYS as usize + 1);
        assert_eq!(dates[0], date(2023, 12, 15));
        assert_eq!(dates[30], date(2024, 1, 14));
        assert!(dates.windows(2).all(|w| (w[1] - w[0]).num_days() == 1));
    }
}
