//! models::additive: additive trend + seasonality forecaster.
//!
//! Purpose
//! -------
//! Provide a second, independent forecast of daily orders from a
//! decomposable model `y(t) = trend(t) + weekly(t) + yearly(t)`. The growth
//! curve drives evaluation and the published forecast; this model produces
//! its own table with component breakdown and prediction intervals.
//!
//! Key behaviors
//! -------------
//! - Trend: piecewise-linear in scaled time with hinge terms `(t − c_j)₊`
//!   at `n_changepoints` locations spread over the first
//!   `changepoint_range` of the history rows.
//! - Seasonality: Fourier terms of order 3 on a 7-day period when the
//!   history spans at least 14 days, and order 10 on a 365.25-day period
//!   when it spans at least 730 days. Phases are measured in days since the
//!   Unix epoch so history and future rows share one basis.
//! - Coefficients solve the ridge-penalized normal equations
//!   `(XᵀX + diag(λ)) β = Xᵀy` by Cholesky, with `λ = 1/scale²` per block
//!   (changepoint scale 0.05, seasonality scale 10, base trend scale 5).
//! - Intervals are `yhat ± z · σ` with `σ` the in-sample residual standard
//!   deviation and `z` the standard normal quantile at `(1 + width) / 2`.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least two distinct dates.
//! - `y` is divided by `max |y|` (or 1 when all counts are zero) and time by
//!   the history span in days; both scalings are undone on output.
//!
//! Conventions
//! -----------
//! - The forecast table covers every history date followed by `periods`
//!   daily dates after the last one.
use chrono::{Days, NaiveDate};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::orders::{
    core::{
        calendar::{HORIZON_DAYS, epoch_nanos},
        data::DailyOrderSummary,
        events::{EventSink, ForecastEvent},
    },
    errors::{ForecastError, ForecastResult},
    models::predictor::OrderPredictor,
};

const NANOS_PER_DAY: f64 = 86_400.0 * 1e9;
const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;
const WEEKLY_MIN_SPAN_DAYS: f64 = 14.0;
const YEARLY_MIN_SPAN_DAYS: f64 = 730.0;
const BASE_TREND_PRIOR_SCALE: f64 = 5.0;

/// Tuning of the additive model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditiveOptions {
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub weekly_order: usize,
    pub yearly_order: usize,
    pub interval_width: f64,
    pub periods: usize,
}

impl Default for AdditiveOptions {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            weekly_order: 3,
            yearly_order: 10,
            interval_width: 0.8,
            periods: HORIZON_DAYS as usize,
        }
    }
}

impl AdditiveOptions {
    /// Check ranges of the floating-point settings.
    ///
    /// # Errors
    /// - [`ForecastError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> ForecastResult<()> {
        let in_unit = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
        if !in_unit(self.changepoint_range) {
            return Err(ForecastError::InvalidConfig {
                key: "changepoint_range",
                value: self.changepoint_range,
                reason: "Changepoint range must lie in (0, 1].",
            });
        }
        for (key, value) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ForecastError::InvalidConfig {
                    key,
                    value,
                    reason: "Prior scales must be finite and positive.",
                });
            }
        }
        if !in_unit(self.interval_width) || self.interval_width >= 1.0 {
            return Err(ForecastError::InvalidConfig {
                key: "interval_width",
                value: self.interval_width,
                reason: "Interval width must lie in (0, 1).",
            });
        }
        Ok(())
    }
}

/// One row of the additive forecast table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
    pub additive_terms: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// History plus future rows produced by [`AdditiveModel::forecast`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryForecast {
    pub rows: Vec<ForecastRow>,
}

impl SecondaryForecast {
    /// Write the table as CSV with a header row.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> ForecastResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush().map_err(|e| ForecastError::Csv { text: e.to_string() })
    }
}

/// Fitted additive model.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveModel {
    options: AdditiveOptions,
    history: Vec<NaiveDate>,
    start_day: f64,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    weekly: bool,
    yearly: bool,
    coefficients: Array1<f64>,
    sigma: f64,
    z: f64,
}

/// Column ranges of the design matrix.
struct Layout {
    hinges: std::ops::Range<usize>,
    weekly: std::ops::Range<usize>,
    yearly: std::ops::Range<usize>,
}

impl AdditiveModel {
    /// Fit the model to a daily order summary.
    ///
    /// # Errors
    /// - [`ForecastError::InsufficientData`] for fewer than two dates.
    /// - [`ForecastError::InvalidConfig`] for invalid options.
    /// - [`ForecastError::SingularDesign`] if the penalized system cannot be
    ///   factorized.
    pub fn fit(
        summary: &DailyOrderSummary, options: AdditiveOptions, sink: &dyn EventSink,
    ) -> ForecastResult<Self> {
        options.validate()?;
        if summary.len() < 2 {
            return Err(ForecastError::InsufficientData { needed: 2, found: summary.len() });
        }
        let history = summary.dates();
        let days = history.iter().map(|&d| epoch_days(d)).collect::<ForecastResult<Vec<_>>>()?;
        let start_day = days[0];
        let span_days = days[days.len() - 1] - start_day;
        let y = summary.counts();
        let max_abs = y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if max_abs > 0.0 { max_abs } else { 1.0 };
        let scaled_times: Vec<f64> = days.iter().map(|d| (d - start_day) / span_days).collect();

        let z = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::MalformedConfig { text: e.to_string() })?
            .inverse_cdf((1.0 + options.interval_width) / 2.0);
        let mut model = Self {
            options,
            changepoints: changepoint_locations(&scaled_times, &options),
            weekly: span_days >= WEEKLY_MIN_SPAN_DAYS && options.weekly_order > 0,
            yearly: span_days >= YEARLY_MIN_SPAN_DAYS && options.yearly_order > 0,
            history,
            start_day,
            span_days,
            y_scale,
            coefficients: Array1::zeros(0),
            sigma: 0.0,
            z,
        };

        let x = model.design(&days);
        let target = y.mapv(|v| v / y_scale);
        let penalty = model.penalty(x.ncols());
        model.coefficients = solve_ridge(&x, &target, &penalty)?;

        let fitted = x.dot(&model.coefficients);
        let sse: f64 = fitted.iter().zip(target.iter()).map(|(f, t)| (f - t).powi(2)).sum();
        model.sigma = (sse / target.len() as f64).sqrt() * y_scale;

        sink.emit(ForecastEvent::AdditiveFitted { rows: days.len(), regressors: x.ncols() });
        Ok(model)
    }

    /// The `periods` daily dates after the last history date.
    pub fn future_dates(&self) -> ForecastResult<Vec<NaiveDate>> {
        let Some(&last) = self.history.last() else {
            return Ok(Vec::new());
        };
        (1..=self.options.periods as u64)
            .map(|k| {
                last.checked_add_days(Days::new(k))
                    .ok_or(ForecastError::TimestampOutOfRange { date: last })
            })
            .collect()
    }

    /// Component breakdown for arbitrary dates.
    pub fn components(&self, dates: &[NaiveDate]) -> ForecastResult<Vec<ForecastRow>> {
        let days = dates.iter().map(|&d| epoch_days(d)).collect::<ForecastResult<Vec<_>>>()?;
        let x = self.design(&days);
        let layout = self.layout();
        let trend_end = layout.hinges.end;
        let mut rows = Vec::with_capacity(dates.len());
        for (i, &ds) in dates.iter().enumerate() {
            let row = x.row(i);
            let part = |range: std::ops::Range<usize>| -> f64 {
                range.map(|c| row[c] * self.coefficients[c]).sum::<f64>() * self.y_scale
            };
            let trend = part(0..trend_end);
            let weekly = part(layout.weekly.clone());
            let yearly = part(layout.yearly.clone());
            let additive_terms = weekly + yearly;
            let yhat = trend + additive_terms;
            rows.push(ForecastRow {
                ds,
                trend,
                weekly,
                yearly,
                additive_terms,
                yhat,
                yhat_lower: yhat - self.z * self.sigma,
                yhat_upper: yhat + self.z * self.sigma,
            });
        }
        Ok(rows)
    }

    /// History rows followed by `periods` future rows.
    pub fn forecast(&self) -> ForecastResult<SecondaryForecast> {
        let mut dates = self.history.clone();
        dates.extend(self.future_dates()?);
        Ok(SecondaryForecast { rows: self.components(&dates)? })
    }

    /// In-sample residual standard deviation in order units.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn has_weekly(&self) -> bool {
        self.weekly
    }

    pub fn has_yearly(&self) -> bool {
        self.yearly
    }

    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    // ---- Helper Methods ----

    fn layout(&self) -> Layout {
        let hinges = 2..2 + self.changepoints.len();
        let weekly_cols = if self.weekly { 2 * self.options.weekly_order } else { 0 };
        let yearly_cols = if self.yearly { 2 * self.options.yearly_order } else { 0 };
        let weekly = hinges.end..hinges.end + weekly_cols;
        let yearly = weekly.end..weekly.end + yearly_cols;
        Layout { hinges, weekly, yearly }
    }

    fn design(&self, days: &[f64]) -> Array2<f64> {
        let layout = self.layout();
        let mut x = Array2::zeros((days.len(), layout.yearly.end));
        for (i, &day) in days.iter().enumerate() {
            let t = (day - self.start_day) / self.span_days;
            x[[i, 0]] = 1.0;
            x[[i, 1]] = t;
            for (c, &cp) in layout.hinges.clone().zip(self.changepoints.iter()) {
                x[[i, c]] = (t - cp).max(0.0);
            }
            fill_fourier(&mut x, i, layout.weekly.start, day, WEEK_DAYS, self.weekly_order());
            fill_fourier(&mut x, i, layout.yearly.start, day, YEAR_DAYS, self.yearly_order());
        }
        x
    }

    fn penalty(&self, ncols: usize) -> Array1<f64> {
        let layout = self.layout();
        let mut lambda = Array1::from_elem(ncols, 1.0 / self.options.seasonality_prior_scale.powi(2));
        let base = 1.0 / BASE_TREND_PRIOR_SCALE.powi(2);
        lambda[0] = base;
        lambda[1] = base;
        for c in layout.hinges {
            lambda[c] = 1.0 / self.options.changepoint_prior_scale.powi(2);
        }
        lambda
    }

    fn weekly_order(&self) -> usize {
        if self.weekly { self.options.weekly_order } else { 0 }
    }

    fn yearly_order(&self) -> usize {
        if self.yearly { self.options.yearly_order } else { 0 }
    }
}

impl OrderPredictor for AdditiveModel {
    fn name(&self) -> &str {
        "additive"
    }

    fn predict(&self, dates: &[NaiveDate]) -> ForecastResult<Vec<f64>> {
        Ok(self.components(dates)?.into_iter().map(|r| r.yhat).collect())
    }
}

/// Fit the additive model and return its forecast table.
pub fn fit_additive_model(
    summary: &DailyOrderSummary, options: AdditiveOptions, sink: &dyn EventSink,
) -> ForecastResult<SecondaryForecast> {
    AdditiveModel::fit(summary, options, sink)?.forecast()
}

fn epoch_days(date: NaiveDate) -> ForecastResult<f64> {
    Ok(epoch_nanos(date)? as f64 / NANOS_PER_DAY)
}

/// Hinge locations at evenly spaced history rows within the changepoint
/// range, skipping the first row.
fn changepoint_locations(scaled_times: &[f64], options: &AdditiveOptions) -> Vec<f64> {
    let hist = (scaled_times.len() as f64 * options.changepoint_range).floor() as usize;
    let n = options.n_changepoints.min(hist.saturating_sub(1));
    if n == 0 {
        return Vec::new();
    }
    let last_idx = (hist - 1) as f64;
    (1..=n)
        .map(|k| {
            let idx = (k as f64 * last_idx / n as f64).round() as usize;
            scaled_times[idx]
        })
        .collect()
}

fn fill_fourier(x: &mut Array2<f64>, row: usize, first_col: usize, day: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * std::f64::consts::PI * k as f64 * day / period;
        x[[row, first_col + 2 * (k - 1)]] = angle.sin();
        x[[row, first_col + 2 * (k - 1) + 1]] = angle.cos();
    }
}

fn solve_ridge(x: &Array2<f64>, y: &Array1<f64>, lambda: &Array1<f64>) -> ForecastResult<Array1<f64>> {
    let p = x.ncols();
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    let system = DMatrix::from_fn(p, p, |i, j| xtx[[i, j]] + if i == j { lambda[i] } else { 0.0 });
    let rhs = DVector::from_iterator(p, xty.iter().copied());
    let beta = system
        .cholesky()
        .ok_or(ForecastError::SingularDesign { columns: p })?
        .solve(&rhs);
    if beta.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::SingularDesign { columns: p });
    }
    Ok(Array1::from_iter(beta.iter().copied()))
}
