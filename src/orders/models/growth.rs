//! models::growth: exponential growth curve for daily order counts.
//!
//! Purpose
//! -------
//! Fit `f(t) = a · exp(b · (t − 1.6095))` to daily order counts, where `t` is
//! nanoseconds since the Unix epoch divided by `10^18`, and expose the fitted
//! curve as an [`OrderPredictor`].
//!
//! Key behaviors
//! -------------
//! - [`GrowthCurve`] implements [`LeastSquares`] with residuals
//!   `f(t_i) − y_i` and the analytic Jacobian
//!   `∂r/∂a = e^{b·s}`, `∂r/∂b = a·s·e^{b·s}` with `s = t − 1.6095`.
//! - [`fit_growth_model`] runs Levenberg–Marquardt from the configured
//!   initial guess, emits start/end events, and attaches the curve-fit
//!   covariance `s²·(JᵀJ)⁺` when there are more dates than parameters.
//! - A fit that stops for any reason other than the solver's convergence
//!   test is an error; the initial guess is never returned in its place.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least two distinct dates are required.
//! - The parameter vector is always `[a, b]`.
//! - Fitting is deterministic for identical inputs.
//!
//! Conventions
//! -----------
//! - Parameters serialize as the JSON object `{"a": .., "b": ..}`.
use chrono::NaiveDate;
use ndarray::{Array1, Array2, array};
use serde::{Deserialize, Serialize};

use crate::{
    inference::covariance::{ParamCovariance, param_covariance},
    optimization::{
        errors::{OptError, OptResult},
        least_squares::{Jacobian, LeastSquares, LsqOutcome, Residuals, Theta, minimize},
    },
    orders::{
        core::{
            calendar::{CURVE_SHIFT, normalized_time},
            config::GrowthFitConfig,
            data::DailyOrderSummary,
            events::{EventSink, ForecastEvent},
        },
        errors::{ForecastError, ForecastResult},
        models::predictor::OrderPredictor,
    },
};

/// Minimum number of distinct dates a fit needs.
pub const MIN_FIT_POINTS: usize = 2;

/// Fitted `(a, b)` of the growth curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthModelParameters {
    pub a: f64,
    pub b: f64,
}

impl GrowthModelParameters {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Curve value at normalized time `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        growth_curve(t, self.a, self.b)
    }

    /// Curve value at midnight UTC of `date`.
    pub fn evaluate_date(&self, date: NaiveDate) -> ForecastResult<f64> {
        Ok(self.evaluate(normalized_time(date)?))
    }

    /// Serialize as `{"a": .., "b": ..}`.
    pub fn to_json(&self) -> ForecastResult<String> {
        serde_json::to_string(self).map_err(|e| ForecastError::MalformedConfig { text: e.to_string() })
    }

    /// Read parameters stored by [`Self::to_json`].
    pub fn from_json(text: &str) -> ForecastResult<Self> {
        serde_json::from_str(text).map_err(|e| ForecastError::MalformedConfig { text: e.to_string() })
    }

    fn from_theta(theta: &Theta) -> ForecastResult<Self> {
        match theta.as_slice() {
            Some(&[a, b]) => Ok(Self { a, b }),
            _ => Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() }.into()),
        }
    }
}

impl OrderPredictor for GrowthModelParameters {
    fn name(&self) -> &str {
        "growth"
    }

    fn predict(&self, dates: &[NaiveDate]) -> ForecastResult<Vec<f64>> {
        dates.iter().map(|&d| self.evaluate_date(d)).collect()
    }
}

/// `a · exp(b · (t − CURVE_SHIFT))`.
pub fn growth_curve(t: f64, a: f64, b: f64) -> f64 {
    a * (b * (t - CURVE_SHIFT)).exp()
}

/// Observations the growth curve is fitted to.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthData {
    /// Normalized times.
    pub times: Array1<f64>,
    /// Observed order counts.
    pub counts: Array1<f64>,
}

impl GrowthData {
    pub fn from_summary(summary: &DailyOrderSummary) -> ForecastResult<Self> {
        Ok(Self { times: summary.normalized_times()?, counts: summary.counts() })
    }
}

/// Least-squares problem for the two-parameter growth curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthCurve;

impl LeastSquares for GrowthCurve {
    type Data = GrowthData;

    fn residuals(&self, theta: &Theta, data: &GrowthData) -> OptResult<Residuals> {
        let (a, b) = (theta[0], theta[1]);
        Ok(data
            .times
            .iter()
            .zip(data.counts.iter())
            .map(|(&t, &y)| growth_curve(t, a, b) - y)
            .collect())
    }

    fn n_obs(&self, data: &GrowthData) -> usize {
        data.times.len()
    }

    fn check(&self, theta: &Theta, data: &GrowthData) -> OptResult<()> {
        if theta.len() != 2 {
            return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
        }
        if data.counts.len() != data.times.len() {
            return Err(OptError::ResidualDimMismatch {
                expected: data.times.len(),
                found: data.counts.len(),
            });
        }
        Ok(())
    }

    fn jacobian(&self, theta: &Theta, data: &GrowthData) -> OptResult<Jacobian> {
        let (a, b) = (theta[0], theta[1]);
        let mut jac = Array2::zeros((data.times.len(), 2));
        for (i, &t) in data.times.iter().enumerate() {
            let s = t - CURVE_SHIFT;
            let e = (b * s).exp();
            jac[[i, 0]] = e;
            jac[[i, 1]] = a * s * e;
        }
        Ok(jac)
    }
}

/// Result of a converged growth-curve fit.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthFit {
    pub params: GrowthModelParameters,
    pub outcome: LsqOutcome,
    /// `None` when there are no residual degrees of freedom.
    pub covariance: Option<ParamCovariance>,
}

/// fit_growth_model: fit the growth curve to a daily order summary.
///
/// Parameters
/// ----------
/// - `summary`: `&DailyOrderSummary`
///   Historical daily counts; at least two distinct dates.
/// - `config`: `&GrowthFitConfig`
///   Initial guess `(a_init, b_init)` and solver options.
/// - `sink`: `&dyn EventSink`
///   Receives "Starting with" before and "Ended with" after the fit.
///
/// Returns
/// -------
/// `ForecastResult<GrowthFit>`
///   Fitted parameters, the solver outcome and the parameter covariance.
///
/// Errors
/// ------
/// - [`ForecastError::InsufficientData`] for fewer than two dates.
/// - [`ForecastError::Convergence`] if the solver stops without converging.
/// - [`ForecastError::TimestampOutOfRange`] for unrepresentable dates.
/// - [`ForecastError::Optimization`] for other numerical failures.
pub fn fit_growth_model(
    summary: &DailyOrderSummary, config: &GrowthFitConfig, sink: &dyn EventSink,
) -> ForecastResult<GrowthFit> {
    if summary.len() < MIN_FIT_POINTS {
        return Err(ForecastError::InsufficientData { needed: MIN_FIT_POINTS, found: summary.len() });
    }
    let data = GrowthData::from_summary(summary)?;
    sink.emit(ForecastEvent::FitStarted { a_init: config.a_init, b_init: config.b_init });

    let theta0 = array![config.a_init, config.b_init];
    let outcome = minimize(&GrowthCurve, theta0, &data, &config.lm_opts)?;
    if !outcome.converged {
        return Err(ForecastError::Convergence {
            status: outcome.status.clone(),
            iterations: outcome.iterations,
        });
    }
    let params = GrowthModelParameters::from_theta(&outcome.theta_hat)?;
    let covariance = param_covariance(&outcome.jacobian, &outcome.residuals)?;
    sink.emit(ForecastEvent::FitEnded { a: params.a, b: params.b });

    Ok(GrowthFit { params, outcome, covariance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::least_squares::{LMOptions, Tolerances},
        orders::core::events::MemorySink,
    };
    use approx::assert_relative_eq;
    use chrono::Days;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Curve evaluation and the analytic Jacobian.
    // - Parameter recovery from exact synthetic data.
    // - Error paths: insufficient data and non-convergence.
    // - Events emitted around a fit.
    // -------------------------------------------------------------------------

    fn synthetic(params: GrowthModelParameters, start: NaiveDate, days: u64) -> DailyOrderSummary {
        let pairs = (0..days).map(|i| {
            let d = start + Days::new(i);
            (d, params.evaluate_date(d).unwrap().round() as u64)
        });
        DailyOrderSummary::from_pairs(pairs).unwrap()
    }

    fn exact_data(params: GrowthModelParameters, start: NaiveDate, days: u64) -> GrowthData {
        let times: Array1<f64> =
            (0..days).map(|i| normalized_time(start + Days::new(i)).unwrap()).collect();
        let counts = times.mapv(|t| params.evaluate(t));
        GrowthData { times, counts }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn curve_equals_a_at_the_shift() {
        let p = GrowthModelParameters::new(250.0, 7.0);

        assert_relative_eq!(p.evaluate(CURVE_SHIFT), 250.0);
        assert_relative_eq!(p.evaluate(CURVE_SHIFT + 0.1), 250.0 * 0.7_f64.exp(), epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // The analytic Jacobian agrees with central differences of the residuals.
    //
    // Given
    // -----
    // - Ten days of data in 2023 and θ = (120, 4).
    //
    // Expect
    // ------
    // - Each entry matches to 1e-6 relative.
    fn analytic_jacobian_matches_finite_differences() {
        let data = exact_data(GrowthModelParameters::new(100.0, 5.0), day(2023, 1, 1), 10);
        let theta = array![120.0, 4.0];
        let jac = GrowthCurve.jacobian(&theta, &data).unwrap();

        for k in 0..2 {
            let h = 1e-6 * theta[k];
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[k] += h;
            down[k] -= h;
            let r_up = GrowthCurve.residuals(&up, &data).unwrap();
            let r_down = GrowthCurve.residuals(&down, &data).unwrap();
            for i in 0..10 {
                let fd = (r_up[i] - r_down[i]) / (2.0 * h);
                assert_relative_eq!(jac[[i, k]], fd, max_relative = 1e-6);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Exact synthetic data recovers the generating parameters.
    //
    // Given
    // -----
    // - 120 days of noiseless counts from a = 100, b = 5.
    // - Initial guess a = 80, b = 3.
    //
    // Expect
    // ------
    // - Converged fit within 1e-3 relative of (100, 5).
    fn fit_recovers_parameters_from_exact_data() {
        let truth = GrowthModelParameters::new(100.0, 5.0);
        let data = exact_data(truth, day(2023, 1, 1), 120);
        let cfg = GrowthFitConfig::new(80.0, 3.0).unwrap();

        let outcome = minimize(&GrowthCurve, array![80.0, 3.0], &data, &cfg.lm_opts).unwrap();

        assert!(outcome.converged, "status: {}", outcome.status);
        assert_relative_eq!(outcome.theta_hat[0], 100.0, max_relative = 1e-3);
        assert_relative_eq!(outcome.theta_hat[1], 5.0, max_relative = 1e-3);
    }

    #[test]
    fn fit_reports_events_and_covariance() {
        let summary = synthetic(GrowthModelParameters::new(1000.0, 6.0), day(2022, 6, 1), 200);
        let cfg = GrowthFitConfig::new(900.0, 5.0).unwrap();
        let sink = MemorySink::new();

        let fit = fit_growth_model(&summary, &cfg, &sink).unwrap();

        assert_relative_eq!(fit.params.a, 1000.0, max_relative = 1e-2);
        assert_relative_eq!(fit.params.b, 6.0, max_relative = 1e-2);
        let cov = fit.covariance.expect("200 points leave residual degrees of freedom");
        assert_eq!(cov.matrix.dim(), (2, 2));
        assert!(cov.std_errors.iter().all(|s| s.is_finite() && *s >= 0.0));

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Starting with: 900 and 5");
        assert!(messages[1].starts_with("Ended with: "));
    }

    #[test]
    // Purpose
    // -------
    // Zero or one rows cannot be fitted; two rows can be attempted.
    //
    // Given
    // -----
    // - Empty and single-row summaries.
    //
    // Expect
    // ------
    // - `InsufficientData` with `needed = 2`, and no events.
    fn fit_requires_two_dates() {
        let cfg = GrowthFitConfig::new(1.0, 1.0).unwrap();
        let sink = MemorySink::new();
        let empty = DailyOrderSummary::default();
        let single = DailyOrderSummary::from_pairs([(day(2023, 1, 1), 5)]).unwrap();

        assert_eq!(
            fit_growth_model(&empty, &cfg, &sink).unwrap_err(),
            ForecastError::InsufficientData { needed: 2, found: 0 }
        );
        assert_eq!(
            fit_growth_model(&single, &cfg, &sink).unwrap_err(),
            ForecastError::InsufficientData { needed: 2, found: 1 }
        );
        assert!(sink.events().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Exhausting the iteration budget is a convergence error, not a result.
    //
    // Given
    // -----
    // - A single allowed iteration from a distant initial guess.
    //
    // Expect
    // ------
    // - `ForecastError::Convergence` and no "Ended with" event.
    fn iteration_budget_exhaustion_is_convergence_error() {
        let summary = synthetic(GrowthModelParameters::new(100.0, 5.0), day(2023, 1, 1), 60);
        let tols = Tolerances::new(Some(1e-12), Some(1e-12), None, Some(1)).unwrap();
        let cfg = GrowthFitConfig::new(1.0, -3.0)
            .unwrap()
            .with_lm_options(LMOptions::new(tols, 1e-3, false).unwrap());
        let sink = MemorySink::new();

        let err = fit_growth_model(&summary, &cfg, &sink).unwrap_err();

        assert!(matches!(err, ForecastError::Convergence { .. }), "got {err:?}");
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let p = GrowthModelParameters::new(12.5, -0.25);
        let text = p.to_json().unwrap();

        assert_eq!(text, r#"{"a":12.5,"b":-0.25}"#);
        assert_eq!(GrowthModelParameters::from_json(&text).unwrap(), p);
    }
}
