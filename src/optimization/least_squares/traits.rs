//! Public API surface for nonlinear least squares.
//!
//! - [`LeastSquares`]: trait users implement for their model.
//! - [`LMOptions`] and [`Tolerances`]: configuration for the solver.
//! - [`LsqOutcome`]: normalized result returned by the high-level `minimize` API.
//!
//! Convention: we minimize the cost `c(θ) = ½‖r(θ)‖²` where `r(θ)` is the
//! residual vector returned by the user. If an analytic Jacobian is provided it
//! must be `∂r/∂θ` with shape `m × n`.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        types::{
            Cost, DEFAULT_INITIAL_DAMPING, DEFAULT_MAX_ITER, DEFAULT_TOL, FnEvalMap, Grad,
            Jacobian, Residuals, Theta,
        },
        validation::{validate_theta_hat, validate_value, verify_ftol, verify_gtol, verify_xtol},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;

/// User-implemented least-squares interface.
///
/// - `type Data`: per-model data carried into `residuals`/`jacobian`/`check`.
///
/// Required:
/// - `residuals(&Theta, &Data) -> OptResult<Residuals>`: evaluate `r(θ)`.
/// - `n_obs(&Data) -> usize`: number of residuals `m`.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `jacobian(&Theta, &Data) -> OptResult<Jacobian>`: analytic `∂r/∂θ`.
///   If not implemented, forward finite differences are used automatically.
pub trait LeastSquares {
    type Data: 'static;

    // Required methods
    fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals>;
    fn n_obs(&self, data: &Self::Data) -> usize;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn jacobian(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Jacobian> {
        Err(OptError::JacobianNotImplemented)
    }
}

/// Solver-level configuration.
///
/// Fields:
/// - `tols: Tolerances`: stopping tolerances and iteration limit.
/// - `initial_damping: f64`: `λ₀`, the starting multiplier on `diag(JᵀJ)`.
/// - `verbose: bool`: if `true`, attaches an observer (behind the `obs_slog`
///   feature) and prints progress.
///
/// Default:
/// - `tols`: `ftol = xtol = √ε`, `gtol = None`, `max_iter = 600`
/// - `initial_damping`: `1e-3`
/// - `verbose`: `false`
#[derive(Debug, Clone, PartialEq)]
pub struct LMOptions {
    pub tols: Tolerances,
    pub initial_damping: f64,
    pub verbose: bool,
}

impl LMOptions {
    /// Create a new set of solver options.
    ///
    /// # Errors
    /// - [`OptError::InvalidDamping`] if `initial_damping` is non-finite or ≤ 0.
    pub fn new(tols: Tolerances, initial_damping: f64, verbose: bool) -> OptResult<Self> {
        if !initial_damping.is_finite() || initial_damping <= 0.0 {
            return Err(OptError::InvalidDamping {
                value: initial_damping,
                reason: "Initial damping must be finite and positive.",
            });
        }
        Ok(Self { tols, initial_damping, verbose })
    }
}

impl Default for LMOptions {
    fn default() -> Self {
        Self { tols: Tolerances::default(), initial_damping: DEFAULT_INITIAL_DAMPING, verbose: false }
    }
}

/// Stopping tolerances and iteration limit used by the solver.
///
/// - `ftol`: converged when both the actual and predicted relative cost
///   reductions of an accepted step fall below this threshold.
/// - `xtol`: converged when `‖δ‖ ≤ xtol · (‖θ‖ + xtol)`.
/// - `gtol`: converged when `max |Jᵀr| ≤ gtol`.
/// - `max_iter`: hard cap on the number of iterations; hitting it is **not**
///   convergence.
///
/// At least one of `ftol`, `xtol`, `gtol` must be provided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub ftol: Option<f64>,
    pub xtol: Option<f64>,
    pub gtol: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if `ftol`, `xtol` and `gtol` are all `None`.
    /// - [`OptError::InvalidFtol`] / [`OptError::InvalidXtol`] / [`OptError::InvalidGtol`]
    ///   for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        ftol: Option<f64>, xtol: Option<f64>, gtol: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if ftol.is_none() && xtol.is_none() && gtol.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_ftol(ftol)?;
        verify_xtol(xtol)?;
        verify_gtol(gtol)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { ftol, xtol, gtol, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            ftol: Some(DEFAULT_TOL),
            xtol: Some(DEFAULT_TOL),
            gtol: None,
            max_iter: Some(DEFAULT_MAX_ITER),
        }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `cost`: best cost `½‖r(θ̂)‖²`.
/// - `converged`: `true` only if the solver's own convergence test fired;
///   iteration-budget exhaustion and solver exits are **not** convergence.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of solver iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available cost gradient, if present.
/// - `residuals` / `jacobian`: evaluated at `theta_hat`.
#[derive(Debug, Clone, PartialEq)]
pub struct LsqOutcome {
    pub theta_hat: Theta,
    pub cost: Cost,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub residuals: Residuals,
    pub jacobian: Jacobian,
}

impl LsqOutcome {
    /// Build a validated [`LsqOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `cost`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theta_hat_opt: Option<Theta>, cost: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>, residuals: Residuals, jacobian: Jacobian,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(cost)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        );
        let status = match termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            cost,
            converged,
            status,
            iterations,
            fn_evals,
            grad_norm,
            residuals,
            jacobian,
        })
    }
}
