//! High-level entry point for minimizing a user-provided `LeastSquares` problem.
//!
//! Wraps the model in an `ArgMinAdapter`, builds a Levenberg–Marquardt solver
//! from the options, and delegates the run to `run_levenberg_marquardt`.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        LsqOutcome, Theta,
        adapter::ArgMinAdapter,
        run::run_levenberg_marquardt,
        solver::LevenbergMarquardt,
        traits::{LMOptions, LeastSquares},
    },
};

/// Minimize `½‖r(θ)‖²` with Levenberg–Marquardt.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - Rejects problems with fewer residuals than parameters.
/// - Runs the solver and returns the outcome whether or not the convergence
///   test fired; callers inspect [`LsqOutcome::converged`].
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - [`OptError::InsufficientObservations`] when `m < n`.
/// - Propagates runtime errors from `run_levenberg_marquardt`.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use order_forecast::optimization::errors::OptResult;
/// use order_forecast::optimization::least_squares::{
///     minimize, LMOptions, LeastSquares, Residuals, Theta,
/// };
///
/// struct Offset;
/// impl LeastSquares for Offset {
///     type Data = Vec<f64>;
///     fn residuals(&self, theta: &Theta, y: &Vec<f64>) -> OptResult<Residuals> {
///         Ok(y.iter().map(|v| theta[0] - v).collect())
///     }
///     fn n_obs(&self, y: &Vec<f64>) -> usize {
///         y.len()
///     }
///     fn check(&self, _: &Theta, _: &Vec<f64>) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = minimize(&Offset, array![0.0], &vec![1.0, 2.0, 3.0], &LMOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), order_forecast::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: LeastSquares>(
    f: &F, theta0: Theta, data: &F::Data, opts: &LMOptions,
) -> OptResult<LsqOutcome> {
    f.check(&theta0, data)?;
    let (m, n) = (f.n_obs(data), theta0.len());
    if m < n {
        return Err(OptError::InsufficientObservations { needed: n, found: m });
    }
    let problem = ArgMinAdapter::new(f, data);
    let solver = LevenbergMarquardt::new(opts);
    run_levenberg_marquardt(theta0, opts, problem, solver)
}
