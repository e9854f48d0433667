//! Execution helper that runs the Levenberg–Marquardt solver on a
//! least-squares problem and returns a crate-friendly [`LsqOutcome`].
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        LMOptions, LeastSquares, LsqOutcome, Theta, adapter::ArgMinAdapter,
        solver::LevenbergMarquardt,
    },
};
use argmin::core::{Executor, State};

/// Run a Levenberg–Marquardt optimization for a least-squares problem.
///
/// This wires up:
/// - the user model via [`ArgMinAdapter`],
/// - the configured [`LevenbergMarquardt`] solver,
/// - initial parameter `theta0`,
/// - optional observers (behind the `obs_slog` feature),
/// - optional `max_iters`,
///   then executes the solver and converts the result into [`LsqOutcome`],
///   re-evaluating residuals and the Jacobian at the best parameters.
///
/// # Errors
/// - Propagates any `argmin` runtime error (observer failures, residual or
///   Jacobian failures at the starting point, etc.) via the crate's
///   `From<argmin::core::Error>` conversion.
/// - Propagates validation errors encountered when constructing
///   [`LsqOutcome`].
pub fn run_levenberg_marquardt<'a, F>(
    theta0: Theta, opts: &LMOptions, problem: ArgMinAdapter<'a, F>, solver: LevenbergMarquardt,
) -> OptResult<LsqOutcome>
where
    F: LeastSquares,
{
    let evaluator = ArgMinAdapter::new(problem.f, problem.data);
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &evaluator)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let best_cost = result.get_best_cost();
    let theta_hat = result.take_best_param();
    let (residuals, jacobian) = match theta_hat.as_ref() {
        Some(theta) => (evaluator.residuals(theta)?, evaluator.jacobian_checked(theta)?),
        None => (Default::default(), Default::default()),
    };
    let grad = theta_hat.as_ref().map(|_| jacobian.t().dot(&residuals));
    LsqOutcome::new(
        theta_hat,
        best_cost,
        termination,
        iterations,
        function_counts,
        grad,
        residuals,
        jacobian,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LeastSquares,
{
    use argmin::core::{CostFunction, Gradient};
    use argmin_math::ArgminL2Norm;

    let c0 = problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());

    eprintln!(
        "init: cost(theta0) = {:.6}{}",
        c0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
