//! least_squares::solver: Levenberg–Marquardt as an argmin `Solver`.
//!
//! Purpose
//! -------
//! Provide a damped Gauss–Newton (Levenberg–Marquardt) solver that plugs into
//! argmin's `Executor`, so iteration counting, function-evaluation counters,
//! best-parameter tracking and observers come from the same machinery as the
//! rest of the optimization layer.
//!
//! Key behaviors
//! -------------
//! - Each iteration evaluates `r(θ)` and `J(θ)`, forms `A = JᵀJ`, `g = Jᵀr`,
//!   and solves `(A + λ·diag(A)) δ = −g` by Cholesky (`nalgebra`).
//! - A trial step is accepted when the actual cost reduction is positive;
//!   `λ` then shrinks by Nielsen's rule `max(1/3, 1 − (2ρ − 1)³)`. Rejected
//!   trials grow `λ` by a doubling factor `ν`.
//! - Convergence (`TerminationReason::SolverConverged`) fires when one of the
//!   configured tests holds:
//!   - `ftol`: actual and predicted relative reductions ≤ `ftol` with `ρ ≤ 2`,
//!   - `xtol`: `‖δ‖ ≤ xtol · (‖θ‖ + xtol)`,
//!   - `gtol`: `max |g| ≤ gtol`,
//!   - or the residuals vanish exactly.
//! - If no trial step within the inner budget reduces the cost and the last
//!   trial step is not below `xtol`, the solver exits with
//!   `TerminationReason::SolverExit`, which callers treat as non-convergence.
//!
//! Invariants & assumptions
//! ------------------------
//! - The state carries the current parameter vector; the solver never returns
//!   a parameter with a higher cost than the one it started the iteration with.
//! - `diag(A)` entries are floored at [`DIAG_FLOOR`] so that a parameter with
//!   a vanishing Jacobian column still yields a positive definite system.
use crate::optimization::{
    errors::OptError,
    least_squares::{
        adapter::ArgMinAdapter,
        traits::{LMOptions, LeastSquares},
        types::{Grad, Information, Theta},
    },
};
use argmin::core::{
    Error, IterState, KV, Problem, Solver, State, TerminationReason, TerminationStatus,
};
use argmin_math::ArgminL2Norm;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Smallest value used for a diagonal scaling entry of `JᵀJ`.
pub const DIAG_FLOOR: f64 = 1e-30;

/// Maximum number of damping increases tried within one iteration.
pub const MAX_INNER_TRIALS: usize = 32;

/// State type shared by the solver and the runner.
pub type LmState = IterState<Theta, Grad, (), (), (), f64>;

/// Summary of the most recent iteration, consulted by `terminate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StepReport {
    accepted: bool,
    cost: f64,
    actual_rel: f64,
    predicted_rel: f64,
    ratio: f64,
    step_norm: f64,
    param_norm: f64,
    grad_inf: f64,
}

/// Levenberg–Marquardt solver configured from [`LMOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevenbergMarquardt {
    ftol: Option<f64>,
    xtol: Option<f64>,
    gtol: Option<f64>,
    damping: f64,
    nu: f64,
    last: Option<StepReport>,
}

impl LevenbergMarquardt {
    /// Build a solver from validated options.
    ///
    /// Tolerances and the initial damping have already been validated by
    /// [`LMOptions::new`] / `Tolerances::new`, so construction cannot fail.
    pub fn new(opts: &LMOptions) -> Self {
        Self {
            ftol: opts.tols.ftol,
            xtol: opts.tols.xtol,
            gtol: opts.tols.gtol,
            damping: opts.initial_damping,
            nu: 2.0,
            last: None,
        }
    }

    /// Current damping factor `λ`.
    pub fn damping(&self) -> f64 {
        self.damping
    }

    fn grow_damping(&mut self) {
        self.damping *= self.nu;
        self.nu *= 2.0;
    }

    fn shrink_damping(&mut self, ratio: f64) {
        let factor = 1.0 - (2.0 * ratio - 1.0).powi(3);
        self.damping *= factor.max(1.0 / 3.0);
        self.nu = 2.0;
    }

    fn small_step(&self, step_norm: f64, param_norm: f64) -> bool {
        self.xtol.is_some_and(|xtol| step_norm <= xtol * (param_norm + xtol))
    }
}

/// Solve `(A + λ·diag(A)) δ = −g` via Cholesky.
///
/// Returns `None` if the damped matrix is not numerically positive definite.
pub fn solve_damped(a: &Information, g: &Grad, damping: f64) -> Option<Theta> {
    let n = g.len();
    let damped = DMatrix::from_fn(n, n, |i, j| {
        if i == j { a[[i, i]] + damping * a[[i, i]].max(DIAG_FLOOR) } else { a[[i, j]] }
    });
    let rhs = DVector::from_iterator(n, g.iter().map(|v| -v));
    let delta = damped.cholesky()?.solve(&rhs);
    if delta.iter().all(|v| v.is_finite()) {
        Some(Array1::from_iter(delta.iter().copied()))
    } else {
        None
    }
}

impl<'a, F: LeastSquares> Solver<ArgMinAdapter<'a, F>, LmState> for LevenbergMarquardt {
    const NAME: &'static str = "Levenberg-Marquardt";

    fn init(
        &mut self, problem: &mut Problem<ArgMinAdapter<'a, F>>, state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.get_param().cloned().ok_or(OptError::MissingInitialGuess)?;
        let cost = problem.cost(&theta)?;
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<ArgMinAdapter<'a, F>>, state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.get_param().cloned().ok_or(OptError::MissingInitialGuess)?;
        let r = problem.apply(&theta)?;
        let j = problem.jacobian(&theta)?;
        let cost = 0.5 * r.dot(&r);
        let a = j.t().dot(&j);
        let g = j.t().dot(&r);
        let grad_inf = g.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let param_norm = theta.l2_norm();

        let mut report = StepReport {
            accepted: false,
            cost,
            actual_rel: 0.0,
            predicted_rel: 0.0,
            ratio: 0.0,
            step_norm: f64::INFINITY,
            param_norm,
            grad_inf,
        };
        if cost == 0.0 || self.gtol.is_some_and(|gtol| grad_inf <= gtol) {
            self.last = Some(report);
            return Ok((state.cost(cost).gradient(g), None));
        }

        for _ in 0..MAX_INNER_TRIALS {
            let Some(delta) = solve_damped(&a, &g, self.damping) else {
                self.grow_damping();
                continue;
            };
            report.step_norm = delta.l2_norm();
            let candidate = &theta + &delta;
            let trial_cost = match problem.cost(&candidate) {
                Ok(c) if c.is_finite() => c,
                _ => {
                    self.grow_damping();
                    continue;
                }
            };
            let predicted = -(delta.dot(&g) + 0.5 * delta.dot(&a.dot(&delta)));
            let actual = cost - trial_cost;
            let ratio = if predicted > 0.0 { actual / predicted } else { -1.0 };
            if actual > 0.0 && ratio > 0.0 {
                self.shrink_damping(ratio);
                report.accepted = true;
                report.actual_rel = actual / cost;
                report.predicted_rel = predicted / cost;
                report.ratio = ratio;
                self.last = Some(report);
                return Ok((state.param(candidate).cost(trial_cost).gradient(g), None));
            }
            self.grow_damping();
        }

        self.last = Some(report);
        Ok((state.cost(cost).gradient(g), None))
    }

    fn terminate(&mut self, _state: &LmState) -> TerminationStatus {
        let Some(step) = self.last else {
            return TerminationStatus::NotTerminated;
        };
        let converged = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        if step.cost == 0.0 || self.gtol.is_some_and(|gtol| step.grad_inf <= gtol) {
            return converged;
        }
        if step.accepted {
            if let Some(ftol) = self.ftol {
                if step.actual_rel.abs() <= ftol && step.predicted_rel <= ftol && step.ratio <= 2.0
                {
                    return converged;
                }
            }
            if self.small_step(step.step_norm, step.param_norm) {
                return converged;
            }
            return TerminationStatus::NotTerminated;
        }
        if self.small_step(step.step_norm, step.param_norm) {
            return converged;
        }
        TerminationStatus::Terminated(TerminationReason::SolverExit(
            "no damped step reduces the cost".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{errors::OptResult, least_squares::types::Residuals};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The damped linear solve on a small SPD system.
    // - Damping updates after accepted and rejected trials.
    // - Wiring of options into the solver.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Without damping the solve reduces to the Gauss–Newton step `−A⁻¹g`.
    //
    // Given
    // -----
    // - `A = diag(2, 4)`, `g = (2, 8)`, `λ = 0`.
    //
    // Expect
    // ------
    // - `δ = (−1, −2)`.
    fn undamped_solve_is_gauss_newton_step() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let g = array![2.0, 8.0];

        let delta = solve_damped(&a, &g, 0.0).unwrap();

        assert_relative_eq!(delta[0], -1.0);
        assert_relative_eq!(delta[1], -2.0);
    }

    #[test]
    // Purpose
    // -------
    // Damping scales the diagonal, shrinking the step.
    //
    // Given
    // -----
    // - `A = diag(2, 4)`, `g = (2, 8)`, `λ = 1` so the system is `diag(4, 8)`.
    //
    // Expect
    // ------
    // - `δ = (−0.5, −1)`.
    fn damping_scales_the_diagonal() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let g = array![2.0, 8.0];

        let delta = solve_damped(&a, &g, 1.0).unwrap();

        assert_relative_eq!(delta[0], -0.5);
        assert_relative_eq!(delta[1], -1.0);
    }

    #[test]
    fn indefinite_system_is_rejected() {
        let a = array![[-1.0, 0.0], [0.0, -1.0]];
        let g = array![1.0, 1.0];

        assert!(solve_damped(&a, &g, 0.0).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Rejections double `ν`; a perfect acceptance (`ρ = 1`) shrinks `λ` by 3
    // and resets `ν`.
    fn damping_update_rules() {
        let mut solver = LevenbergMarquardt::new(&LMOptions::default());
        let lambda0 = solver.damping();

        solver.grow_damping();
        solver.grow_damping();
        assert_relative_eq!(solver.damping(), lambda0 * 2.0 * 4.0);

        solver.shrink_damping(1.0);
        assert_relative_eq!(solver.damping(), lambda0 * 8.0 / 3.0);
        assert_relative_eq!(solver.nu, 2.0);
    }

    #[test]
    fn terminate_waits_for_the_first_iteration() {
        let mut solver = LevenbergMarquardt::new(&LMOptions::default());
        let state = LmState::new();

        assert_eq!(
            <LevenbergMarquardt as Solver<ArgMinAdapter<'_, NeverCalled>, LmState>>::terminate(
                &mut solver,
                &state
            ),
            TerminationStatus::NotTerminated
        );
    }

    struct NeverCalled;

    impl LeastSquares for NeverCalled {
        type Data = ();

        fn residuals(&self, _theta: &Theta, _data: &()) -> OptResult<Residuals> {
            Err(OptError::UnknownError)
        }

        fn n_obs(&self, _data: &()) -> usize {
            0
        }

        fn check(&self, _theta: &Theta, _data: &()) -> OptResult<()> {
            Ok(())
        }
    }
}
