//! Adapter that exposes a user `LeastSquares` problem to `argmin`.
//!
//! The residual map `r(θ)` becomes an argmin `Operator`, its Jacobian an argmin
//! `Jacobian`, and the scalar objective `c(θ) = ½‖r(θ)‖²` with gradient `Jᵀr`
//! is exposed through `CostFunction` and `Gradient`. If the user does not
//! provide a Jacobian, we forward-difference the residual map.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    least_squares::{
        traits::LeastSquares,
        types::{Cost, Grad, Jacobian, Residuals, Theta},
        validation::{validate_jacobian, validate_residuals},
    },
};
use argmin::core::{CostFunction, Error, Gradient, Jacobian as ArgminJacobian, Operator};
use finitediff::FiniteDiff;

/// Bridges a user `LeastSquares` problem to argmin's problem traits.
///
/// - `Operator::apply` returns validated residuals `r(θ)`.
/// - `Jacobian::jacobian` returns the analytic `∂r/∂θ` or a forward
///   finite-difference approximation.
/// - `CostFunction::cost` returns `½‖r(θ)‖²`.
/// - `Gradient::gradient` returns `Jᵀr`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LeastSquares> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LeastSquares> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over a user `LeastSquares` problem and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }

    /// Number of residuals `m` for the wrapped data.
    pub fn n_obs(&self) -> usize {
        self.f.n_obs(self.data)
    }

    /// Evaluate and validate `r(θ)`.
    ///
    /// # Errors
    /// Propagates user errors and residual validation failures.
    pub fn residuals(&self, theta: &Theta) -> Result<Residuals, OptError> {
        let r = self.f.residuals(theta, self.data)?;
        validate_residuals(&r, self.n_obs())?;
        Ok(r)
    }

    /// Evaluate and validate `∂r/∂θ`.
    ///
    /// Behavior:
    /// - If the user implements `jacobian(θ, data)`, it is validated and
    ///   returned as-is.
    /// - On [`OptError::JacobianNotImplemented`], the residual map is
    ///   forward-differenced and transposed into the `m × n` layout. The FD
    ///   closure must return an array, so the first residual error is
    ///   captured in `closure_err` and `NaN`s are returned; after FD the
    ///   captured error is surfaced.
    ///
    /// # Errors
    /// - Propagates user errors other than `JacobianNotImplemented`.
    /// - Propagates residual errors raised during FD.
    /// - Returns validation errors for wrong shapes or non-finite entries.
    pub fn jacobian_checked(&self, theta: &Theta) -> Result<Jacobian, OptError> {
        let (m, n) = (self.n_obs(), theta.len());
        match self.f.jacobian(theta, self.data) {
            Ok(j) => {
                validate_jacobian(&j, m, n)?;
                Ok(j)
            }
            Err(OptError::JacobianNotImplemented) => {
                let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
                let residual_func = |theta: &Theta| -> Residuals {
                    match self.residuals(theta) {
                        Ok(r) => r,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            Residuals::from_elem(m, f64::NAN)
                        }
                    }
                };
                // finitediff lays out row j as ∂r/∂θ_j (n × m).
                let fd_jac = theta.forward_jacobian(&residual_func).reversed_axes();
                if let Some(err) = closure_err.take() {
                    return Err(err);
                }
                validate_jacobian(&fd_jac, m, n)?;
                Ok(fd_jac)
            }
            Err(e) => Err(e),
        }
    }
}

impl<'a, F: LeastSquares> Operator for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Residuals;

    fn apply(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.residuals(theta)?)
    }
}

impl<'a, F: LeastSquares> ArgminJacobian for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Jacobian = Jacobian;

    fn jacobian(&self, theta: &Self::Param) -> Result<Self::Jacobian, Error> {
        Ok(self.jacobian_checked(theta)?)
    }
}

impl<'a, F: LeastSquares> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = ½‖r(θ)‖²`.
    ///
    /// # Errors
    /// Propagates residual errors and returns `NonFiniteCost` if the sum
    /// overflows.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let r = self.residuals(theta)?;
        let cost = 0.5 * r.dot(&r);
        if !cost.is_finite() {
            return Err((OptError::NonFiniteCost { value: cost }).into());
        }
        Ok(cost)
    }
}

impl<'a, F: LeastSquares> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate `∇c(θ) = J(θ)ᵀ r(θ)`.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let r = self.residuals(theta)?;
        let j = self.jacobian_checked(theta)?;
        Ok(j.t().dot(&r))
    }
}
