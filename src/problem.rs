//! Least-squares problem definition.
//!
//! A [`Problem`] exposes the residual vector of a model at a parameter vector.
//! The Levenberg-Marquardt solver in [`crate::lm`] minimizes the sum of its
//! squared residuals.

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::utils::finite_difference;

/// A nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals (model minus data) at the given parameters.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Number of parameters.
    fn parameter_count(&self) -> usize;

    /// Number of residuals.
    fn residual_count(&self) -> usize;

    /// Jacobian of the residuals with respect to the parameters.
    ///
    /// Defaults to central finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        finite_difference::jacobian(self, params, None)
    }

    /// Sum of squared residuals.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}
