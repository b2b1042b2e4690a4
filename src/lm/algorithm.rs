//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration solves the damped normal equations
//!
//! (JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr
//!
//! accepting the step when it lowers the cost and otherwise raising λ. The
//! diagonal (Marquardt) scaling keeps the step invariant to parameter scale.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use std::fmt;
use tracing::trace;

use crate::error::{LreError, Result};
use crate::problem::Problem;

use super::config::LmConfig;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations, excluding Jacobian evaluations
    pub func_evals: usize,

    /// Whether a convergence criterion was met
    pub success: bool,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The solver configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Minimize the sum of squared residuals of `problem`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial guess has the wrong length or the
    /// problem cannot be evaluated at it. Failing to converge is not an
    /// error; it is reported through [`LmResult::success`].
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(LreError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        if !cost.is_finite() {
            return Err(LreError::FunctionEvaluation(
                "non-finite residuals at the initial guess".to_string(),
            ));
        }

        let mut lambda = self.config.initial_lambda;
        let mut func_evals = 1;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            let jac = problem.jacobian(&params)?;
            let j = DMatrix::from_fn(jac.nrows(), jac.ncols(), |r, c| jac[[r, c]]);
            let r = DVector::from_iterator(residuals.len(), residuals.iter().copied());

            let jtj = j.transpose() * &j;
            let gradient = j.transpose() * &r;

            let gradient_norm = gradient.amax();
            if gradient_norm < self.config.gtol {
                let message = format!(
                    "Gradient convergence: ||g|| = {:.2e} < {:.2e}",
                    gradient_norm, self.config.gtol
                );
                return finish(params, residuals, cost, iterations, func_evals, true, message);
            }

            // Raise lambda until a step lowers the cost
            loop {
                let step = match solve_damped(&jtj, &gradient, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda > self.config.max_lambda {
                            return Err(LreError::SingularMatrix);
                        }
                        continue;
                    }
                };

                let step = Array1::from_iter(step.iter().copied());
                let candidate = &params + &step;
                let candidate_residuals = problem.eval(&candidate)?;
                func_evals += 1;
                let candidate_cost = sum_of_squares(&candidate_residuals);

                let param_scale = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                let step_norm = step.iter().map(|s| s * s).sum::<f64>().sqrt();
                let negligible_step = step_norm <= self.config.xtol * (param_scale + self.config.xtol);

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let cost_change = (cost - candidate_cost) / cost.max(f64::MIN_POSITIVE);

                    params = candidate;
                    residuals = candidate_residuals;
                    cost = candidate_cost;
                    iterations += 1;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    trace!(iterations, cost, lambda, "LM step accepted");

                    if negligible_step {
                        let message = format!(
                            "Parameter convergence: |dx| = {:.2e} <= {:.2e}",
                            step_norm,
                            self.config.xtol * param_scale
                        );
                        return finish(params, residuals, cost, iterations, func_evals, true, message);
                    }
                    if cost_change <= self.config.ftol {
                        let message = format!(
                            "Cost convergence: |df|/|f| = {:.2e} <= {:.2e}",
                            cost_change, self.config.ftol
                        );
                        return finish(params, residuals, cost, iterations, func_evals, true, message);
                    }
                    if cost == 0.0 {
                        let message = "Exact fit".to_string();
                        return finish(params, residuals, cost, iterations, func_evals, true, message);
                    }
                    break;
                }

                // Steps have shrunk below resolution without lowering the cost
                if negligible_step {
                    let message = format!("Parameter convergence: |dx| = {:.2e}", step_norm);
                    return finish(params, residuals, cost, iterations, func_evals, true, message);
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    let message = "Failed to decrease cost, and lambda reached maximum".to_string();
                    return finish(params, residuals, cost, iterations, func_evals, false, message);
                }
            }
        }

        let message = format!(
            "Maximum iterations ({}) reached",
            self.config.max_iterations
        );
        finish(params, residuals, cost, iterations, func_evals, false, message)
    }
}

fn finish(
    params: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
    iterations: usize,
    func_evals: usize,
    success: bool,
    message: String,
) -> Result<LmResult> {
    Ok(LmResult {
        params,
        residuals,
        cost,
        iterations,
        func_evals,
        success,
        message,
    })
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Solve (JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr.
fn solve_damped(jtj: &DMatrix<f64>, gradient: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut damped = jtj.clone();
    for i in 0..damped.nrows() {
        damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
    }
    let rhs = gradient.map(|g| -g);

    let step = match damped.clone().cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => damped.lu().solve(&rhs)?,
    };
    step.iter().all(|s| s.is_finite()).then_some(step)
}
