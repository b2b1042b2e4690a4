//! Finite difference approximation of Jacobians.

use crate::error::{LreError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step size for central differences.
const DEFAULT_EPSILON: f64 = 1e-6;

/// Compute the Jacobian matrix using central finite differences.
///
/// J[i,j] = ∂residual[i]/∂param[j], with a step scaled to the magnitude of
/// each parameter so that kinetic parameters of very different size (Emax
/// near 1, deltaE near 1e-3, Fo near 1e-4) are all perturbed sensibly.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `epsilon` - The relative step size (optional)
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let step = if params[j].abs() > eps {
            params[j].abs() * eps
        } else {
            eps
        };

        let mut forward = params.clone();
        forward[j] += step;
        let mut backward = params.clone();
        backward[j] -= step;

        let r_forward = problem.eval(&forward)?;
        let r_backward = problem.eval(&backward)?;
        if r_forward.len() != n_residuals || r_backward.len() != n_residuals {
            return Err(LreError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                n_residuals,
                r_forward.len()
            )));
        }

        for i in 0..n_residuals {
            jac[[i, j]] = (r_forward[i] - r_backward[i]) / (2.0 * step);
        }
    }

    Ok(jac)
}
