//! Nonlinear regression of the working fluorescence dataset.
//!
//! The window expansion in [`crate::window::refiner`] can interpose a refit
//! of the working dataset after every boundary change. The refit is a
//! capability: anything implementing [`NonlinearFit`] (including a plain
//! closure) can be supplied. [`LmKineticFit`] is the Levenberg-Marquardt
//! implementation.

use crate::error::Result;
use crate::summary::ProfileSummary;

/// Refit of the working dataset over the current LRE window.
///
/// Implementations rewrite the profile's working readings, update the
/// summary, and report whether the fit converged. A `false` result is not
/// fatal: the window remains structurally valid.
pub trait NonlinearFit {
    fn fit(&self, summary: &mut ProfileSummary) -> Result<bool>;
}

impl<F> NonlinearFit for F
where
    F: Fn(&mut ProfileSummary) -> Result<bool>,
{
    fn fit(&self, summary: &mut ProfileSummary) -> Result<bool> {
        self(summary)
    }
}

#[cfg(feature = "lm")]
pub use self::lm_fit::{KineticProblem, LmKineticFit};

#[cfg(feature = "lm")]
mod lm_fit {
    use ndarray::{array, Array1};
    use tracing::{debug, warn};

    use super::NonlinearFit;
    use crate::config::LreConfig;
    use crate::error::{LreError, Result};
    use crate::kinetics;
    use crate::lm::{LevenbergMarquardt, LmConfig};
    use crate::problem::Problem;
    use crate::summary::ProfileSummary;

    /// Number of fitted parameters: Emax, deltaE, Fo and Fb.
    const N_PARAMS: usize = 4;

    /// Raw readings modelled as LRE kinetics on top of a constant background.
    ///
    /// Fc(c) = Fmax / (1 + (Fmax / Fo - 1) * (E + 1)^-c) + Fb
    ///
    /// Parameters are `[Emax, deltaE, Fo, Fb]`; `E` is the overridden Emax
    /// when one is set and the fitted Emax otherwise.
    #[derive(Debug, Clone)]
    pub struct KineticProblem {
        cycles: Vec<usize>,
        raw_fc: Array1<f64>,
        emax_override: Option<f64>,
    }

    impl KineticProblem {
        /// Build a problem over the raw readings of `first..=last`.
        ///
        /// # Errors
        ///
        /// The range must hold at least as many cycles as there are parameters.
        pub fn new(
            raw_fc: &[f64],
            first: usize,
            last: usize,
            emax_override: Option<f64>,
        ) -> Result<Self> {
            if first == 0 || last > raw_fc.len() || last + 1 < first + N_PARAMS {
                return Err(LreError::InsufficientData {
                    cycles: (last + 1).saturating_sub(first),
                    required: N_PARAMS,
                });
            }
            Ok(Self {
                cycles: (first..=last).collect(),
                raw_fc: raw_fc[first - 1..last].iter().copied().collect(),
                emax_override,
            })
        }

        /// Predicted raw reading for one cycle.
        pub fn predict(&self, params: &Array1<f64>, cycle: usize) -> f64 {
            let (emax, delta_e, fo, fb) = (params[0], params[1], params[2], params[3]);
            let base = self.emax_override.unwrap_or(emax);
            kinetics::calc_prd_fc_with_emax(cycle, delta_e, emax, fo, base) + fb
        }
    }

    impl Problem for KineticProblem {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            if params.len() != N_PARAMS {
                return Err(LreError::DimensionMismatch(format!(
                    "Expected {} parameters, got {}",
                    N_PARAMS,
                    params.len()
                )));
            }
            Ok(self
                .cycles
                .iter()
                .zip(self.raw_fc.iter())
                .map(|(&c, &fc)| self.predict(params, c) - fc)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            N_PARAMS
        }

        fn residual_count(&self) -> usize {
            self.cycles.len()
        }
    }

    /// Levenberg-Marquardt refit of the working dataset.
    ///
    /// Fits `[Emax, deltaE, Fo, Fb]` to the raw readings from
    /// [`LreConfig::nr_first_cycle`] through the top of the LRE window, then
    /// replaces the working dataset with the raw readings minus the fitted
    /// background and updates the summary.
    #[derive(Debug, Clone, Default)]
    pub struct LmKineticFit {
        config: LreConfig,
        solver: LevenbergMarquardt,
    }

    impl LmKineticFit {
        pub fn new(config: LreConfig) -> Self {
            Self {
                config,
                solver: LevenbergMarquardt::new(),
            }
        }

        /// Use a specific solver configuration.
        pub fn with_lm_config(mut self, lm_config: LmConfig) -> Self {
            self.solver = LevenbergMarquardt::with_config(lm_config);
            self
        }

        /// Fitted `[Emax, deltaE, Fo, Fb]`, or `None` when the fit is unusable.
        fn solve(&self, summary: &ProfileSummary) -> Result<Option<Array1<f64>>> {
            let profile = summary.profile();
            let first = self.config.nr_first_cycle.max(1);
            let problem = KineticProblem::new(
                profile.raw_fc(),
                first,
                profile.window_end_cycle(),
                profile.emax_override,
            )?;

            let initial = array![profile.emax, profile.delta_e, profile.av_fo, profile.fb];
            if initial.iter().any(|p| !p.is_finite()) || profile.delta_e >= 0.0 {
                debug!(profile = %profile.name, "no usable starting point for nonlinear fit");
                return Ok(None);
            }

            let result = self.solver.minimize(&problem, initial)?;
            let p = &result.params;
            let plausible =
                p.iter().all(|v| v.is_finite()) && p[0] > 0.0 && p[1] < 0.0 && p[2] > 0.0;
            debug!(
                profile = %profile.name,
                success = result.success,
                plausible,
                iterations = result.iterations,
                cost = result.cost,
                "nonlinear fit finished"
            );
            Ok((result.success && plausible).then(|| result.params))
        }
    }

    impl NonlinearFit for LmKineticFit {
        fn fit(&self, summary: &mut ProfileSummary) -> Result<bool> {
            if !summary.profile().has_window {
                return Ok(false);
            }

            let fitted = match self.solve(summary) {
                Ok(fitted) => fitted,
                Err(err) => {
                    warn!(profile = %summary.profile().name, error = %err, "nonlinear fit failed");
                    None
                }
            };

            let profile = summary.profile_mut();
            match fitted {
                Some(params) => {
                    let fb = params[3];
                    let fc = profile.raw_fc().iter().map(|raw| raw - fb).collect();
                    profile.set_fc(fc)?;
                    profile.fb = fb;
                    profile.nr_succeeded = true;
                }
                None => profile.nr_succeeded = false,
            }
            summary.update()?;
            Ok(summary.profile().nr_succeeded)
        }
    }

}
