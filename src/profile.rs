//! Amplification profiles and replicate averages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LreError, Result};
use crate::kinetics;

/// Smallest LRE window, in cycles.
pub const MIN_WINDOW_SIZE: usize = 3;

/// An amplification profile and its LRE analysis state.
///
/// Window boundaries and the derived kinetic parameters are written by the
/// window selection operations and by
/// [`crate::summary::ProfileSummary::update`]. Fmax and C1/2 are only
/// meaningful while `has_window` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Identifier used in logs and persisted records
    pub name: String,

    /// Raw fluorescence readings, cycle 1 first
    raw_fc: Vec<f64>,

    /// Working (background-subtracted) readings, same length as `raw_fc`
    fc: Vec<f64>,

    /// Fluorescence background subtracted from `raw_fc`
    pub fb: f64,

    /// First cycle of the LRE window
    pub start_cycle: usize,

    /// Number of cycles in the LRE window
    pub window_size: usize,

    /// Maximal amplification efficiency (LRE plot intercept)
    pub emax: f64,

    /// Loss in cycle efficiency per fluorescence unit (LRE plot slope)
    pub delta_e: f64,

    /// r² of the LRE window regression
    pub r2: f64,

    /// Asymptotic maximal fluorescence
    pub fmax: f64,

    /// Average Fo across the LRE window
    pub av_fo: f64,

    /// Coefficient of variation of Fo across the LRE window
    pub av_fo_cv: f64,

    /// Fractional cycle at which Fc reaches Fmax / 2
    pub mid_c: f64,

    /// Nonlinear R² of predicted against observed Fc within the window
    pub nonlinear_r2: f64,

    /// Externally fixed Emax used in place of the fitted Emax
    pub emax_override: Option<f64>,

    /// Target quantity in molecules, when an optical calibration is available
    pub no: Option<f64>,

    /// Whether a valid LRE window has been identified
    pub has_window: bool,

    /// Whether the last nonlinear regression of the working dataset converged
    pub nr_succeeded: bool,

    /// Replicates summarized by this profile, when it is an average
    #[serde(skip)]
    pub replicates: Option<ReplicateSet>,
}

impl Profile {
    /// Create a profile from raw readings.
    ///
    /// The working dataset starts as a copy of the raw readings; see
    /// [`crate::window::background::subtract_background_using_av_fc`].
    pub fn new(name: impl Into<String>, raw_fc: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            fc: raw_fc.clone(),
            raw_fc,
            ..Default::default()
        }
    }

    /// Create an average profile summarizing a set of replicates.
    pub fn average(name: impl Into<String>, raw_fc: Vec<f64>, replicates: ReplicateSet) -> Self {
        Self {
            replicates: Some(replicates),
            ..Self::new(name, raw_fc)
        }
    }

    /// Whether this profile averages a set of replicates.
    pub fn is_average(&self) -> bool {
        self.replicates.is_some()
    }

    /// Raw fluorescence readings.
    pub fn raw_fc(&self) -> &[f64] {
        &self.raw_fc
    }

    /// Working fluorescence readings.
    pub fn fc(&self) -> &[f64] {
        &self.fc
    }

    /// Number of cycles (readings) in the profile.
    pub fn cycle_count(&self) -> usize {
        self.raw_fc.len()
    }

    /// Replace the working readings.
    ///
    /// # Errors
    ///
    /// The working dataset must have one reading per raw reading.
    pub fn set_fc(&mut self, fc: Vec<f64>) -> Result<()> {
        if fc.len() != self.raw_fc.len() {
            return Err(LreError::DimensionMismatch(format!(
                "{} working readings for {} raw readings",
                fc.len(),
                self.raw_fc.len()
            )));
        }
        self.fc = fc;
        Ok(())
    }

    /// Set the window boundaries.
    ///
    /// # Errors
    ///
    /// The window must start at cycle 1 or later, span at least
    /// [`MIN_WINDOW_SIZE`] cycles and end on an existing cycle.
    pub fn set_window(&mut self, start_cycle: usize, window_size: usize) -> Result<()> {
        if start_cycle == 0
            || window_size < MIN_WINDOW_SIZE
            || start_cycle + window_size - 1 > self.cycle_count()
        {
            return Err(LreError::InvalidWindow {
                start: start_cycle,
                size: window_size,
                cycles: self.cycle_count(),
            });
        }
        self.start_cycle = start_cycle;
        self.window_size = window_size;
        Ok(())
    }

    /// Last cycle of the LRE window.
    pub fn window_end_cycle(&self) -> usize {
        (self.start_cycle + self.window_size).saturating_sub(1)
    }

    /// Emax used in Fo, predicted Fc and C1/2 calculations.
    pub fn effective_emax(&self) -> f64 {
        self.emax_override.unwrap_or(self.emax)
    }

    /// Target quantity: molecules when calibrated, average Fo otherwise.
    pub fn target_quantity(&self) -> f64 {
        self.no.unwrap_or(self.av_fo)
    }

    /// Reset all LRE-derived parameters and clear the window flag.
    pub fn set_lre_variables_to_zero(&mut self) {
        self.start_cycle = 0;
        self.window_size = 0;
        self.emax = 0.0;
        self.delta_e = 0.0;
        self.r2 = 0.0;
        self.fmax = 0.0;
        self.av_fo = 0.0;
        self.av_fo_cv = 0.0;
        self.mid_c = 0.0;
        self.nonlinear_r2 = 0.0;
        self.no = None;
        self.has_window = false;
        self.nr_succeeded = false;
    }

    /// Whether every kinetic parameter is in its reset state.
    pub fn lre_variables_are_zero(&self) -> bool {
        !self.has_window
            && self.emax == 0.0
            && self.delta_e == 0.0
            && self.fmax == 0.0
            && self.av_fo == 0.0
            && self.mid_c == 0.0
    }
}

/// Replicate profiles summarized by an average profile.
///
/// Replicates are shared rather than owned: the same profiles may be
/// referenced by their own analyses elsewhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplicateSet {
    profiles: Vec<Arc<Profile>>,
}

impl ReplicateSet {
    /// Create a replicate set.
    pub fn new(profiles: Vec<Arc<Profile>>) -> Self {
        Self { profiles }
    }

    /// The replicate profiles.
    pub fn profiles(&self) -> &[Arc<Profile>] {
        &self.profiles
    }

    /// Average Fo values of replicates with a valid LRE window.
    fn analyzed_fo(&self) -> Vec<f64> {
        self.profiles
            .iter()
            .filter(|p| p.has_window)
            .map(|p| p.av_fo)
            .collect()
    }

    /// Whether the replicate average Fo values cluster within `cv_tolerance`.
    ///
    /// A set with no analyzed replicate is never clustered.
    pub fn are_sufficiently_clustered(&self, cv_tolerance: f64) -> bool {
        match kinetics::mean_and_cv(&self.analyzed_fo()) {
            Some((_, cv)) => cv.is_finite() && cv <= cv_tolerance,
            None => false,
        }
    }

    /// Mean target quantity of the analyzed replicates.
    pub fn average_quantity(&self) -> Option<f64> {
        let quantities: Vec<f64> = self
            .profiles
            .iter()
            .filter(|p| p.has_window)
            .map(|p| p.target_quantity())
            .collect();
        kinetics::mean_and_cv(&quantities).map(|(mean, _)| mean)
    }
}
