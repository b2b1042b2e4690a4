//! Configuration options for LRE window selection.
//!
//! This module defines the numeric thresholds used by the window selection
//! engine and the options that drive an end-to-end profile analysis. Every
//! operation takes its thresholds from an [`LreConfig`] rather than from
//! embedded constants.

use serde::{Deserialize, Serialize};

use crate::profile::MIN_WINDOW_SIZE;

/// Thresholds and defaults for LRE window selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LreConfig {
    /// Minimum cycle-local LRE r² for a start cycle candidate. Default: 0.95
    pub r2_tolerance: f64,

    /// Minimum cycle-local Emax of a start cycle candidate. Default: 0.40
    pub emax_threshold: f64,

    /// Window size used when a window is (re)initialized; never below
    /// [`MIN_WINDOW_SIZE`] when applied. Default: 3
    pub default_window_size: usize,

    /// Fraction of Fmax above which cycles are never added to the window. Default: 0.95
    pub fmax_ceiling_fraction: f64,

    /// Minimum number of cycles that must follow C1/2. Default: 3
    pub min_cycles_above_mid_c: usize,

    /// First cycle (1-indexed, inclusive) averaged for the background. Default: 4
    pub background_start_cycle: usize,

    /// Last cycle (1-indexed, inclusive) averaged for the background. Default: 9
    pub background_end_cycle: usize,

    /// Replicate averages below this target quantity are rejected. Default: 10.0
    pub min_replicate_quantity: f64,

    /// Maximum coefficient of variation of the replicate average Fo values. Default: 0.25
    pub replicate_cv_tolerance: f64,

    /// First cycle included in the nonlinear fit of the working dataset. Default: 4
    pub nr_first_cycle: usize,
}

impl Default for LreConfig {
    fn default() -> Self {
        Self {
            r2_tolerance: 0.95,
            emax_threshold: 0.40,
            default_window_size: 3,
            fmax_ceiling_fraction: 0.95,
            min_cycles_above_mid_c: 3,
            background_start_cycle: 4,
            background_end_cycle: 9,
            min_replicate_quantity: 10.0,
            replicate_cv_tolerance: 0.25,
            nr_first_cycle: 4,
        }
    }
}

impl LreConfig {
    /// Create a configuration with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle-local r² tolerance.
    pub fn with_r2_tolerance(mut self, r2_tolerance: f64) -> Self {
        self.r2_tolerance = r2_tolerance;
        self
    }

    /// Set the Emax floor for start cycle candidates.
    pub fn with_emax_threshold(mut self, emax_threshold: f64) -> Self {
        self.emax_threshold = emax_threshold;
        self
    }

    /// Set the default window size, clamped to [`MIN_WINDOW_SIZE`].
    pub fn with_default_window_size(mut self, size: usize) -> Self {
        self.default_window_size = size.max(MIN_WINDOW_SIZE);
        self
    }

    /// Window size applied when a window is (re)initialized.
    ///
    /// Deserialized configurations are not clamped on load, so operations
    /// read the size through here.
    pub fn window_size(&self) -> usize {
        self.default_window_size.max(MIN_WINDOW_SIZE)
    }

    /// Set the Fmax fraction capping window expansion.
    pub fn with_fmax_ceiling_fraction(mut self, fraction: f64) -> Self {
        self.fmax_ceiling_fraction = fraction;
        self
    }

    /// Set the background averaging window (1-indexed, inclusive).
    pub fn with_background_window(mut self, start: usize, end: usize) -> Self {
        self.background_start_cycle = start;
        self.background_end_cycle = end;
        self
    }

    /// Set the replicate quantity floor.
    pub fn with_min_replicate_quantity(mut self, quantity: f64) -> Self {
        self.min_replicate_quantity = quantity;
        self
    }

    /// Set the replicate clustering tolerance.
    pub fn with_replicate_cv_tolerance(mut self, tolerance: f64) -> Self {
        self.replicate_cv_tolerance = tolerance;
        self
    }

    /// Set the first cycle used by the nonlinear fit.
    pub fn with_nr_first_cycle(mut self, cycle: usize) -> Self {
        self.nr_first_cycle = cycle;
        self
    }
}

/// Options for a complete profile analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Minimum Fc for the start cycle; values <= 0 leave it unset. Default: 0.0
    pub min_fc: f64,

    /// Fo threshold for window expansion. Default: 0.06
    pub fo_threshold: f64,

    /// Refit the working dataset with nonlinear regression while expanding. Default: true
    pub use_nonlinear_regression: bool,

    /// Subtract the averaged background before searching for a window. Default: true
    pub subtract_background: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_fc: 0.0,
            fo_threshold: 0.06,
            use_nonlinear_regression: true,
            subtract_background: true,
        }
    }
}

impl AnalysisOptions {
    /// Set the minimum Fc used to select the start cycle.
    pub fn with_min_fc(mut self, min_fc: f64) -> Self {
        self.min_fc = min_fc;
        self
    }

    /// Set the Fo threshold for window expansion.
    pub fn with_fo_threshold(mut self, fo_threshold: f64) -> Self {
        self.fo_threshold = fo_threshold;
        self
    }

    /// Enable or disable nonlinear regression.
    pub fn with_nonlinear_regression(mut self, enabled: bool) -> Self {
        self.use_nonlinear_regression = enabled;
        self
    }

    /// Enable or disable background subtraction.
    pub fn with_background_subtraction(mut self, enabled: bool) -> Self {
        self.subtract_background = enabled;
        self
    }
}
