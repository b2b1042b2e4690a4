//! End-to-end LRE analysis of one profile or a batch of profiles.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{AnalysisOptions, LreConfig};
use crate::error::Result;
use crate::nonlinear::NonlinearFit;
use crate::summary::ProfileSummary;
use crate::window::{
    check_profile_validity, expand_window_without_nr, optimize_window_using_nr,
    select_start_cycle_using_min_fc, select_start_cycle_via_scanning,
    subtract_background_using_av_fc, GateVerdict, WindowOutcome,
};

/// Outcome of a complete profile analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Outcome of the start cycle selection
    pub window: WindowOutcome,

    /// Whether the window expansion completed (and the last refit converged)
    pub optimized: bool,
}

/// Analyze a single profile.
///
/// Replicate averages failing the validity gate are returned untouched.
/// Otherwise runs, in order: background subtraction (if enabled), scanning
/// for an initial window, minimum Fc start cycle selection (if a threshold
/// is set), and window expansion. Expansion refits the working dataset with
/// `fit` when nonlinear regression is enabled and a fit is supplied.
///
/// Analysis failures are reported through [`AnalysisOutcome::window`]; only
/// invalid input data and store failures are errors.
pub fn analyze_profile(
    summary: &mut ProfileSummary,
    config: &LreConfig,
    options: &AnalysisOptions,
    fit: Option<&dyn NonlinearFit>,
) -> Result<AnalysisOutcome> {
    // Gate before background subtraction so a rejected average stays
    // untouched. Scanning repeats the check for its direct callers.
    let verdict = check_profile_validity(summary.profile(), config);
    if verdict != GateVerdict::Valid {
        return Ok(AnalysisOutcome {
            window: WindowOutcome::Rejected(verdict),
            optimized: false,
        });
    }

    if options.subtract_background {
        subtract_background_using_av_fc(summary.profile_mut(), config)?;
        summary.update()?;
    }

    let mut window = select_start_cycle_via_scanning(summary, config)?;
    if window.is_found() && options.min_fc > 0.0 {
        window = select_start_cycle_using_min_fc(summary, config, options.min_fc)?;
    }
    if !window.is_found() {
        return Ok(AnalysisOutcome {
            window,
            optimized: false,
        });
    }

    let optimized = match fit {
        Some(fit) if options.use_nonlinear_regression => {
            optimize_window_using_nr(summary, config, options.fo_threshold, fit)?
        }
        _ => expand_window_without_nr(summary, config, options.fo_threshold)?,
    };

    let profile = summary.profile();
    info!(
        profile = %profile.name,
        start_cycle = profile.start_cycle,
        window_size = profile.window_size,
        emax = profile.emax,
        av_fo = profile.av_fo,
        optimized,
        "LRE analysis complete"
    );
    Ok(AnalysisOutcome { window, optimized })
}

/// Analyze independent profiles in parallel.
///
/// Each profile is analyzed on its own summary; results are returned in
/// input order.
pub fn analyze_batch(
    summaries: &mut [ProfileSummary],
    config: &LreConfig,
    options: &AnalysisOptions,
    fit: Option<&(dyn NonlinearFit + Sync)>,
) -> Vec<Result<AnalysisOutcome>> {
    summaries
        .par_iter_mut()
        .map(|summary| {
            let fit = fit.map(|f| f as &dyn NonlinearFit);
            let result = analyze_profile(summary, config, options, fit);
            if let Err(err) = &result {
                warn!(profile = %summary.profile().name, error = %err, "LRE analysis failed");
            }
            result
        })
        .collect()
}
