//! Window expansion toward the plateau.

use tracing::{debug, trace};

use super::{fail, WindowOutcome};
use crate::config::LreConfig;
use crate::error::Result;
use crate::nonlinear::NonlinearFit;
use crate::summary::ProfileSummary;

/// Grow the LRE window one cycle at a time.
///
/// The window is first reset to the default size and updated. While the
/// cycle above the window top has an Fo within `fo_threshold` (fractional)
/// of the window average and an Fc below the Fmax ceiling, the window is
/// grown by one cycle and updated. The ceiling is fixed from the Fmax of the
/// reset window.
///
/// When `refit` is supplied it runs after the reset and after every growth
/// step. The result is then whether the last refit succeeded, except that a
/// window grown all the way to the last cycle always reports success.
///
/// Without a refit the result is `true` once the window has been checked
/// for expansion. A reset window that already ends on the last cycle cannot
/// be expanded and yields `false`, as does a profile without a window
/// (which is left untouched).
pub fn expand_window(
    summary: &mut ProfileSummary,
    config: &LreConfig,
    fo_threshold: f64,
    refit: Option<&dyn NonlinearFit>,
) -> Result<bool> {
    if !summary.profile().has_window {
        return Ok(false);
    }

    let start = summary.profile().start_cycle;
    if summary
        .profile_mut()
        .set_window(start, config.window_size())
        .is_err()
    {
        fail(summary, WindowOutcome::IncompleteProfile)?;
        return Ok(false);
    }
    summary.update()?;

    let mut fitted = match refit {
        Some(fit) => fit.fit(summary)?,
        None => true,
    };
    let ceiling = summary.profile().fmax * config.fmax_ceiling_fraction;

    loop {
        let Some(top) = summary.window_end_cycle() else {
            return Ok(false);
        };
        let Some(next) = summary.cycles().next(top.number) else {
            break;
        };
        if !(next.fo_frac_av.abs() < fo_threshold && next.fc < ceiling) {
            debug!(
                profile = %summary.profile().name,
                window_size = summary.profile().window_size,
                rejected_cycle = next.number,
                "LRE window expansion stopped"
            );
            return Ok(fitted);
        }

        trace!(profile = %summary.profile().name, cycle = next.number, "LRE window expanded");
        summary.profile_mut().window_size += 1;
        summary.update()?;
        if let Some(fit) = refit {
            fitted = fit.fit(summary)?;
        }

        if summary
            .window_end_cycle()
            .is_some_and(|top| summary.cycles().next(top.number).is_none())
        {
            debug!(profile = %summary.profile().name, "LRE window reached the last cycle");
            return Ok(true);
        }
    }

    // The reset window already ends on the last cycle.
    Ok(refit.is_some() && fitted)
}

/// Expand the window without refitting the working dataset.
pub fn expand_window_without_nr(
    summary: &mut ProfileSummary,
    config: &LreConfig,
    fo_threshold: f64,
) -> Result<bool> {
    expand_window(summary, config, fo_threshold, None)
}

/// Expand the window, refitting the working dataset after every step.
///
/// Returns whether the last refit succeeded; a window grown to the last
/// cycle is reported as optimized.
pub fn optimize_window_using_nr(
    summary: &mut ProfileSummary,
    config: &LreConfig,
    fo_threshold: f64,
    fit: &dyn NonlinearFit,
) -> Result<bool> {
    expand_window(summary, config, fo_threshold, Some(fit))
}
