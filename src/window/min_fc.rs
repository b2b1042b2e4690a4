//! Start cycle selection from a minimum fluorescence threshold.

use tracing::debug;

use super::scanner::select_start_cycle_via_scanning;
use super::{fail, WindowOutcome};
use crate::config::LreConfig;
use crate::error::Result;
use crate::summary::ProfileSummary;

/// Place the window start one cycle past the first cycle reaching `min_fc`.
///
/// A `min_fc` of zero or less means no threshold is set and nothing happens.
/// Without an existing window the profile is scanned first, and a scanning
/// failure is returned as is. The threshold applies to the denominator of
/// the first efficiency ratio, so the window starts at the cycle after the
/// crossing. If the series ends before a full window fits above the
/// crossing, the profile is zeroed and [`WindowOutcome::ThresholdTooHigh`]
/// is returned.
pub fn select_start_cycle_using_min_fc(
    summary: &mut ProfileSummary,
    config: &LreConfig,
    min_fc: f64,
) -> Result<WindowOutcome> {
    if min_fc <= 0.0 {
        return Ok(WindowOutcome::Unchanged);
    }

    if !summary.profile().has_window {
        let outcome = select_start_cycle_via_scanning(summary, config)?;
        if !outcome.is_found() {
            return Ok(outcome);
        }
    }

    let crossing = summary
        .cycles()
        .iter()
        .skip(1)
        .find(|cycle| cycle.fc >= min_fc)
        .map(|cycle| cycle.number);
    let Some(crossing) = crossing else {
        return fail(summary, WindowOutcome::ThresholdTooHigh);
    };

    let start = crossing + 1;
    if summary
        .profile_mut()
        .set_window(start, config.window_size())
        .is_err()
    {
        return fail(summary, WindowOutcome::ThresholdTooHigh);
    }
    summary.update()?;

    debug!(profile = %summary.profile().name, min_fc, start_cycle = start, "start cycle set from minimum Fc");
    Ok(WindowOutcome::Found)
}
