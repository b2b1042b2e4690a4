//! Initial window search by scanning cycle-local LRE regressions.

use tracing::debug;

use super::gate::{check_profile_validity, GateVerdict};
use super::{fail, WindowOutcome};
use crate::config::LreConfig;
use crate::cycle::CycleSeries;
use crate::error::Result;
use crate::kinetics::RegressionLine;
use crate::profile::Profile;
use crate::summary::ProfileSummary;

/// First cycle considered as a start cycle.
const FIRST_CANDIDATE: usize = 3;

/// Cycles that must exist past a candidate for it to be considered.
const LOOKAHEAD: usize = 3;

/// Find the first start cycle candidate among cycle-local regressions.
///
/// `fits` is indexed by cycle number (index 0 is the zero cycle). Cycle `n`
/// is accepted when the local r² of cycles `n - 1`, `n` and `n + 1` all
/// exceed the tolerance and the local Emax of `n` exceeds the threshold.
/// Scanning starts at cycle 3 and stops once three cycles past the
/// candidate no longer exist.
pub fn find_start_cycle_in(fits: &[Option<RegressionLine>], config: &LreConfig) -> Option<usize> {
    let last = fits.len().checked_sub(1)?;
    let r2_ok = |n: usize| matches!(fits[n], Some(fit) if fit.r2 > config.r2_tolerance);

    (FIRST_CANDIDATE..)
        .take_while(|n| n + LOOKAHEAD <= last)
        .find(|&n| {
            r2_ok(n - 1)
                && r2_ok(n)
                && r2_ok(n + 1)
                && matches!(fits[n], Some(fit) if fit.intercept > config.emax_threshold)
        })
}

/// Find the first start cycle candidate of a cycle series.
pub fn find_start_cycle(series: &CycleSeries, config: &LreConfig) -> Option<usize> {
    let fits: Vec<Option<RegressionLine>> = std::iter::once(series.zero())
        .chain(series.iter())
        .map(|cycle| cycle.local_fit)
        .collect();
    find_start_cycle_in(&fits, config)
}

/// Whether fewer than the required number of cycles follow C1/2.
fn too_close_to_end(profile: &Profile, config: &LreConfig) -> bool {
    let mid_c = profile.mid_c;
    !mid_c.is_finite()
        || (profile.cycle_count() as f64 - mid_c) < config.min_cycles_above_mid_c as f64
}

/// Locate an initial, unoptimized LRE window.
///
/// Replicate averages are first passed through the validity gate; a
/// rejected profile is left untouched. Otherwise the first accepted scan
/// candidate becomes a default-size window, which is then repositioned to
/// start at the integer part of C1/2. Every search starts afresh from the
/// current working dataset.
///
/// A profile with no candidate, or whose C1/2 leaves too few cycles above
/// it, is zeroed and the corresponding failure is returned.
pub fn select_start_cycle_via_scanning(
    summary: &mut ProfileSummary,
    config: &LreConfig,
) -> Result<WindowOutcome> {
    let verdict = check_profile_validity(summary.profile(), config);
    if verdict != GateVerdict::Valid {
        debug!(profile = %summary.profile().name, ?verdict, "profile skipped by validity gate");
        return Ok(WindowOutcome::Rejected(verdict));
    }

    let Some(start) = find_start_cycle(summary.cycles(), config) else {
        return fail(summary, WindowOutcome::NotFound);
    };

    let size = config.window_size();
    let profile = summary.profile_mut();
    if profile.set_window(start, size).is_err() {
        return fail(summary, WindowOutcome::IncompleteProfile);
    }
    profile.has_window = true;
    summary.update()?;

    if too_close_to_end(summary.profile(), config) {
        return fail(summary, WindowOutcome::IncompleteProfile);
    }

    let repositioned = summary.profile().mid_c.floor() as usize;
    if summary.profile_mut().set_window(repositioned, size).is_err() {
        return fail(summary, WindowOutcome::IncompleteProfile);
    }
    summary.update()?;

    debug!(
        profile = %summary.profile().name,
        candidate = start,
        start_cycle = repositioned,
        mid_c = summary.profile().mid_c,
        "initial LRE window selected"
    );
    Ok(WindowOutcome::Found)
}
