//! LRE window selection.
//!
//! The engine runs in stages, each operating on a
//! [`ProfileSummary`](crate::summary::ProfileSummary):
//!
//! 1. [`gate`]: replicate averages that are too scattered or too dilute are
//!    skipped before anything else happens.
//! 2. [`scanner`]: a five-cycle regression is slid across the profile to
//!    find an initial three-cycle window, which is then repositioned to
//!    just below C1/2.
//! 3. [`min_fc`]: alternatively, the start cycle is taken from a minimum
//!    fluorescence threshold.
//! 4. [`refiner`]: the upper boundary is expanded cycle by cycle while the
//!    next cycle's Fo agrees with the window average, optionally refitting
//!    the working dataset after every step.
//!
//! Analysis failures never surface as errors. They are reported as a
//! [`WindowOutcome`] and leave the profile zeroed by
//! [`process_failed_profile`].

pub mod background;
pub mod gate;
pub mod min_fc;
pub mod refiner;
pub mod scanner;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::profile::Profile;
use crate::summary::ProfileSummary;

pub use background::subtract_background_using_av_fc;
pub use gate::{check_profile_validity, GateVerdict};
pub use min_fc::select_start_cycle_using_min_fc;
pub use refiner::{expand_window, expand_window_without_nr, optimize_window_using_nr};
pub use scanner::{find_start_cycle, select_start_cycle_via_scanning};

/// Result of a window selection operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowOutcome {
    /// A window is in place.
    Found,

    /// Nothing was done; the profile is as it was on entry.
    Unchanged,

    /// A replicate average failed the validity gate; nothing was touched.
    Rejected(GateVerdict),

    /// No cycle satisfied the scanning criteria.
    NotFound,

    /// The window falls too close to the end of the profile, or C1/2 is invalid.
    IncompleteProfile,

    /// The profile ended before reaching the minimum fluorescence.
    ThresholdTooHigh,
}

impl WindowOutcome {
    /// Whether a window is in place after the operation.
    pub fn is_found(&self) -> bool {
        matches!(self, WindowOutcome::Found)
    }

    /// Whether the profile was zeroed as unanalyzable.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            WindowOutcome::NotFound
                | WindowOutcome::IncompleteProfile
                | WindowOutcome::ThresholdTooHigh
        )
    }
}

/// Reset all kinetic parameters of a profile that could not be analyzed.
pub fn process_failed_profile(profile: &mut Profile) {
    profile.set_lre_variables_to_zero();
}

/// Zero the profile, refresh its summary and report `outcome`.
pub(crate) fn fail(summary: &mut ProfileSummary, outcome: WindowOutcome) -> Result<WindowOutcome> {
    debug!(profile = %summary.profile().name, ?outcome, "LRE window selection failed");
    process_failed_profile(summary.profile_mut());
    summary.update()?;
    Ok(outcome)
}
