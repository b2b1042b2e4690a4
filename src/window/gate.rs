//! Validity gate for replicate average profiles.

use serde::{Deserialize, Serialize};

use crate::config::LreConfig;
use crate::profile::Profile;

/// Verdict of the validity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateVerdict {
    /// The profile may be analyzed.
    Valid,

    /// The replicate profiles are insufficiently clustered.
    Scattered,

    /// The replicate average quantity is below the floor.
    BelowQuantityFloor,
}

/// Check whether a profile may enter window selection.
///
/// Only replicate averages are gated; any other profile is valid.
pub fn check_profile_validity(profile: &Profile, config: &LreConfig) -> GateVerdict {
    let Some(replicates) = &profile.replicates else {
        return GateVerdict::Valid;
    };
    if !replicates.are_sufficiently_clustered(config.replicate_cv_tolerance) {
        return GateVerdict::Scattered;
    }
    match replicates.average_quantity() {
        Some(quantity) if quantity >= config.min_replicate_quantity => GateVerdict::Valid,
        _ => GateVerdict::BelowQuantityFloor,
    }
}
