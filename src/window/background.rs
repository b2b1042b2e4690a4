//! Fluorescence background estimation.

use crate::config::LreConfig;
use crate::error::{LreError, Result};
use crate::profile::Profile;

/// Subtract a background averaged over a fixed window of early cycles.
///
/// Fb is the mean raw reading over the configured cycles (4-9 by default,
/// 1-indexed and inclusive; cycles 1-3 are frequently aberrant). The working
/// dataset becomes raw - Fb for every cycle.
///
/// # Errors
///
/// Fails if the background window is empty or extends past the last cycle.
pub fn subtract_background_using_av_fc(profile: &mut Profile, config: &LreConfig) -> Result<()> {
    let (start, end) = (config.background_start_cycle, config.background_end_cycle);
    let raw = profile.raw_fc();
    if start == 0 || start > end || end > raw.len() {
        return Err(LreError::InsufficientData {
            cycles: raw.len(),
            required: end,
        });
    }

    let window = &raw[start - 1..end];
    let fb = window.iter().sum::<f64>() / window.len() as f64;
    let fc = raw.iter().map(|f| f - fb).collect();

    profile.set_fc(fc)?;
    profile.fb = fb;
    Ok(())
}
