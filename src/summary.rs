//! Profile summaries: a profile together with its current cycle series.
//!
//! [`ProfileSummary::update`] is the only way a cycle series is produced. It
//! regenerates the series from the profile's working readings and current
//! window, recomputes every per-cycle and whole-profile derived value, and
//! hands the profile to a [`ProfileStore`]. Borrowed cycles cannot outlive an
//! update, so a stale series can never be observed.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::cycle::{Cycle, CycleSeries};
use crate::error::{LreError, Result};
use crate::kinetics;
use crate::profile::Profile;

/// Persistence collaborator receiving every updated profile.
pub trait ProfileStore: Send + Sync {
    /// Persist the current state of a profile.
    fn persist(&self, profile: &Profile) -> Result<()>;
}

/// Store that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ProfileStore for NullStore {
    fn persist(&self, _profile: &Profile) -> Result<()> {
        Ok(())
    }
}

/// Store keeping every persisted snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Profile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots in the order they were persisted.
    pub fn records(&self) -> Vec<Profile> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> Option<Profile> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.last().cloned())
    }
}

impl ProfileStore for MemoryStore {
    fn persist(&self, profile: &Profile) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| LreError::Store(e.to_string()))?
            .push(profile.clone());
        Ok(())
    }
}

/// Store writing each update as one JSON line.
#[derive(Debug)]
pub struct JsonLinesStore<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesStore<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| LreError::Store(e.to_string()))
    }
}

impl<W: Write + Send> ProfileStore for JsonLinesStore<W> {
    fn persist(&self, profile: &Profile) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| LreError::Store(e.to_string()))?;
        serde_json::to_writer(&mut *writer, profile)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// A profile, its current cycle series and the store its updates go to.
pub struct ProfileSummary {
    profile: Profile,
    cycles: CycleSeries,
    store: Arc<dyn ProfileStore>,
}

impl std::fmt::Debug for ProfileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSummary")
            .field("profile", &self.profile)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl ProfileSummary {
    /// Wrap a profile, building its cycle series without persisting.
    ///
    /// # Errors
    ///
    /// Fails if the profile claims a window that does not fit its readings.
    pub fn new(profile: Profile, store: Arc<dyn ProfileStore>) -> Result<Self> {
        let mut summary = Self {
            cycles: CycleSeries::from_readings(profile.fc()),
            profile,
            store,
        };
        summary.recompute()?;
        Ok(summary)
    }

    /// Wrap a profile with a store that discards updates.
    pub fn detached(profile: Profile) -> Result<Self> {
        Self::new(profile, Arc::new(NullStore))
    }

    /// The profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Mutable access to the profile; call [`Self::update`] afterwards.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Unwrap the profile.
    pub fn into_profile(self) -> Profile {
        self.profile
    }

    /// The current cycle series.
    pub fn cycles(&self) -> &CycleSeries {
        &self.cycles
    }

    /// The zero cycle of the current series.
    pub fn zero_cycle(&self) -> &Cycle {
        self.cycles.zero()
    }

    /// The last cycle of the current LRE window, if a window exists.
    pub fn window_end_cycle(&self) -> Option<&Cycle> {
        if !self.profile.has_window {
            return None;
        }
        self.cycles.get(self.profile.window_end_cycle())
    }

    /// Regenerate the cycle series, recompute derived values and persist.
    ///
    /// Idempotent for identical boundaries and working readings.
    pub fn update(&mut self) -> Result<()> {
        self.recompute()?;
        self.store.persist(&self.profile)
    }

    fn recompute(&mut self) -> Result<()> {
        let mut series = CycleSeries::from_readings(self.profile.fc());
        if self.profile.has_window {
            apply_window(&mut self.profile, &mut series)?;
        }
        self.cycles = series;
        Ok(())
    }
}

/// Fit the LRE window and derive the whole-profile parameters.
fn apply_window(profile: &mut Profile, series: &mut CycleSeries) -> Result<()> {
    let (start, size) = (profile.start_cycle, profile.window_size);
    let window = series.window(start, size).ok_or(LreError::InvalidWindow {
        start,
        size,
        cycles: series.last_cycle_number(),
    })?;

    let fc: Vec<f64> = window.iter().map(|c| c.fc).collect();
    let ec: Vec<f64> = window.iter().map(|c| c.ec).collect();
    let fit = kinetics::linear_regression(&fc, &ec)?;

    let (delta_e, emax) = (fit.slope, fit.intercept);
    let emax_used = profile.emax_override.unwrap_or(emax);

    let cycles = series.cycles_mut();
    for cycle in cycles.iter_mut().skip(1) {
        cycle.fo = kinetics::calc_fo_with_emax(cycle.number, cycle.fc, delta_e, emax, emax_used);
    }

    let window_fo: Vec<f64> = cycles[start..start + size].iter().map(|c| c.fo).collect();
    let (av_fo, av_fo_cv) = kinetics::mean_and_cv(&window_fo).unwrap_or((0.0, 0.0));

    for cycle in cycles.iter_mut().skip(1) {
        cycle.fo_frac_av = (cycle.fo - av_fo) / av_fo;
        cycle.predicted_fc =
            kinetics::calc_prd_fc_with_emax(cycle.number, delta_e, emax, av_fo, emax_used);
    }

    let predicted: Vec<f64> = cycles[start..start + size]
        .iter()
        .map(|c| c.predicted_fc)
        .collect();

    profile.delta_e = delta_e;
    profile.emax = emax;
    profile.r2 = fit.r2;
    profile.fmax = kinetics::calc_fmax(delta_e, emax);
    profile.av_fo = av_fo;
    profile.av_fo_cv = av_fo_cv;
    profile.mid_c = kinetics::mid_c_with_emax(delta_e, emax, av_fo, emax_used);
    profile.nonlinear_r2 = kinetics::nonlinear_r2(&fc, &predicted)?;

    trace!(
        profile = %profile.name,
        start,
        size,
        emax,
        delta_e,
        mid_c = profile.mid_c,
        "LRE window recomputed"
    );
    Ok(())
}
