//! Per-cycle records of an amplification profile.
//!
//! A [`CycleSeries`] is an ordered, index-addressed sequence of [`Cycle`]s in
//! which the index of a cycle is its cycle number. Index 0 holds the zero
//! cycle, a placeholder with no reading. "Next" and "previous" are plain
//! bounds-checked index arithmetic.
//!
//! A series is built once from the working Fc dataset and never mutated
//! afterwards; [`crate::summary::ProfileSummary::update`] replaces it
//! wholesale whenever the profile changes.

use serde::{Deserialize, Serialize};

use crate::kinetics::{self, RegressionLine};

/// Number of cycles on either side of a cycle in its local LRE regression.
pub const LOCAL_HALF_WIDTH: usize = 2;

/// A single amplification cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    /// Cycle number; 0 for the zero cycle
    pub number: usize,

    /// Working (background-subtracted) fluorescence reading
    pub fc: f64,

    /// Cycle efficiency: Fc(n) / Fc(n-1) - 1
    pub ec: f64,

    /// LRE regression over the five cycles centred on this one
    pub local_fit: Option<RegressionLine>,

    /// Fo derived from this cycle's reading and its local regression
    pub local_fo: f64,

    /// Fo derived from this cycle's reading and the LRE window kinetics
    pub fo: f64,

    /// Fractional deviation of `fo` from the window average Fo
    pub fo_frac_av: f64,

    /// Fc predicted from the window kinetics and average Fo
    pub predicted_fc: f64,
}

impl Cycle {
    fn new(number: usize, fc: f64, ec: f64) -> Self {
        Self {
            number,
            fc,
            ec,
            local_fit: None,
            local_fo: 0.0,
            fo: 0.0,
            fo_frac_av: 0.0,
            predicted_fc: 0.0,
        }
    }

    /// r² of the local regression, or `None` at the ends of the series.
    pub fn local_r2(&self) -> Option<f64> {
        self.local_fit.map(|fit| fit.r2)
    }

    /// Emax of the local regression, or `None` at the ends of the series.
    pub fn local_emax(&self) -> Option<f64> {
        self.local_fit.map(|fit| fit.intercept)
    }
}

/// Cycle efficiency from two consecutive readings.
///
/// Undefined ratios (a zero or non-finite previous reading) are reported as 0.
fn efficiency(previous: f64, current: f64) -> f64 {
    let ec = current / previous - 1.0;
    if ec.is_finite() {
        ec
    } else {
        0.0
    }
}

/// Ordered sequence of cycles, indexed by cycle number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSeries {
    cycles: Vec<Cycle>,
}

impl CycleSeries {
    /// Build a series from a working Fc dataset (cycle 1 first).
    ///
    /// Computes Ec for every cycle, and the local five-point LRE regression
    /// and local Fo for every cycle with two neighbours on each side.
    pub fn from_readings(fc: &[f64]) -> Self {
        let mut cycles = Vec::with_capacity(fc.len() + 1);
        cycles.push(Cycle::new(0, 0.0, 0.0));
        for (i, &reading) in fc.iter().enumerate() {
            let ec = if i == 0 {
                0.0
            } else {
                efficiency(fc[i - 1], reading)
            };
            cycles.push(Cycle::new(i + 1, reading, ec));
        }

        let mut series = Self { cycles };
        series.compute_local_regressions();
        series
    }

    fn compute_local_regressions(&mut self) {
        let last = self.last_cycle_number();
        if last < 2 * LOCAL_HALF_WIDTH {
            return;
        }
        for n in LOCAL_HALF_WIDTH..=(last - LOCAL_HALF_WIDTH) {
            let neighbourhood = &self.cycles[n - LOCAL_HALF_WIDTH..=n + LOCAL_HALF_WIDTH];
            let fc: Vec<f64> = neighbourhood.iter().map(|c| c.fc).collect();
            let ec: Vec<f64> = neighbourhood.iter().map(|c| c.ec).collect();
            // five points, equal lengths: regression cannot fail here
            if let Ok(fit) = kinetics::linear_regression(&fc, &ec) {
                let cycle = &mut self.cycles[n];
                cycle.local_fo = kinetics::calc_fo(n, cycle.fc, fit.slope, fit.intercept);
                cycle.local_fit = Some(fit);
            }
        }
    }

    /// The zero cycle.
    pub fn zero(&self) -> &Cycle {
        &self.cycles[0]
    }

    /// Number of the last cycle, which equals the number of readings.
    pub fn last_cycle_number(&self) -> usize {
        self.cycles.len() - 1
    }

    /// The cycle with the given number.
    pub fn get(&self, number: usize) -> Option<&Cycle> {
        self.cycles.get(number)
    }

    /// The cycle following `number`.
    pub fn next(&self, number: usize) -> Option<&Cycle> {
        self.cycles.get(number + 1)
    }

    /// The cycle preceding `number`.
    pub fn prev(&self, number: usize) -> Option<&Cycle> {
        number.checked_sub(1).and_then(|n| self.cycles.get(n))
    }

    /// The cycles `start..start + size`, if all of them exist.
    pub fn window(&self, start: usize, size: usize) -> Option<&[Cycle]> {
        if start == 0 || size == 0 {
            return None;
        }
        self.cycles.get(start..start + size)
    }

    /// Iterate over the reading cycles (excluding the zero cycle).
    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter().skip(1)
    }

    pub(crate) fn cycles_mut(&mut self) -> &mut [Cycle] {
        &mut self.cycles
    }
}
