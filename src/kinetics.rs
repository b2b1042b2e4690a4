//! Kinetic formulas of the LRE amplification model.
//!
//! Within the LRE window, cycle efficiency falls linearly with fluorescence:
//!
//! Ec = deltaE * Fc + Emax
//!
//! which fixes the asymptotic fluorescence at Fmax = Emax / -deltaE. Given the
//! fitted pair, the target quantity (Fo) can be back-calculated from any cycle
//! reading, and a fluorescence reading can be predicted for any cycle from Fo.
//!
//! All functions here are pure. The `_with_emax` variants substitute an
//! externally fixed Emax in the exponent while still deriving Fmax from the
//! fitted `(deltaE, Emax)` pair.

use serde::{Deserialize, Serialize};

use crate::error::{LreError, Result};

/// Result of a linear regression of `y` on `x`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegressionLine {
    /// Slope of the line (deltaE for an LRE plot)
    pub slope: f64,

    /// Y-intercept of the line (Emax for an LRE plot)
    pub intercept: f64,

    /// Coefficient of determination
    pub r2: f64,
}

impl RegressionLine {
    /// Evaluate the line at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares regression of `y` on `x`.
///
/// Used on LRE plots with `x = Fc` and `y = Ec`, so the slope is deltaE and
/// the intercept is Emax. A set of points with no spread in `x` has no
/// defined slope; it is reported as a flat line with `r2 = 0` so that it can
/// never pass an r² tolerance.
///
/// # Errors
///
/// Returns an error if the slices differ in length or hold fewer than two points.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<RegressionLine> {
    if x.len() != y.len() {
        return Err(LreError::DimensionMismatch(format!(
            "x has {} values, y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(LreError::InsufficientData {
            cycles: x.len(),
            required: 2,
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (sxx, sxy, syy) = x.iter().zip(y.iter()).fold(
        (0.0, 0.0, 0.0),
        |(sxx, sxy, syy), (&xi, &yi)| {
            let dx = xi - mean_x;
            let dy = yi - mean_y;
            (sxx + dx * dx, sxy + dx * dy, syy + dy * dy)
        },
    );

    if sxx == 0.0 {
        return Ok(RegressionLine {
            slope: 0.0,
            intercept: mean_y,
            r2: 0.0,
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let r2 = if syy == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / syy
    };

    Ok(RegressionLine {
        slope,
        intercept,
        r2,
    })
}

/// Asymptotic maximal fluorescence implied by deltaE and Emax.
pub fn calc_fmax(delta_e: f64, emax: f64) -> f64 {
    emax / -delta_e
}

/// Target quantity in fluorescence units (Fo) back-calculated from one cycle.
///
/// Any quantitative unit can be used as long as Fc is expressed in it; the
/// return value is in the same unit.
///
/// # Arguments
///
/// * `cycle` - The cycle number
/// * `fc` - The cycle fluorescence reading
/// * `delta_e` - The rate of loss in cycle efficiency
/// * `emax` - The maximal amplification efficiency
pub fn calc_fo(cycle: usize, fc: f64, delta_e: f64, emax: f64) -> f64 {
    calc_fo_with_emax(cycle, fc, delta_e, emax, emax)
}

/// Fo using an overridden Emax in the exponent.
pub fn calc_fo_with_emax(cycle: usize, fc: f64, delta_e: f64, emax: f64, emax_override: f64) -> f64 {
    let fmax = calc_fmax(delta_e, emax);
    fmax / (1.0 + ((fmax / fc) - 1.0) * (emax_override + 1.0).powi(cycle as i32))
}

/// Predicted cycle fluorescence for one cycle given Fo.
pub fn calc_prd_fc(cycle: usize, delta_e: f64, emax: f64, fo: f64) -> f64 {
    calc_prd_fc_with_emax(cycle, delta_e, emax, fo, emax)
}

/// Predicted cycle fluorescence using an overridden Emax in the exponent.
pub fn calc_prd_fc_with_emax(
    cycle: usize,
    delta_e: f64,
    emax: f64,
    fo: f64,
    emax_override: f64,
) -> f64 {
    let fmax = calc_fmax(delta_e, emax);
    fmax / (1.0 + ((fmax / fo) - 1.0) * (emax_override + 1.0).powi(-(cycle as i32)))
}

/// C1/2: the fractional cycle at which Fc reaches half of Fmax.
pub fn mid_c(delta_e: f64, emax: f64, av_fo: f64) -> f64 {
    mid_c_with_emax(delta_e, emax, av_fo, emax)
}

/// C1/2 using an overridden Emax as the amplification base.
pub fn mid_c_with_emax(delta_e: f64, emax: f64, av_fo: f64, emax_override: f64) -> f64 {
    let fmax = calc_fmax(delta_e, emax);
    ((fmax / av_fo) - 1.0).log10() / (emax_override + 1.0).log10()
}

/// Nonlinear correlation coefficient (R²) of predicted against observed Fc.
///
/// R² = 1 - Σ(observed - predicted)² / Σ(observed - mean(observed))²
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
pub fn nonlinear_r2(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    if observed.len() != predicted.len() {
        return Err(LreError::DimensionMismatch(format!(
            "{} observed readings, {} predicted",
            observed.len(),
            predicted.len()
        )));
    }
    if observed.is_empty() {
        return Err(LreError::InsufficientData {
            cycles: 0,
            required: 1,
        });
    }

    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let (num, den) = observed
        .iter()
        .zip(predicted.iter())
        .fold((0.0, 0.0), |(num, den), (&o, &p)| {
            (num + (o - p).powi(2), den + (o - mean).powi(2))
        });

    Ok(1.0 - num / den)
}

/// Arithmetic mean and coefficient of variation of a set of values.
///
/// Returns `None` for an empty set. The CV is 0 for a single value.
pub(crate) fn mean_and_cv(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() == 1 {
        return Some((mean, 0.0));
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt() / mean.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DELTA_E: f64 = -0.0009;
    const EMAX: f64 = 0.9;
    const FO: f64 = 0.002;

    #[test]
    fn test_collinear_regression() {
        let fc = [10.0, 20.0, 40.0, 80.0, 160.0];
        let ec: Vec<f64> = fc.iter().map(|f| DELTA_E * f + EMAX).collect();

        let line = linear_regression(&fc, &ec).unwrap();
        assert_relative_eq!(line.slope, DELTA_E, epsilon = 1e-12);
        assert_relative_eq!(line.intercept, EMAX, epsilon = 1e-12);
        assert_relative_eq!(line.r2, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_regression_r2_never_exceeds_one() {
        let fc = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ec = [0.9, 0.2, 0.7, 0.1, 0.8];
        let line = linear_regression(&fc, &ec).unwrap();
        assert!(line.r2 <= 1.0);
        assert!(line.r2 >= 0.0);
    }

    #[test]
    fn test_regression_without_spread() {
        let line = linear_regression(&[5.0; 5], &[0.0; 5]).unwrap();
        assert_eq!(line.r2, 0.0);
        assert_eq!(line.slope, 0.0);
    }

    #[test]
    fn test_regression_dimension_mismatch() {
        assert!(matches!(
            linear_regression(&[1.0, 2.0], &[1.0]),
            Err(LreError::DimensionMismatch(_))
        ));
        assert!(matches!(
            linear_regression(&[1.0], &[1.0]),
            Err(LreError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_fo_and_predicted_fc_are_inverse() {
        for cycle in 12..24 {
            let fc = calc_prd_fc(cycle, DELTA_E, EMAX, FO);
            let fo = calc_fo(cycle, fc, DELTA_E, EMAX);
            assert_relative_eq!(fo, FO, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_overridden_emax_is_inverse_too() {
        let fixed = 0.95;
        for cycle in 12..24 {
            let fc = calc_prd_fc_with_emax(cycle, DELTA_E, EMAX, FO, fixed);
            let fo = calc_fo_with_emax(cycle, fc, DELTA_E, EMAX, fixed);
            assert_relative_eq!(fo, FO, max_relative = 1e-9);
        }
        // Fmax still comes from the fitted pair
        let late = calc_prd_fc_with_emax(200, DELTA_E, EMAX, FO, fixed);
        assert_relative_eq!(late, calc_fmax(DELTA_E, EMAX), max_relative = 1e-9);
    }

    #[test]
    fn test_mid_c_is_half_fmax() {
        let fmax = calc_fmax(DELTA_E, EMAX);
        let c = mid_c(DELTA_E, EMAX, FO);
        let f_at_mid =
            fmax / (1.0 + ((fmax / FO) - 1.0) * (EMAX + 1.0).powf(-c));
        assert_relative_eq!(f_at_mid, fmax / 2.0, max_relative = 1e-9);

        // bracketed by the integer cycles on either side
        let below = calc_prd_fc(c.floor() as usize, DELTA_E, EMAX, FO);
        let above = calc_prd_fc(c.ceil() as usize, DELTA_E, EMAX, FO);
        assert!(below <= fmax / 2.0 && above >= fmax / 2.0);
    }

    #[test]
    fn test_nonlinear_r2() {
        let observed = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(nonlinear_r2(&observed, &observed).unwrap(), 1.0);

        let predicted = [2.5; 4];
        assert_relative_eq!(nonlinear_r2(&observed, &predicted).unwrap(), 0.0);

        assert!(nonlinear_r2(&observed, &[1.0]).is_err());
    }

    #[test]
    fn test_mean_and_cv() {
        assert!(mean_and_cv(&[]).is_none());
        let (mean, cv) = mean_and_cv(&[2.0, 4.0]).unwrap();
        assert_relative_eq!(mean, 3.0);
        assert_relative_eq!(cv, 2.0_f64.sqrt() / 3.0, epsilon = 1e-12);
    }
}
