//! Window optimization interleaved with nonlinear refits.

use approx::assert_relative_eq;
use lre_window::{
    analyze_batch, analyze_profile, AnalysisOptions, LreConfig, NonlinearFit, Profile,
    ProfileSummary, Result, WindowOutcome,
};

use crate::test_helpers::{approx_eq, lre_curve, noisy_lre_curve, CYCLES, EMAX};

const FO: f64 = 1e-5;
const FB: f64 = 50.0;

#[cfg(feature = "lm")]
mod levenberg_marquardt {
    use super::*;
    use lre_window::LmKineticFit;

    #[test]
    fn test_refit_recovers_exact_background() {
        let config = LreConfig::default();
        let fit = LmKineticFit::new(config.clone());
        let mut summary =
            ProfileSummary::detached(Profile::new("B1", lre_curve(FO, FB, CYCLES))).unwrap();

        let outcome =
            analyze_profile(&mut summary, &config, &AnalysisOptions::default(), Some(&fit))
                .unwrap();
        assert_eq!(outcome.window, WindowOutcome::Found);
        assert!(outcome.optimized);

        let p = summary.profile();
        assert!(p.nr_succeeded);
        assert!(approx_eq(p.fb, FB, 1e-3));
        assert_relative_eq!(p.emax, EMAX, max_relative = 1e-3);
        assert_relative_eq!(p.av_fo, FO, max_relative = 0.01);
    }

    #[test]
    fn test_refit_of_noisy_profile() {
        let config = LreConfig::default();
        let fit = LmKineticFit::new(config.clone());
        let raw = noisy_lre_curve(FO, FB, CYCLES, 0.02, 11);
        let mut summary = ProfileSummary::detached(Profile::new("B2", raw)).unwrap();

        let outcome =
            analyze_profile(&mut summary, &config, &AnalysisOptions::default(), Some(&fit))
                .unwrap();
        assert!(outcome.window.is_found());

        let p = summary.profile();
        assert!(p.has_window);
        assert_eq!(outcome.optimized, p.nr_succeeded);
        assert!(approx_eq(p.fb, FB, 0.1));
        assert!(approx_eq(p.emax, EMAX, 0.01));
    }

    #[test]
    fn test_batch_with_shared_fit() {
        let config = LreConfig::default();
        let fit = LmKineticFit::new(config.clone());
        let mut summaries: Vec<ProfileSummary> = (0..4)
            .map(|seed| {
                let raw = noisy_lre_curve(FO, FB, CYCLES, 0.02, 100 + seed);
                ProfileSummary::detached(Profile::new(format!("C{seed}"), raw)).unwrap()
            })
            .collect();

        let results = analyze_batch(
            &mut summaries,
            &config,
            &AnalysisOptions::default(),
            Some(&fit as &(dyn NonlinearFit + Sync)),
        );
        assert_eq!(results.len(), 4);
        for (result, summary) in results.iter().zip(summaries.iter()) {
            let outcome = result.as_ref().unwrap();
            assert!(outcome.window.is_found());
            assert!(approx_eq(summary.profile().emax, EMAX, 0.01));
        }
    }
}

#[test]
fn test_failing_refit_keeps_window() {
    let fit = |_: &mut ProfileSummary| -> Result<bool> { Ok(false) };
    let mut summary =
        ProfileSummary::detached(Profile::new("B3", lre_curve(FO, FB, CYCLES))).unwrap();

    let outcome = analyze_profile(
        &mut summary,
        &LreConfig::default(),
        &AnalysisOptions::default(),
        Some(&fit),
    )
    .unwrap();
    assert_eq!(outcome.window, WindowOutcome::Found);
    assert!(!outcome.optimized);
    assert!(summary.profile().has_window);
    assert!(summary.profile().window_size > 3);
}

#[test]
fn test_refit_disabled_by_options() {
    let fit = |_: &mut ProfileSummary| -> Result<bool> { panic!("refit must not run") };
    let mut summary =
        ProfileSummary::detached(Profile::new("B4", lre_curve(FO, FB, CYCLES))).unwrap();
    let options = AnalysisOptions::default().with_nonlinear_regression(false);

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &options, Some(&fit)).unwrap();
    assert!(outcome.optimized);
}
