//! Validity gating of replicate averages.

use std::sync::Arc;

use lre_window::{
    analyze_profile, AnalysisOptions, GateVerdict, LreConfig, Profile, ProfileSummary,
    ReplicateSet, WindowOutcome,
};

use crate::test_helpers::{lre_curve, noisy_lre_curve, CYCLES};

const FB: f64 = 50.0;

fn options() -> AnalysisOptions {
    AnalysisOptions::default().with_nonlinear_regression(false)
}

/// Analyze one replicate, optionally calibrated to `no` molecules.
fn replicate(name: &str, raw: Vec<f64>, no: Option<f64>) -> Arc<Profile> {
    let mut summary = ProfileSummary::detached(Profile::new(name, raw)).unwrap();
    analyze_profile(&mut summary, &LreConfig::default(), &options(), None).unwrap();
    let mut profile = summary.into_profile();
    if profile.has_window {
        profile.no = no;
    }
    Arc::new(profile)
}

/// Average profile over the raw readings of its replicates.
fn average(replicates: Vec<Arc<Profile>>) -> Profile {
    let n = replicates.len() as f64;
    let raw = (0..CYCLES)
        .map(|i| replicates.iter().map(|p| p.raw_fc()[i]).sum::<f64>() / n)
        .collect();
    Profile::average("average", raw, ReplicateSet::new(replicates))
}

fn triplicate(no: Option<f64>) -> Vec<Arc<Profile>> {
    (1..=3)
        .map(|seed| replicate(&format!("rep{seed}"), noisy_lre_curve(1e-5, FB, CYCLES, 0.02, seed), no))
        .collect()
}

#[test]
fn test_dilute_average_is_skipped_untouched() {
    let mut summary = ProfileSummary::detached(average(triplicate(None))).unwrap();
    let before = summary.profile().clone();

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &options(), None).unwrap();
    assert_eq!(
        outcome.window,
        WindowOutcome::Rejected(GateVerdict::BelowQuantityFloor)
    );
    assert_eq!(summary.profile(), &before);
    assert_eq!(summary.profile().fb, 0.0);
}

#[test]
fn test_calibrated_average_is_analyzed() {
    let mut summary = ProfileSummary::detached(average(triplicate(Some(2000.0)))).unwrap();
    assert!(summary.profile().is_average());

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &options(), None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::Found);
    assert!((summary.profile().av_fo - 1e-5).abs() < 1e-6);
}

#[test]
fn test_scattered_replicates_are_skipped() {
    let replicates = vec![
        replicate("low", lre_curve(1e-5, FB, CYCLES), Some(2000.0)),
        replicate("high", lre_curve(1e-4, FB, CYCLES), Some(20000.0)),
    ];
    let mut summary = ProfileSummary::detached(average(replicates)).unwrap();

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &options(), None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::Rejected(GateVerdict::Scattered));
    assert!(!summary.profile().has_window);
}

#[test]
fn test_failed_replicates_do_not_count() {
    let mut replicates = triplicate(Some(2000.0));
    replicates.push(replicate("ntc", vec![FB; CYCLES], Some(2000.0)));
    assert!(!replicates[3].has_window);

    let set = ReplicateSet::new(replicates);
    let config = LreConfig::default();
    assert!(set.are_sufficiently_clustered(config.replicate_cv_tolerance));
    assert_eq!(set.average_quantity(), Some(2000.0));
}
