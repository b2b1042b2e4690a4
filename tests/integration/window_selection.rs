//! Window selection on background-offset, noisy profiles.

use std::sync::Arc;

use approx::assert_relative_eq;
use lre_window::{
    analyze_batch, analyze_profile, AnalysisOptions, JsonLinesStore, LreConfig, MemoryStore,
    Profile, ProfileSummary, WindowOutcome,
};

use crate::test_helpers::{approx_eq, lre_curve, noisy_lre_curve, CYCLES, EMAX};

const FO: f64 = 1e-5;
const FB: f64 = 50.0;

fn linear_options() -> AnalysisOptions {
    AnalysisOptions::default().with_nonlinear_regression(false)
}

#[test]
fn test_noisy_profile_recovers_kinetics() {
    let raw = noisy_lre_curve(FO, FB, CYCLES, 0.05, 7);
    let mut summary = ProfileSummary::detached(Profile::new("A1", raw)).unwrap();

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &linear_options(), None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::Found);
    assert!(outcome.optimized);

    let p = summary.profile();
    assert!(p.has_window);
    assert!(approx_eq(p.fb, FB, 0.1));
    assert!(approx_eq(p.emax, EMAX, 0.01));
    assert_relative_eq!(p.av_fo, FO, max_relative = 0.1);
    assert!(approx_eq(p.mid_c, 28.5, 0.5));
    assert_eq!(p.start_cycle, p.mid_c.floor() as usize);
    assert!(p.window_size >= 3);
    assert!(p.r2 > 0.99);
}

#[test]
fn test_window_stays_below_fmax_ceiling() {
    let config = LreConfig::default();
    let mut summary =
        ProfileSummary::detached(Profile::new("A2", lre_curve(FO, FB, CYCLES))).unwrap();
    analyze_profile(&mut summary, &config, &linear_options(), None).unwrap();

    let p = summary.profile();
    let ceiling = p.fmax * config.fmax_ceiling_fraction;
    let window = summary.cycles().window(p.start_cycle, p.window_size).unwrap();
    assert!(window.iter().all(|c| c.fc < ceiling));
    for cycle in window {
        assert!(cycle.fo_frac_av.abs() < 0.06);
    }
}

#[test]
fn test_min_fc_sets_start_cycle() {
    let mut summary =
        ProfileSummary::detached(Profile::new("A3", lre_curve(FO, FB, CYCLES))).unwrap();
    let options = linear_options().with_min_fc(100.0);
    let outcome = analyze_profile(&mut summary, &LreConfig::default(), &options, None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::Found);

    let p = summary.profile();
    let crossing = p.fc().iter().skip(1).position(|&f| f >= 100.0).unwrap() + 2;
    assert_eq!(p.start_cycle, crossing + 1);
}

#[test]
fn test_partial_profile_is_zeroed_and_persisted() {
    let store = Arc::new(MemoryStore::new());
    let profile = Profile::new("A4", lre_curve(FO, FB, 26));
    let mut summary = ProfileSummary::new(profile, store.clone()).unwrap();

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &linear_options(), None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::IncompleteProfile);
    assert!(summary.profile().lre_variables_are_zero());

    let latest = store.latest().unwrap();
    assert!(!latest.has_window);
    assert_eq!(latest.fmax, 0.0);
}

#[test]
fn test_unanalyzable_profile_returns_normally() {
    let mut summary = ProfileSummary::detached(Profile::new("NTC", vec![FB; CYCLES])).unwrap();
    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &linear_options(), None).unwrap();
    assert_eq!(outcome.window, WindowOutcome::NotFound);
    assert!(summary.window_end_cycle().is_none());
}

#[test]
fn test_every_update_is_written_as_json() {
    let store = Arc::new(JsonLinesStore::new(Vec::new()));
    let profile = Profile::new("A5", lre_curve(FO, FB, CYCLES));
    let mut summary = ProfileSummary::new(profile, store.clone()).unwrap();
    analyze_profile(&mut summary, &LreConfig::default(), &linear_options(), None).unwrap();
    let analyzed = summary.into_profile();

    let store = Arc::try_unwrap(store).unwrap();
    let text = String::from_utf8(store.into_inner().unwrap()).unwrap();
    let records: Vec<Profile> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // background, scan, reposition, reset, then one per growth step
    assert!(records.len() >= 4);
    let last = records.last().unwrap();
    assert_eq!(last.name, analyzed.name);
    assert_eq!(
        (last.start_cycle, last.window_size, last.has_window),
        (analyzed.start_cycle, analyzed.window_size, analyzed.has_window)
    );
    assert_relative_eq!(last.emax, analyzed.emax, max_relative = 1e-12);
    assert_relative_eq!(last.av_fo, analyzed.av_fo, max_relative = 1e-12);
    assert_eq!(last.fc().len(), CYCLES);
}

#[test]
fn test_batch_matches_sequential_analysis() {
    let config = LreConfig::default();
    let options = linear_options();
    let curves: Vec<Vec<f64>> = (0..8)
        .map(|seed| noisy_lre_curve(FO, FB, CYCLES, 0.02, seed))
        .collect();
    let summaries = || -> Vec<ProfileSummary> {
        curves
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                ProfileSummary::detached(Profile::new(format!("W{i}"), raw.clone())).unwrap()
            })
            .collect()
    };

    let mut parallel = summaries();
    let results = analyze_batch(&mut parallel, &config, &options, None);
    assert!(results.iter().all(|r| r.as_ref().unwrap().window.is_found()));

    let mut sequential = summaries();
    for (seq, par) in sequential.iter_mut().zip(parallel.iter()) {
        analyze_profile(seq, &config, &options, None).unwrap();
        assert_eq!(seq.profile(), par.profile());
    }
}

#[test]
fn test_emax_override_changes_derived_values_only() {
    let mut profile = Profile::new("A6", lre_curve(FO, FB, CYCLES));
    profile.emax_override = Some(0.85);
    let mut summary = ProfileSummary::detached(profile).unwrap();

    let outcome =
        analyze_profile(&mut summary, &LreConfig::default(), &linear_options(), None).unwrap();
    assert!(outcome.window.is_found());

    let p = summary.profile();
    assert!(approx_eq(p.emax, EMAX, 1e-3));
    assert_eq!(p.effective_emax(), 0.85);
    assert!(p.av_fo > FO);
}
