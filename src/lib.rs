//! # lre-window
//!
//! `lre-window` selects the linear regression of efficiency (LRE) window of
//! a qPCR amplification profile and derives its kinetic parameters: maximal
//! efficiency (Emax), loss in efficiency per fluorescence unit (deltaE),
//! maximal fluorescence (Fmax), the half-maximal cycle (C1/2) and the target
//! quantity in fluorescence units (Fo).
//!
//! The library provides:
//! - Per-cycle records with local five-point LRE regressions
//! - A scanning window search with repositioning to C1/2
//! - Start cycle selection from a minimum fluorescence threshold
//! - Window expansion, optionally interleaved with a nonlinear refit of the
//!   working dataset (Levenberg-Marquardt, behind the `lm` feature)
//! - Replicate average gating, background subtraction, and a parallel batch
//!   analysis of independent profiles
//!
//! ## Basic Usage
//!
//! ```
//! use lre_window::{analyze_profile, AnalysisOptions, LreConfig, Profile, ProfileSummary};
//! use lre_window::kinetics::calc_prd_fc;
//!
//! let readings = (1..=45).map(|c| calc_prd_fc(c, -0.001, 0.9, 0.005)).collect();
//! let mut summary = ProfileSummary::detached(Profile::new("A1", readings)).unwrap();
//!
//! let options = AnalysisOptions::default()
//!     .with_background_subtraction(false)
//!     .with_nonlinear_regression(false);
//! let outcome = analyze_profile(&mut summary, &LreConfig::default(), &options, None).unwrap();
//!
//! assert!(outcome.window.is_found());
//! assert!((summary.profile().emax - 0.9).abs() < 1e-6);
//! ```

pub mod analysis;
pub mod config;
pub mod cycle;
pub mod error;
pub mod kinetics;
pub mod nonlinear;
pub mod problem;
pub mod profile;
pub mod summary;
pub mod window;

mod utils;

#[cfg(feature = "lm")]
pub mod lm;

// Re-exports for convenience
pub use analysis::{analyze_batch, analyze_profile, AnalysisOutcome};
pub use config::{AnalysisOptions, LreConfig};
pub use cycle::{Cycle, CycleSeries};
pub use error::{LreError, Result};
pub use nonlinear::NonlinearFit;
pub use profile::{Profile, ReplicateSet};
pub use summary::{JsonLinesStore, MemoryStore, NullStore, ProfileStore, ProfileSummary};
pub use window::{GateVerdict, WindowOutcome};

#[cfg(feature = "lm")]
pub use lm::LevenbergMarquardt;

#[cfg(feature = "lm")]
pub use nonlinear::LmKineticFit;

pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
