//! Levenberg-Marquardt solver.
//!
//! Used to refit the working fluorescence dataset against the LRE kinetic
//! model; see [`crate::nonlinear`].

pub mod algorithm;
pub mod config;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
