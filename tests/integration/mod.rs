//! End-to-end analyses of synthetic amplification profiles.

mod nonlinear_fit;
mod replicates;
mod window_selection;
