//! Numerical helpers for the nonlinear solver.

pub mod finite_difference;
