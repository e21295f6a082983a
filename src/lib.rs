//! `spiral-fit` library crate.
//!
//! Fits the rotated, exponentially-enveloped spiral model to `(x, y)` samples
//! with a two-stage search: differential evolution over the parameter box,
//! then bounded Levenberg–Marquardt refinement.
//!
//! The binary (`spiralfit`) is a thin wrapper around this library so that
//! core logic is testable without spawning processes.

pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
