//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations and their provenance (`Observations`, `TimeSource`)
//! - model parameters and the admissible box (`Params`, `ParamBounds`)
//! - run configuration (`FitConfig`, `GlobalSettings`, `LocalSettings`)
//! - fit outputs (`FitResult`)

pub mod types;

pub use types::*;
