//! Input/output helpers.
//!
//! - CSV ingest + column resolution (`ingest`)
//! - flat results file (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
