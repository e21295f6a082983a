//! Two-stage parameter estimation.
//!
//! Responsibilities:
//!
//! - objective functions over the spiral model (L1 scalar, residual vector)
//! - global search over the parameter box (differential evolution)
//! - local bounded least-squares refinement (Levenberg–Marquardt)

pub mod global;
pub mod local;
pub mod objective;

pub use global::*;
pub use local::*;
pub use objective::*;
