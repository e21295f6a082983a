//! Mathematical utilities: grids and damped least-squares steps.

pub mod grid;
pub mod ols;

pub use grid::*;
pub use ols::*;
