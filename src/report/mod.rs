//! Reporting utilities: final fit record and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{FitResult, Observations, Params};
use crate::fit::l1_distance;

/// Build the final fit record for `params` against `obs`.
pub fn build_fit_result(params: Params, obs: &Observations) -> FitResult {
    FitResult::new(params, l1_distance(&params, obs))
}
