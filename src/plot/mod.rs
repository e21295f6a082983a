//! Visualization: PNG diagnostic plot and terminal preview.

pub mod ascii;
pub mod png;

pub use ascii::*;
pub use png::*;

use crate::domain::{Observations, Params};
use crate::math::lin_space;
use crate::models::predict;

/// Sample the fitted model in the `(x, y)` plane over the data's `t` range.
///
/// Falls back to the observed `t` values when the range is degenerate.
pub fn model_curve(obs: &Observations, fitted: &Params, samples: usize) -> Vec<(f64, f64)> {
    let (lo, hi) = obs
        .t
        .iter()
        .filter(|t| t.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));

    let t = if lo.is_finite() && hi > lo {
        lin_space(lo, hi, samples.max(2))
    } else {
        obs.t.clone()
    };

    t.iter().map(|&ti| predict(fitted, ti)).collect()
}
