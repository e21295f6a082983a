//! Error formulations over the spiral model.
//!
//! Two different losses are used on purpose:
//! - the global search minimizes the L1 distance (robust to outliers)
//! - the local refiner minimizes the sum of squares of the residual vector
//!
//! Non-finite model output propagates into non-finite objective values. The
//! optimizers map those to `+∞` so they never win a comparison.

use crate::domain::{Observations, Params};
use crate::models::predict;

/// Residual vector `[x_model - x_data ..., y_model - y_data ...]` of length `2N`.
pub fn residuals(params: &Params, obs: &Observations) -> Vec<f64> {
    let n = obs.len();
    let mut out = vec![0.0; 2 * n];
    for i in 0..n {
        let (xm, ym) = predict(params, obs.t[i]);
        out[i] = xm - obs.x[i];
        out[n + i] = ym - obs.y[i];
    }
    out
}

/// Total L1 distance `Σ |x_model - x_data| + |y_model - y_data|`.
pub fn l1_distance(params: &Params, obs: &Observations) -> f64 {
    obs.t
        .iter()
        .zip(obs.x.iter().zip(obs.y.iter()))
        .map(|(&t, (&x, &y))| {
            let (xm, ym) = predict(params, t);
            (xm - x).abs() + (ym - y).abs()
        })
        .sum()
}

/// Least-squares cost `0.5 * Σ r²`.
pub fn sum_of_squares(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// Map non-finite objective values to `+∞`.
pub fn finite_or_inf(value: f64) -> f64 {
    if value.is_finite() { value } else { f64::INFINITY }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSource;
    use crate::models::predict_all;

    fn exact_obs(p: &Params) -> Observations {
        let t: Vec<f64> = (0..8).map(|i| 6.0 + 7.0 * i as f64).collect();
        let (x, y) = predict_all(p, &t);
        Observations::new(t, x, y, TimeSource::Named)
    }

    #[test]
    fn residuals_vanish_at_true_params() {
        let p = Params::new(0.3, 0.01, 10.0);
        let obs = exact_obs(&p);
        let r = residuals(&p, &obs);
        assert_eq!(r.len(), 2 * obs.len());
        assert!(r.iter().all(|v| *v == 0.0));
        assert_eq!(l1_distance(&p, &obs), 0.0);
    }

    #[test]
    fn residual_blocks_are_x_then_y() {
        let p = Params::new(0.3, 0.01, 10.0);
        let obs = exact_obs(&p);
        let shifted = Params::new(0.3, 0.01, 11.0);
        let r = residuals(&shifted, &obs);
        let n = obs.len();
        assert!(r[..n].iter().all(|v| (v - 1.0).abs() < 1e-12));
        assert!(r[n..].iter().all(|v| v.abs() < 1e-12));
        assert!((l1_distance(&shifted, &obs) - n as f64).abs() < 1e-9);
        assert!((sum_of_squares(&r) - 0.5 * n as f64).abs() < 1e-9);
    }

    #[test]
    fn non_finite_maps_to_infinity() {
        assert_eq!(finite_or_inf(f64::NAN), f64::INFINITY);
        assert_eq!(finite_or_inf(f64::NEG_INFINITY), f64::INFINITY);
        assert_eq!(finite_or_inf(2.0), 2.0);
    }
}
