//! The rotated, exponentially-enveloped oscillation model.
//!
//! ```text
//! e(t) = exp(M * |t|)
//! x(t) = t*cos(θ) - e(t)*sin(0.3t)*sin(θ) + X
//! y(t) = 42 + t*sin(θ) + e(t)*sin(0.3t)*cos(θ)
//! ```
//!
//! The fitter relies on two primitive operations:
//! - predict `(x(t), y(t))` for residuals/plots
//! - the partial derivatives of both outputs w.r.t. `(θ, M, X)` for refinement

use crate::domain::Params;

/// Fixed vertical bias of the `y` signal.
pub const VERTICAL_BIAS: f64 = 42.0;

/// Angular frequency of the enveloped oscillation.
pub const OSCILLATION_FREQ: f64 = 0.3;

/// Predict `(x(t), y(t))`.
///
/// Large `M * |t|` overflows `exp` to infinity; the result is then non-finite
/// and callers treat it as a very poor fit.
pub fn predict(params: &Params, t: f64) -> (f64, f64) {
    let (sin_th, cos_th) = params.theta.sin_cos();
    let wave = (params.m * t.abs()).exp() * (OSCILLATION_FREQ * t).sin();
    let x = t * cos_th - wave * sin_th + params.x_offset;
    let y = VERTICAL_BIAS + t * sin_th + wave * cos_th;
    (x, y)
}

/// Vectorized `predict` over a slice of `t` values.
pub fn predict_all(params: &Params, t: &[f64]) -> (Vec<f64>, Vec<f64>) {
    t.iter().map(|&ti| predict(params, ti)).unzip()
}

/// Partial derivatives of `x(t)` and `y(t)` with respect to `(θ, M, X)`.
///
/// Returns `(dx, dy)`, each ordered like `Params::to_array`.
pub fn jacobian_rows(params: &Params, t: f64) -> ([f64; 3], [f64; 3]) {
    let (sin_th, cos_th) = params.theta.sin_cos();
    let abs_t = t.abs();
    let wave = (params.m * abs_t).exp() * (OSCILLATION_FREQ * t).sin();

    let dx = [-t * sin_th - wave * cos_th, -abs_t * wave * sin_th, 1.0];
    let dy = [t * cos_th - wave * sin_th, abs_t * wave * cos_th, 0.0];
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_is_deterministic() {
        let p = Params::new(0.3, 0.01, 10.0);
        let t: Vec<f64> = (0..50).map(|i| 6.0 + i as f64).collect();
        assert_eq!(predict_all(&p, &t), predict_all(&p, &t));
    }

    #[test]
    fn predict_at_zero_angle_is_unrotated() {
        let p = Params::new(0.0, 0.0, 5.0);
        let t = 10.0;
        let (x, y) = predict(&p, t);
        assert!((x - 15.0).abs() < 1e-12);
        assert!((y - (VERTICAL_BIAS + (3.0_f64).sin())).abs() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let p = Params::new(0.4, 0.02, 12.0);
        let h = 1e-6;
        for &t in &[-7.5, 6.0, 23.0, 60.0] {
            let (dx, dy) = jacobian_rows(&p, t);
            for k in 0..3 {
                let mut up = p.to_array();
                let mut dn = p.to_array();
                up[k] += h;
                dn[k] -= h;
                let (xu, yu) = predict(&Params::from_array(up), t);
                let (xd, yd) = predict(&Params::from_array(dn), t);
                let fx = (xu - xd) / (2.0 * h);
                let fy = (yu - yd) / (2.0 * h);
                assert!((dx[k] - fx).abs() < 1e-5, "dx[{k}] at t={t}: {} vs {fx}", dx[k]);
                assert!((dy[k] - fy).abs() < 1e-5, "dy[{k}] at t={t}: {} vs {fy}", dy[k]);
            }
        }
    }

    #[test]
    fn overflow_yields_non_finite_prediction() {
        let p = Params::new(0.3, 0.05, 0.0);
        let (x, y) = predict(&p, 20_000.0);
        assert!(!x.is_finite() || !y.is_finite());
    }
}
