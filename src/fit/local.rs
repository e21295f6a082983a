//! Local refinement: bounded Levenberg–Marquardt on the residual vector.
//!
//! Minimizes `0.5 * Σ r²` where `r` is the `2N` residual vector, starting from
//! the global search result. Every trial point is projected onto the parameter
//! box, so the refiner never leaves it.
//!
//! Termination mirrors common least-squares solvers:
//! - `ftol`: accepted cost reduction `dF <= ftol * F`
//! - `xtol`: accepted step `‖δ‖ <= xtol * (xtol + ‖x‖)`
//! - `gtol`: projected gradient `‖g‖∞ <= gtol`
//!
//! Hitting the iteration cap or exhausting the damping range is not an error:
//! the last accepted iterate is returned with a status saying so.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{LocalSettings, Observations, ParamBounds, Params};
use crate::fit::objective::{finite_or_inf, residuals, sum_of_squares};
use crate::math::NormalEquations;
use crate::models::jacobian_rows;

/// Why the refiner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    CostTolerance,
    StepTolerance,
    GradientTolerance,
    /// The model reproduces the data exactly.
    ZeroResidual,
    MaxIterations,
    /// Damping grew past its limit without finding a lower cost.
    NoImprovement,
    /// The starting point already evaluates to a non-finite cost.
    NonFiniteStart,
}

impl LocalStatus {
    /// Whether a tolerance criterion was met.
    pub fn converged(self) -> bool {
        matches!(
            self,
            LocalStatus::CostTolerance
                | LocalStatus::StepTolerance
                | LocalStatus::GradientTolerance
                | LocalStatus::ZeroResidual
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            LocalStatus::CostTolerance => "cost change below ftol",
            LocalStatus::StepTolerance => "step size below xtol",
            LocalStatus::GradientTolerance => "gradient below gtol",
            LocalStatus::ZeroResidual => "zero residual",
            LocalStatus::MaxIterations => "iteration limit reached",
            LocalStatus::NoImprovement => "no further improvement possible",
            LocalStatus::NonFiniteStart => "non-finite cost at starting point",
        }
    }
}

/// Refined estimate.
#[derive(Debug, Clone)]
pub struct LocalOutcome {
    pub params: Params,
    /// Final `0.5 * Σ r²`.
    pub cost: f64,
    pub initial_cost: f64,
    pub iterations: usize,
    /// Residual evaluations, including rejected trial steps.
    pub evaluations: usize,
    pub status: LocalStatus,
}

/// Refine `start` by bounded least squares.
pub fn refine(obs: &Observations, start: Params, bounds: &ParamBounds, settings: &LocalSettings) -> LocalOutcome {
    let mut x = bounds.clamp(start);
    let mut r = residuals(&x, obs);
    let mut cost = finite_or_inf(sum_of_squares(&r));
    let initial_cost = cost;
    let mut evaluations = 1;
    let mut iterations = 0;
    let mut lambda = settings.initial_lambda;

    let finish = |params: Params, cost: f64, iterations: usize, evaluations: usize, status: LocalStatus| LocalOutcome {
        params,
        cost,
        initial_cost,
        iterations,
        evaluations,
        status,
    };

    if !cost.is_finite() {
        return finish(x, cost, 0, evaluations, LocalStatus::NonFiniteStart);
    }
    if cost == 0.0 {
        return finish(x, cost, 0, evaluations, LocalStatus::ZeroResidual);
    }

    while iterations < settings.max_iter {
        iterations += 1;

        let jac = build_jacobian(&x, obs);
        let ne = NormalEquations::from_jacobian(&jac, &DVector::from_column_slice(&r));

        if projected_gradient_norm(&x, &ne.jtr, bounds) <= settings.gtol {
            return finish(x, cost, iterations, evaluations, LocalStatus::GradientTolerance);
        }

        // Inner loop: raise damping until a step lowers the cost.
        loop {
            let Some(step) = ne.damped_step(lambda) else {
                lambda *= settings.lambda_up;
                if lambda > settings.max_lambda {
                    return finish(x, cost, iterations, evaluations, LocalStatus::NoImprovement);
                }
                continue;
            };

            let trial = project_step(&x, &step, bounds);
            let taken = step_norm(&x, &trial);
            if taken <= settings.xtol * (settings.xtol + param_norm(&x)) {
                return finish(x, cost, iterations, evaluations, LocalStatus::StepTolerance);
            }

            let trial_r = residuals(&trial, obs);
            let trial_cost = finite_or_inf(sum_of_squares(&trial_r));
            evaluations += 1;

            if trial_cost < cost {
                let reduction = cost - trial_cost;
                let previous = cost;
                x = trial;
                r = trial_r;
                cost = trial_cost;
                lambda = (lambda * settings.lambda_down).max(f64::MIN_POSITIVE);
                debug!(iteration = iterations, cost, lambda, "refinement step accepted");

                if cost == 0.0 {
                    return finish(x, cost, iterations, evaluations, LocalStatus::ZeroResidual);
                }
                if reduction <= settings.ftol * previous {
                    return finish(x, cost, iterations, evaluations, LocalStatus::CostTolerance);
                }
                if taken <= settings.xtol * (settings.xtol + param_norm(&x)) {
                    return finish(x, cost, iterations, evaluations, LocalStatus::StepTolerance);
                }
                break;
            }

            lambda *= settings.lambda_up;
            if lambda > settings.max_lambda {
                return finish(x, cost, iterations, evaluations, LocalStatus::NoImprovement);
            }
        }
    }

    finish(x, cost, iterations, evaluations, LocalStatus::MaxIterations)
}

/// `2N × 3` Jacobian of the residual vector (x block rows first).
fn build_jacobian(params: &Params, obs: &Observations) -> DMatrix<f64> {
    let n = obs.len();
    let mut jac = DMatrix::<f64>::zeros(2 * n, Params::DIM);
    for (i, &t) in obs.t.iter().enumerate() {
        let (dx, dy) = jacobian_rows(params, t);
        for k in 0..Params::DIM {
            jac[(i, k)] = dx[k];
            jac[(n + i, k)] = dy[k];
        }
    }
    jac
}

/// Gradient infinity norm, ignoring components that push against an active bound.
fn projected_gradient_norm(x: &Params, gradient: &DVector<f64>, bounds: &ParamBounds) -> f64 {
    let v = x.to_array();
    let lo = bounds.lower();
    let hi = bounds.upper();
    let mut norm: f64 = 0.0;
    for k in 0..Params::DIM {
        let g = gradient[k];
        // Descent moves along -g.
        let blocked = (v[k] <= lo[k] && g > 0.0) || (v[k] >= hi[k] && g < 0.0);
        if !blocked {
            norm = norm.max(g.abs());
        }
    }
    norm
}

fn project_step(x: &Params, step: &DVector<f64>, bounds: &ParamBounds) -> Params {
    let mut v = x.to_array();
    for k in 0..Params::DIM {
        v[k] += step[k];
    }
    bounds.clamp(Params::from_array(v))
}

fn step_norm(a: &Params, b: &Params) -> f64 {
    a.to_array()
        .iter()
        .zip(b.to_array())
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

fn param_norm(p: &Params) -> f64 {
    p.to_array().iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSource;
    use crate::math::lin_space;
    use crate::models::predict_all;

    fn exact_obs(p: &Params, n: usize) -> Observations {
        let t = lin_space(6.0, 60.0, n);
        let (x, y) = predict_all(p, &t);
        Observations::new(t, x, y, TimeSource::Named)
    }

    #[test]
    fn recovers_true_params_from_nearby_start() {
        let truth = Params::new(0.3, 0.01, 10.0);
        let obs = exact_obs(&truth, 50);
        let out = refine(
            &obs,
            Params::new(0.33, 0.008, 12.0),
            &ParamBounds::default(),
            &LocalSettings::default(),
        );
        assert!(out.status.converged(), "{:?}", out.status);
        assert!((out.params.theta - 0.3).abs() < 1e-8, "{:?}", out.params);
        assert!((out.params.m - 0.01).abs() < 1e-8, "{:?}", out.params);
        assert!((out.params.x_offset - 10.0).abs() < 1e-6, "{:?}", out.params);
        assert!(out.cost < 1e-12);
        assert!(out.cost <= out.initial_cost);
    }

    #[test]
    fn stays_inside_box_when_optimum_is_outside() {
        // Data generated with X = -5 while the box requires X >= 0.
        let truth = Params::new(0.3, 0.01, -5.0);
        let obs = exact_obs(&truth, 30);
        let bounds = ParamBounds::default();
        let out = refine(&obs, Params::new(0.3, 0.01, 20.0), &bounds, &LocalSettings::default());
        assert!(bounds.contains(&out.params));
        assert!(out.params.x_offset.abs() < 1e-6, "{:?}", out.params);
    }

    #[test]
    fn exact_start_reports_zero_residual() {
        let truth = Params::new(0.3, 0.01, 10.0);
        let obs = exact_obs(&truth, 20);
        let out = refine(&obs, truth, &ParamBounds::default(), &LocalSettings::default());
        assert_eq!(out.status, LocalStatus::ZeroResidual);
        assert_eq!(out.iterations, 0);
        assert_eq!(out.params, truth);
    }

    #[test]
    fn iteration_cap_returns_last_iterate() {
        let truth = Params::new(0.3, 0.01, 10.0);
        let obs = exact_obs(&truth, 50);
        let settings = LocalSettings {
            max_iter: 1,
            ..LocalSettings::default()
        };
        let start = Params::new(0.5, -0.01, 40.0);
        let out = refine(&obs, start, &ParamBounds::default(), &settings);
        assert!(out.iterations <= 1);
        assert!(out.cost <= out.initial_cost);
        assert!(ParamBounds::default().contains(&out.params));
    }

    #[test]
    fn non_finite_start_is_reported() {
        let obs = Observations::new(vec![20_000.0], vec![0.0], vec![0.0], TimeSource::Named);
        let out = refine(
            &obs,
            Params::new(0.3, 0.05, 0.0),
            &ParamBounds::default(),
            &LocalSettings::default(),
        );
        assert_eq!(out.status, LocalStatus::NonFiniteStart);
        assert!(!out.status.converged());
    }
}
