//! Damped normal-equation solver for Levenberg–Marquardt steps.
//!
//! Each refinement iteration solves
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! for the step `δ`. With three parameters the system is tiny, so we use SVD
//! to stay robust when columns of `J` are nearly collinear (e.g. `M` is weakly
//! identified when the oscillation term is small).

use nalgebra::{DMatrix, DVector};

/// Floor applied to the diagonal scaling so a zero column still gets damped.
const DIAG_FLOOR: f64 = 1e-12;

/// Gauss–Newton pieces assembled from a Jacobian and residual vector.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    /// `JᵀJ`.
    pub jtj: DMatrix<f64>,
    /// `Jᵀr`.
    pub jtr: DVector<f64>,
}

impl NormalEquations {
    pub fn from_jacobian(jacobian: &DMatrix<f64>, residuals: &DVector<f64>) -> Self {
        let jt = jacobian.transpose();
        Self {
            jtj: &jt * jacobian,
            jtr: &jt * residuals,
        }
    }

    /// Solve for the damped step.
    ///
    /// Returns `None` if the system is too ill-conditioned to solve robustly or
    /// the step is not finite.
    pub fn damped_step(&self, lambda: f64) -> Option<DVector<f64>> {
        let mut a = self.jtj.clone();
        for i in 0..a.nrows() {
            a[(i, i)] += lambda * self.jtj[(i, i)].max(DIAG_FLOOR);
        }
        let b = -&self.jtr;
        solve_linear_system(&a, &b)
    }
}

/// Solve `a x = b` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}
