//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::FitResult;
use crate::fit::{GlobalOutcome, GlobalStatus, LocalOutcome};
use crate::io::ingest::IngestedData;

/// Format the full run summary (dataset, both optimizer stages, final parameters).
pub fn format_run_summary(
    ingest: &IngestedData,
    global: &GlobalOutcome,
    local: &LocalOutcome,
    fit: &FitResult,
) -> String {
    let mut out = String::new();
    let stats = &ingest.stats;

    out.push_str("=== spiral-fit ===\n");
    out.push_str(&format!("Columns: {}\n", ingest.headers.join(", ")));
    out.push_str(&format!(
        "Time axis: {}\n",
        ingest.observations.time_source.display_name()
    ));
    out.push_str(&format!(
        "Points: n={} | t=[{:.3}, {:.3}] | x=[{:.3}, {:.3}] | y=[{:.3}, {:.3}]\n",
        stats.n_points, stats.t_min, stats.t_max, stats.x_min, stats.x_max, stats.y_min, stats.y_max
    ));

    out.push_str("\nGlobal search (differential evolution):\n");
    out.push_str(&format!(
        "  θ={:.6} M={:.6} X={:.6} | L1={:.6}\n",
        global.best.theta, global.best.m, global.best.x_offset, global.value
    ));
    out.push_str(&format!(
        "  generations={} evaluations={} | {}\n",
        global.generations,
        global.evaluations,
        match global.status {
            GlobalStatus::Converged => "converged",
            GlobalStatus::MaxIterations => "iteration limit reached",
        }
    ));

    out.push_str("\nLocal refinement (bounded least squares):\n");
    out.push_str(&format!(
        "  cost {:.6e} -> {:.6e} | iterations={} evaluations={} | {}\n",
        local.initial_cost,
        local.cost,
        local.iterations,
        local.evaluations,
        local.status.description()
    ));

    out.push_str("\n=== Final Fitted Parameters ===\n");
    out.push_str(&format_fit(fit));
    out
}

/// Format the final parameters.
pub fn format_fit(fit: &FitResult) -> String {
    format!(
        "θ = {:.6} rad = {:.4}°\nM = {:.6}\nX = {:.6}\nL1 Distance = {:.6}\n",
        fit.params.theta, fit.theta_deg, fit.params.m, fit.params.x_offset, fit.l1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Params;

    #[test]
    fn fit_block_shows_angle_in_both_units() {
        let fit = FitResult::new(Params::new(std::f64::consts::FRAC_PI_6, 0.01, 10.0), 0.5);
        let text = format_fit(&fit);
        assert!(text.contains("θ = 0.523599 rad = 30.0000°"), "{text}");
        assert!(text.contains("M = 0.010000"));
        assert!(text.contains("X = 10.000000"));
        assert!(text.contains("L1 Distance = 0.500000"));
    }
}
