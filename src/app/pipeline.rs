//! The fit pipeline: load -> global search -> local refinement -> persist -> plot.
//!
//! Every stage receives plain data from the previous one and returns plain
//! data; nothing outlives a single call of `run_fit`.

use tracing::{info, warn};

use crate::domain::{FitConfig, FitResult};
use crate::error::AppError;
use crate::fit::{GlobalOutcome, GlobalStatus, LocalOutcome, differential_evolution, l1_distance, refine};
use crate::io::export::write_results;
use crate::io::ingest::{IngestedData, load_observations};
use crate::plot::write_fit_plot;
use crate::report::build_fit_result;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub global: GlobalOutcome,
    pub local: LocalOutcome,
    pub fit: FitResult,
}

/// Execute the full pipeline and write the results file and plot.
///
/// Input errors abort before any output file is touched. Numerical trouble
/// (overflow, non-convergence) is logged and the run still completes.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load observations.
    let ingest = load_observations(&config.input_path)?;
    let obs = &ingest.observations;
    info!(
        n = obs.len(),
        time_source = ?obs.time_source,
        "observations loaded"
    );

    // 2) Global search on the L1 objective.
    info!(
        max_iter = config.global.max_iter,
        popsize = config.global.popsize,
        "running global optimization"
    );
    let global = differential_evolution(|p| l1_distance(p, obs), &config.bounds, &config.global);
    info!(
        theta = global.best.theta,
        m = global.best.m,
        x = global.best.x_offset,
        l1 = global.value,
        "global optimization result"
    );
    if global.status == GlobalStatus::MaxIterations {
        warn!(
            generations = global.generations,
            "global search hit its generation limit before converging; using best point found"
        );
    }

    // 3) Local least-squares refinement seeded by the global result.
    info!("running local least-squares refinement");
    let local = refine(obs, global.best, &config.bounds, &config.local);
    if local.status.converged() {
        info!(
            iterations = local.iterations,
            cost = local.cost,
            status = local.status.description(),
            "refinement converged"
        );
    } else {
        warn!(
            iterations = local.iterations,
            status = local.status.description(),
            "refinement did not converge; using last iterate"
        );
    }

    // 4) Final record.
    let fit = build_fit_result(local.params, obs);
    if !fit.l1.is_finite() {
        warn!("model evaluation overflowed at the fitted parameters; L1 is not finite");
    }

    // 5) Persist.
    write_results(&config.results_path, &fit)?;
    info!(path = %config.results_path.display(), "saved results");

    // 6) Plot. The results are already on disk, so a rendering failure is only logged.
    match write_fit_plot(
        &config.plot_path,
        obs,
        &fit.params,
        config.plot_width,
        config.plot_height,
    ) {
        Ok(()) => info!(path = %config.plot_path.display(), "saved plot"),
        Err(e) => warn!(error = %e, "failed to write plot"),
    }

    Ok(RunOutput {
        ingest,
        global,
        local,
        fit,
    })
}
