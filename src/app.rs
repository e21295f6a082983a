//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - runs the fit pipeline with the fixed configuration
//! - prints the summary and a terminal preview of the plot

use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

/// Terminal preview size (characters).
const PREVIEW_WIDTH: usize = 72;
const PREVIEW_HEIGHT: usize = 20;

/// Entry point for the `spiralfit` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    let config = FitConfig::default();
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.global, &run.local, &run.fit)
    );

    if config.terminal_preview {
        let plot = crate::plot::render_ascii_plot(
            &run.ingest.observations,
            &run.fit.params,
            PREVIEW_WIDTH,
            PREVIEW_HEIGHT,
        );
        println!("{plot}");
    }

    Ok(())
}

/// Install the `tracing` subscriber used for progress and notices.
///
/// The level is fixed at INFO; there is no environment-based configuration.
fn init_logging() {
    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .try_init();
}
