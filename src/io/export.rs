//! Flat results file (`fit_results.txt`).
//!
//! Exactly five `name,value` lines, no header:
//!
//! ```text
//! theta_rad,<f64>
//! theta_deg,<f64>
//! M,<f64>
//! X,<f64>
//! L1,<f64>
//! ```
//!
//! Values are written in shortest round-trip form, so reading the file back
//! reproduces the solver's numbers bit for bit. The file is overwritten in
//! place; a crash mid-write can leave it partial.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::FitResult;
use crate::error::{AppError, EXIT_OUTPUT};

/// Keys in file order.
pub const RESULT_KEYS: [&str; 5] = ["theta_rad", "theta_deg", "M", "X", "L1"];

#[derive(Debug, Serialize, Deserialize)]
struct ResultLine {
    name: String,
    value: f64,
}

/// The five values of a results file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultsRecord {
    pub theta_rad: f64,
    pub theta_deg: f64,
    pub m: f64,
    pub x_offset: f64,
    pub l1: f64,
}

impl From<&FitResult> for ResultsRecord {
    fn from(fit: &FitResult) -> Self {
        Self {
            theta_rad: fit.params.theta,
            theta_deg: fit.theta_deg,
            m: fit.params.m,
            x_offset: fit.params.x_offset,
            l1: fit.l1,
        }
    }
}

impl ResultsRecord {
    fn values(&self) -> [f64; 5] {
        [self.theta_rad, self.theta_deg, self.m, self.x_offset, self.l1]
    }
}

/// Write the results file, replacing any previous one.
pub fn write_results(path: &Path, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to create results file '{}': {e}", path.display()),
        )
    })?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    let record = ResultsRecord::from(fit);

    for (name, value) in RESULT_KEYS.iter().zip(record.values()) {
        writer
            .serialize(ResultLine {
                name: (*name).to_string(),
                value,
            })
            .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write results line: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to flush results file: {e}")))?;

    Ok(())
}

/// Read a results file written by `write_results`.
pub fn read_results(path: &Path) -> Result<ResultsRecord, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to open results file '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(file);
    let mut values = [f64::NAN; 5];
    let mut count = 0usize;

    for line in reader.deserialize::<ResultLine>() {
        let line =
            line.map_err(|e| AppError::new(EXIT_OUTPUT, format!("Invalid results line: {e}")))?;
        let Some(expected) = RESULT_KEYS.get(count) else {
            return Err(AppError::new(EXIT_OUTPUT, "Results file has more than five lines."));
        };
        if line.name != *expected {
            return Err(AppError::new(
                EXIT_OUTPUT,
                format!("Expected key `{expected}` on line {}, found `{}`.", count + 1, line.name),
            ));
        }
        values[count] = line.value;
        count += 1;
    }

    if count != RESULT_KEYS.len() {
        return Err(AppError::new(
            EXIT_OUTPUT,
            format!("Results file has {count} lines, expected five."),
        ));
    }

    Ok(ResultsRecord {
        theta_rad: values[0],
        theta_deg: values[1],
        m: values[2],
        x_offset: values[3],
        l1: values[4],
    })
}
