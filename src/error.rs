//! Error types.
//!
//! `AppError` is the application boundary error: a message plus the process exit
//! code `main` should return. Library stages use typed errors (`DataError`) and
//! convert at the boundary.

/// Exit code for unusable input data.
pub const EXIT_BAD_INPUT: u8 = 2;
/// Exit code for failures writing outputs.
pub const EXIT_OUTPUT: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures while turning an input table into observations.
///
/// Both variants are fatal: the pipeline stops before any optimization runs
/// and before any output file is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// The source could not be read or parsed as a numeric table.
    #[error("data format error: {0}")]
    Format(String),

    /// The table has fewer than two usable columns.
    #[error("insufficient columns: found {found}, need at least 2")]
    InsufficientColumns { found: usize },
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::new(EXIT_BAD_INPUT, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_map_to_bad_input_exit_code() {
        let err: AppError = DataError::InsufficientColumns { found: 1 }.into();
        assert_eq!(err.exit_code(), EXIT_BAD_INPUT);
        assert!(err.to_string().contains("found 1"));
    }
}
