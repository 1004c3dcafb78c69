use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;

/// Errors raised while reading a batch file.
///
/// Every structural error aborts the whole parse; `line` is the 1-based
/// physical line in the file (comment lines included).
#[derive(Debug, thiserror::Error)]
pub enum AbfError {
    #[error("Failed to open batch file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read batch file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error("Row limit exceeded at line {line}: too many rows or missing END TIMESHEET tag (max {limit})")]
    RowLimitExceeded { line: usize, limit: usize },

    #[error("Invalid numeric field '{field}' at line {line}: '{value}'")]
    NumericField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Batch file {path} used after close")]
    UseAfterClose { path: PathBuf },
}

impl AbfError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        AbfError::MalformedInput {
            line,
            message: message.into(),
        }
    }

    /// Line the error was detected at, when it relates to file content.
    pub fn line(&self) -> Option<usize> {
        match self {
            AbfError::MalformedInput { line, .. }
            | AbfError::RowLimitExceeded { line, .. }
            | AbfError::NumericField { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Errors raised by the actiTIME driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Communication not initialized, call start first")]
    NotStarted,

    #[error("Request to actiTIME failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("actiTIME returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to decode actiTIME response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),
}
