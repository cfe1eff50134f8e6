use thiserror::Error;

use crate::common::error::WalltimeError::GenericError;

/// Reason why a row of a historical dataset (or of a requests file) is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetIssue {
    #[error("the header row is missing")]
    MissingHeader,
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("column `{column}` has a non-numeric value `{value}`")]
    NotNumeric { column: &'static str, value: String },
    #[error("unsupported number of processes {0} (supported: 1, 2, 4, 8, 16, 32)")]
    UnsupportedProcessCount(u64),
    #[error("invalid structural feature count {0} (use -1 for not applicable)")]
    InvalidFeatureCount(i64),
    #[error("column `{column}` must be a positive number, found `{value}`")]
    NonPositive { column: &'static str, value: String },
    #[error("the task name is empty")]
    EmptyTaskName,
    #[error("duplicate record key, first seen at line {first_line}")]
    DuplicateKey { first_line: usize },
}

#[derive(Debug, Error)]
pub enum WalltimeError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Invalid dataset at line {line}: {issue}")]
    DatasetFormat { line: usize, issue: DatasetIssue },
    #[error("Invalid request at line {line}: {issue}")]
    RequestFormat { line: usize, issue: DatasetIssue },
    #[error("Unsupported number of processes {0} (supported: 1, 2, 4, 8, 16, 32)")]
    UnsupportedProcessCount(u64),
    #[error("Invalid structural feature count {0} (use -1 for not applicable)")]
    InvalidFeatureCount(i64),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl WalltimeError {
    pub fn dataset(line: usize, issue: DatasetIssue) -> Self {
        Self::DatasetFormat { line, issue }
    }
}

impl From<serde_json::error::Error> for WalltimeError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for WalltimeError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<toml::de::Error> for WalltimeError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigError(error.to_string())
    }
}

impl From<String> for WalltimeError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}
