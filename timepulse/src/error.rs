//! Error types for the timepulse crate

use polars::prelude::PolarsError;
use pulse_math::MathError;
use thiserror::Error;

/// Custom error types for the timepulse crate
#[derive(Debug, Error)]
pub enum PulseError {
    /// Malformed or out-of-range input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error related to table contents or shape
    #[error("Data error: {0}")]
    DataError(String),

    /// Error raised by a model collaborator
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error in pipeline configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from window or metric calculations
    #[error(transparent)]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from CSV writing
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PulseError>;

impl From<PolarsError> for PulseError {
    fn from(err: PolarsError) -> Self {
        PulseError::PolarsError(err.to_string())
    }
}

impl From<csv::Error> for PulseError {
    fn from(err: csv::Error) -> Self {
        PulseError::CsvError(err.to_string())
    }
}
