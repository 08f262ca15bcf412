//! # Pulse Math
//!
//! Numeric kernels for the timepulse forecasting toolkit.
//! This crate turns one-dimensional series into supervised-learning windows
//! and scores predictions with a fixed suite of regression metrics.

use thiserror::Error;

pub mod metrics;
pub mod windows;

pub use metrics::{evaluate_preds, evaluate_preds_multi_horizon, MetricReport};
pub use windows::{labelled_windows, make_windows, train_test_split_windows, WindowSet};

/// Errors that can occur in window and metric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result type for window and metric operations
pub type Result<T> = std::result::Result<T, MathError>;
