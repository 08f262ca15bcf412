//! # Timepulse
//!
//! A Rust library for building supervised-learning datasets from time series
//! and scoring forecasts.
//!
//! ## Features
//!
//! - Date-indexed tables with CSV and polars DataFrame I/O
//! - Alignment of auxiliary signals (holidays, policy stringency, weather) onto a
//!   canonical calendar
//! - Lagged feature columns and sliding windows
//! - Stratified and chronological train/test splits, reproducible from a seed
//! - A common model interface with a registry of model kinds
//! - Regression metrics (MAE, MSE, RMSE, MAPE, SMAPE, MASE, R²) from `pulse_math`
//!
//! ## Quick Start
//!
//! ```rust
//! use timepulse::calendar::Frequency;
//! use timepulse::collectors::holiday_count_table;
//! use timepulse::models::NaiveModel;
//! use timepulse::pipeline::{DataPipeline, PipelineConfig, SplitStrategy};
//! use timepulse::synthetic::{fixed_holidays, MockSeriesGenerator, PlaceStatistics};
//!
//! # fn main() -> timepulse::Result<()> {
//! // Monthly target series and a holiday count per month
//! let stats = PlaceStatistics::new(100.0, 15.0, 50.0, 150.0)?;
//! let base = MockSeriesGenerator::new(7).monthly_series(&stats, 2016, 2022)?;
//! let holidays = holiday_count_table(&fixed_holidays(2016, 2022), Frequency::MonthEnd)?;
//!
//! // Merge, add three lag columns and keep the last 20% of rows for testing
//! let config = PipelineConfig {
//!     split_strategy: SplitStrategy::Chronological,
//!     ..PipelineConfig::default()
//! };
//! let pipeline = DataPipeline::new(config)?;
//!
//! let run = pipeline.evaluate(&mut NaiveModel::default(), &base, &[&holidays])?;
//! assert!(run.metrics.is_finite());
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod collectors;
pub mod data;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod runner;
pub mod split;
pub mod synthetic;

// Re-export commonly used types
pub use crate::calendar::{merge_on_canonical_calendar, CanonicalDateRange, Frequency};
pub use crate::data::{DataLoader, FeatureMatrix, TimeSeriesTable};
pub use crate::error::{PulseError, Result};
pub use crate::features::windowed_dataframe;
pub use crate::models::{ForecastModel, ModelKind, ModelRegistry};
pub use crate::pipeline::{DataPipeline, PipelineConfig};
pub use crate::runner::{run_model, ModelRun};
pub use crate::split::{stratified_split, SplitData, StratifiedSplitOptions};
pub use pulse_math::{evaluate_preds, MetricReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
