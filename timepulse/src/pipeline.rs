//! End-to-end pipeline configuration and orchestration
//!
//! [`DataPipeline`] chains calendar alignment, lag windowing and splitting into
//! one call driven by a [`PipelineConfig`]. Each pipeline owns its
//! configuration; nothing is shared between instances.

use crate::calendar::{merge_on_canonical_calendar, Frequency};
use crate::data::TimeSeriesTable;
use crate::error::{PulseError, Result};
use crate::features::windowed_dataframe;
use crate::models::ForecastModel;
use crate::runner::{run_model, ModelRun};
use crate::split::{chronological_split, stratified_split, SplitData, StratifiedSplitOptions};
use pulse_math::windows::{make_windows, train_test_split_windows, WindowSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// How windowed rows are divided into train and test sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStrategy {
    /// Shuffled, keeping the category shares of the splitter column
    #[default]
    Stratified,
    /// Earlier rows train, later rows test
    Chronological,
}

/// Settings of a [`DataPipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_column: String,
    pub splitter_column: String,
    pub window_size: usize,
    pub horizon: usize,
    pub test_size: f64,
    pub random_seed: u64,
    pub n_splits: usize,
    pub split_index: usize,
    pub frequency: Frequency,
    pub split_strategy: SplitStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "value".to_string(),
            splitter_column: "stringency_category".to_string(),
            window_size: 3,
            horizon: 1,
            test_size: 0.2,
            random_seed: 42,
            n_splits: 1,
            split_index: 0,
            frequency: Frequency::MonthEnd,
            split_strategy: SplitStrategy::Stratified,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the settings describe a runnable pipeline
    pub fn validate(&self) -> Result<()> {
        if self.target_column.is_empty() {
            return Err(PulseError::ConfigError("Target column must be named".to_string()));
        }
        if self.window_size == 0 {
            return Err(PulseError::ConfigError("Window size must be positive".to_string()));
        }
        if self.horizon == 0 {
            return Err(PulseError::ConfigError("Horizon must be positive".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PulseError::ConfigError(format!(
                "Test size must be between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.split_strategy == SplitStrategy::Stratified {
            if self.n_splits == 0 || self.split_index >= self.n_splits {
                return Err(PulseError::ConfigError(format!(
                    "Split index {} is out of range for {} split(s)",
                    self.split_index, self.n_splits
                )));
            }
            if self.target_column == self.splitter_column {
                return Err(PulseError::ConfigError(format!(
                    "Target column '{}' cannot also be the splitter column",
                    self.target_column
                )));
            }
        }
        Ok(())
    }

    /// Options for the stratified splitter
    pub fn split_options(&self) -> StratifiedSplitOptions {
        StratifiedSplitOptions {
            test_size: self.test_size,
            random_seed: self.random_seed,
            n_splits: self.n_splits,
            split_index: self.split_index,
        }
    }
}

/// Train and test windows of a single series
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSplit {
    pub train_windows: WindowSet,
    pub test_windows: WindowSet,
    pub train_labels: WindowSet,
    pub test_labels: WindowSet,
}

/// Merge, window and split tables according to a [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct DataPipeline {
    config: PipelineConfig,
}

impl DataPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Merge the auxiliary tables onto `base` and add lag columns of the target
    pub fn windowed(
        &self,
        base: &TimeSeriesTable,
        auxiliaries: &[&TimeSeriesTable],
    ) -> Result<TimeSeriesTable> {
        let merged = merge_on_canonical_calendar(base, auxiliaries, self.config.frequency)?;
        windowed_dataframe(&merged, &self.config.target_column, self.config.window_size)
    }

    /// Merge, window and split into train and test sets
    pub fn run(
        &self,
        base: &TimeSeriesTable,
        auxiliaries: &[&TimeSeriesTable],
    ) -> Result<SplitData> {
        let windowed = self.windowed(base, auxiliaries)?;
        debug!(
            rows = windowed.len(),
            columns = windowed.columns().len(),
            strategy = ?self.config.split_strategy,
            "splitting windowed table"
        );

        match self.config.split_strategy {
            SplitStrategy::Stratified => stratified_split(
                &windowed,
                &self.config.target_column,
                &self.config.splitter_column,
                &self.config.split_options(),
            ),
            SplitStrategy::Chronological => {
                chronological_split(&windowed, &self.config.target_column, self.config.test_size)
            }
        }
    }

    /// [`run`](Self::run) followed by [`run_model`]
    pub fn evaluate(
        &self,
        model: &mut dyn ForecastModel,
        base: &TimeSeriesTable,
        auxiliaries: &[&TimeSeriesTable],
    ) -> Result<ModelRun> {
        let split = self.run(base, auxiliaries)?;
        run_model(model, &split)
    }

    /// Sliding windows over the target column of `base`, split in time order
    pub fn univariate_windows(&self, base: &TimeSeriesTable) -> Result<WindowSplit> {
        let series = base.float_values(&self.config.target_column)?;
        let (windows, labels) =
            make_windows(&series, self.config.window_size, self.config.horizon)?;
        let (train_windows, test_windows, train_labels, test_labels) =
            train_test_split_windows(&windows, &labels, self.config.test_size)?;

        Ok(WindowSplit {
            train_windows,
            test_windows,
            train_labels,
            test_labels,
        })
    }
}
