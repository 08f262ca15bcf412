//! Forecasting models consumed by the pipeline
//!
//! A model goes through `build`, an optional `compile`, `fit` and `predict`,
//! always in that order. [`ModelRegistry`] maps each [`ModelKind`] to a
//! factory so callers can pick a model from configuration; the neural and
//! boosted-tree kinds are registered by the crates that provide them.

use crate::data::FeatureMatrix;
use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::str::FromStr;

pub mod linear;
pub mod naive;

pub use linear::LinearModel;
pub use naive::NaiveModel;

/// Family a forecasting model belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Persistence forecast: the last observed value
    Naive,
    /// Ridge regression on the feature columns
    Linear,
    /// Fully connected network
    Dense,
    /// Recurrent network
    Recurrent,
    /// Stack of residual blocks
    ResidualStack,
    /// Gradient-boosted trees
    BoostedTree,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::Naive,
        ModelKind::Linear,
        ModelKind::Dense,
        ModelKind::Recurrent,
        ModelKind::ResidualStack,
        ModelKind::BoostedTree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Naive => "naive",
            ModelKind::Linear => "linear",
            ModelKind::Dense => "dense",
            ModelKind::Recurrent => "recurrent",
            ModelKind::ResidualStack => "residual-stack",
            ModelKind::BoostedTree => "boosted-tree",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| PulseError::InvalidArgument(format!("Unknown model kind: {}", s)))
    }
}

/// A forecasting model driven by [`run_model`](crate::runner::run_model)
pub trait ForecastModel: Debug + Send {
    /// Name of the model
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    /// Prepare a fresh, untrained model; discards any earlier fit
    fn build(&mut self) -> Result<()>;

    /// Configure training; most models have nothing to do here
    fn compile(&mut self) -> Result<()> {
        Ok(())
    }

    /// Train on `x_train`/`y_train`, using `x_val`/`y_val` for monitoring only
    fn fit(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[f64],
        x_val: &FeatureMatrix,
        y_val: &[f64],
    ) -> Result<()>;

    /// One prediction per row of `x`
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// Factory producing a fresh model instance
pub type ModelFactory = Box<dyn Fn() -> Box<dyn ForecastModel> + Send + Sync>;

/// Factories of forecasting models keyed by kind
pub struct ModelRegistry {
    factories: HashMap<ModelKind, ModelFactory>,
}

impl ModelRegistry {
    /// A registry without any factory
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding the naive and linear models with default settings
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ModelKind::Naive, || Box::new(NaiveModel::default()));
        registry.register(ModelKind::Linear, || Box::new(LinearModel::default()));
        registry
    }

    /// Register or replace the factory for `kind`
    pub fn register<F>(&mut self, kind: ModelKind, factory: F)
    where
        F: Fn() -> Box<dyn ForecastModel> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// A new model of `kind`
    pub fn create(&self, kind: ModelKind) -> Result<Box<dyn ForecastModel>> {
        self.factories
            .get(&kind)
            .map(|factory| factory())
            .ok_or_else(|| {
                PulseError::ModelError(format!("No model registered for kind '{}'", kind))
            })
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<ModelKind> {
        let mut kinds: Vec<ModelKind> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Check that a feature matrix and a label vector describe the same rows
pub(crate) fn check_rows(x: &FeatureMatrix, y: &[f64], what: &str) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(PulseError::ModelError(format!(
            "{} features have {} rows but {} labels",
            what,
            x.n_rows(),
            y.len()
        )));
    }
    Ok(())
}
