//! Per-column feature scaling
//!
//! Scalers work on row-major buffers with a fixed number of columns. A model
//! asks [`ScalerKind::build`] for a fresh scaler on every fit, so no fitted
//! state is ever shared between models or calls.

use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt::Debug;

/// Column-wise transformation fitted on training data
pub trait Scaler: Debug + Send {
    /// Learn per-column parameters from `values` laid out as rows of `n_cols`
    fn fit(&mut self, values: &[f64], n_cols: usize) -> Result<()>;

    /// Apply the fitted transformation
    fn transform(&self, values: &[f64]) -> Result<Vec<f64>>;

    /// Undo the fitted transformation
    fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>>;

    fn fit_transform(&mut self, values: &[f64], n_cols: usize) -> Result<Vec<f64>> {
        self.fit(values, n_cols)?;
        self.transform(values)
    }
}

/// Which scaler a model builds for its inputs and targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalerKind {
    /// Leave values unchanged
    None,
    /// Rescale every column to `[0, 1]`
    #[default]
    MinMax,
    /// Center every column on 0 with unit variance
    Standard,
}

impl ScalerKind {
    /// A new, unfitted scaler; `None` for [`ScalerKind::None`]
    pub fn build(self) -> Option<Box<dyn Scaler>> {
        match self {
            ScalerKind::None => None,
            ScalerKind::MinMax => Some(Box::new(MinMaxScaler::default())),
            ScalerKind::Standard => Some(Box::new(StandardScaler::default())),
        }
    }
}

/// Per-column affine parameters: `scaled = (value - offset) / scale`
#[derive(Debug, Clone, Default, PartialEq)]
struct Affine {
    offset: Vec<f64>,
    scale: Vec<f64>,
}

impl Affine {
    fn check(&self, values: &[f64]) -> Result<usize> {
        let n_cols = self.offset.len();
        if n_cols == 0 {
            return Err(PulseError::InvalidArgument(
                "Scaler must be fitted before use".to_string(),
            ));
        }
        if values.len() % n_cols != 0 {
            return Err(PulseError::InvalidArgument(format!(
                "Buffer of {} values does not hold rows of {} columns",
                values.len(),
                n_cols
            )));
        }
        Ok(n_cols)
    }

    fn apply(&self, values: &[f64], forward: bool) -> Result<Vec<f64>> {
        let n_cols = self.check(values)?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let col = i % n_cols;
                if forward {
                    (v - self.offset[col]) / self.scale[col]
                } else {
                    v * self.scale[col] + self.offset[col]
                }
            })
            .collect())
    }
}

fn columns(values: &[f64], n_cols: usize) -> Result<Vec<Vec<f64>>> {
    if n_cols == 0 || values.is_empty() || values.len() % n_cols != 0 {
        return Err(PulseError::InvalidArgument(format!(
            "Cannot fit a scaler on {} values with {} columns",
            values.len(),
            n_cols
        )));
    }
    Ok((0..n_cols)
        .map(|col| values.iter().skip(col).step_by(n_cols).copied().collect())
        .collect())
}

// Constant columns keep a unit scale
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 || !scale.is_finite() {
        1.0
    } else {
        scale
    }
}

/// Rescales each column to `[0, 1]` using the training minimum and maximum
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    params: Affine,
}

impl Scaler for MinMaxScaler {
    fn fit(&mut self, values: &[f64], n_cols: usize) -> Result<()> {
        let cols = columns(values, n_cols)?;
        let (offset, scale) = cols
            .iter()
            .map(|col| {
                let min = Statistics::min(col.iter());
                let max = Statistics::max(col.iter());
                (min, nonzero(max - min))
            })
            .unzip();
        self.params = Affine { offset, scale };
        Ok(())
    }

    fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.params.apply(values, true)
    }

    fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.params.apply(values, false)
    }
}

/// Centers each column on its training mean and divides by its population standard deviation
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    params: Affine,
}

impl Scaler for StandardScaler {
    fn fit(&mut self, values: &[f64], n_cols: usize) -> Result<()> {
        let cols = columns(values, n_cols)?;
        let (offset, scale) = cols
            .iter()
            .map(|col| (col.iter().mean(), nonzero(col.iter().population_std_dev())))
            .unzip();
        self.params = Affine { offset, scale };
        Ok(())
    }

    fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.params.apply(values, true)
    }

    fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.params.apply(values, false)
    }
}
