//! Regression metrics for forecast evaluation
//!
//! Inputs of any primitive numeric type are cast to `f32` before computation
//! and accumulated in `f64`, so sums of squares of large values stay finite.
//! Degenerate inputs never produce NaN or infinity: SMAPE, MASE and R² fall
//! back to `0.0`, and MAPE guards its denominator with a small epsilon.

use crate::windows::WindowSet;
use crate::{MathError, Result};
use num_traits::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;

/// Numeric stability constant used by MAPE and R²
pub const EPSILON: f64 = 1e-7;

/// Keys of a [`MetricReport`], in report order
pub const METRIC_NAMES: [&str; 7] = [
    "mae", "mse", "rmse", "mape", "smape", "mase", "r2_score",
];

/// The full set of regression metrics for one prediction run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReport {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Mean Absolute Scaled Error
    pub mase: f64,
    /// Coefficient of determination
    #[serde(rename = "r2_score")]
    pub r2: f64,
}

impl MetricReport {
    /// Look up a metric by its report key
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "mae" => Some(self.mae),
            "mse" => Some(self.mse),
            "rmse" => Some(self.rmse),
            "mape" => Some(self.mape),
            "smape" => Some(self.smape),
            "mase" => Some(self.mase),
            "r2_score" => Some(self.r2),
            _ => None,
        }
    }

    /// All metrics keyed by name
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        METRIC_NAMES
            .iter()
            .filter_map(|&name| self.get(name).map(|value| (name, value)))
            .collect()
    }

    /// True when every metric is a finite number
    pub fn is_finite(&self) -> bool {
        METRIC_NAMES
            .iter()
            .filter_map(|name| self.get(name))
            .all(f64::is_finite)
    }
}

impl std::fmt::Display for MetricReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Regression Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        writeln!(f, "  MASE:  {:.4}", self.mase)?;
        writeln!(f, "  R2:    {:.4}", self.r2)?;
        Ok(())
    }
}

/// Cast to `f32`, then widen so sums and squares cannot overflow
fn to_widened_vec<T: ToPrimitive>(values: &[T]) -> Result<Vec<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| match v.to_f32() {
            Some(x) if x.is_finite() => Ok(f64::from(x)),
            _ => Err(MathError::InvalidArgument(format!(
                "Value at position {} is not a finite f32",
                i
            ))),
        })
        .collect()
}

fn cast_pair<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<(Vec<f64>, Vec<f64>)> {
    if y_true.len() != y_pred.len() {
        return Err(MathError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MathError::InvalidArgument(
            "Metrics require at least one value".to_string(),
        ));
    }
    Ok((to_widened_vec(y_true)?, to_widened_vec(y_pred)?))
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn mae_of(t: &[f64], p: &[f64]) -> f64 {
    mean(t.iter().zip(p).map(|(a, b)| (a - b).abs()))
}

fn mse_of(t: &[f64], p: &[f64]) -> f64 {
    mean(t.iter().zip(p).map(|(a, b)| (a - b).powi(2)))
}

fn mape_of(t: &[f64], p: &[f64]) -> f64 {
    100.0 * mean(t.iter().zip(p).map(|(a, b)| ((a - b) / a.abs().max(EPSILON)).abs()))
}

fn smape_of(t: &[f64], p: &[f64]) -> f64 {
    let smape = mean(t.iter().zip(p).filter_map(|(a, b)| {
        let denominator = (b.abs() + a.abs()) / 2.0;
        if denominator != 0.0 {
            Some(200.0 * (b - a).abs() / denominator)
        } else {
            None
        }
    }));
    finite_or(smape, 0.0)
}

fn r2_of(t: &[f64], p: &[f64]) -> f64 {
    let t_mean = mean(t.iter().copied());
    let total_error: f64 = t.iter().map(|a| (a - t_mean).powi(2)).sum();
    let unexplained_error: f64 = t.iter().zip(p).map(|(a, b)| (a - b).powi(2)).sum();
    finite_or(1.0 - unexplained_error / (total_error + EPSILON), 0.0)
}

fn scaled_error(mae: f64, naive_mae: f64) -> f64 {
    if naive_mae == 0.0 || !naive_mae.is_finite() {
        0.0
    } else {
        finite_or(mae / naive_mae, 0.0)
    }
}

/// Mean of `|y_true - y_pred|`
pub fn mean_absolute_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(mae_of(&t, &p))
}

/// Mean of `(y_true - y_pred)^2`
pub fn mean_squared_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(mse_of(&t, &p))
}

/// Square root of the mean squared error
pub fn root_mean_squared_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(mse_of(&t, &p).sqrt())
}

/// Mean absolute percentage error, in percent.
///
/// The denominator is `max(|y_true|, EPSILON)`, so zero targets give a large
/// but finite contribution instead of a division by zero.
pub fn mean_absolute_percentage_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(mape_of(&t, &p))
}

/// Symmetric mean absolute percentage error, in percent.
///
/// Entries where both values are zero are left out of the mean. Returns `0.0`
/// when no entry is left.
pub fn symmetric_mean_absolute_percentage_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(smape_of(&t, &p))
}

/// Mean absolute error scaled by the error of a one-step naive forecast.
///
/// Returns `0.0` when the naive forecast is perfect (constant `y_true`) or
/// when there are fewer than two values to difference.
pub fn mean_absolute_scaled_error<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    let naive = mean(t.windows(2).map(|w| (w[1] - w[0]).abs()));
    Ok(scaled_error(mae_of(&t, &p), naive))
}

/// Coefficient of determination with an epsilon-guarded denominator
pub fn r2_score<A: ToPrimitive, B: ToPrimitive>(y_true: &[A], y_pred: &[B]) -> Result<f64> {
    let (t, p) = cast_pair(y_true, y_pred)?;
    Ok(r2_of(&t, &p))
}

/// Compute every metric for single-step predictions
pub fn evaluate_preds<A: ToPrimitive, B: ToPrimitive>(
    y_true: &[A],
    y_pred: &[B],
) -> Result<MetricReport> {
    let (t, p) = cast_pair(y_true, y_pred)?;

    let mse = mse_of(&t, &p);
    let mae = mae_of(&t, &p);
    let naive = mean(t.windows(2).map(|w| (w[1] - w[0]).abs()));

    Ok(MetricReport {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape: mape_of(&t, &p),
        smape: smape_of(&t, &p),
        mase: scaled_error(mae, naive),
        r2: r2_of(&t, &p),
    })
}

/// Compute every metric for predictions that span several time steps.
///
/// Each row of `y_true` and `y_pred` holds one label of `horizon` values.
/// MAE, MSE, RMSE and MAPE are computed per row and averaged; SMAPE and R²
/// are computed over all values. The MASE naive forecast compares each label
/// row with the row before it.
pub fn evaluate_preds_multi_horizon(
    y_true: &WindowSet,
    y_pred: &WindowSet,
) -> Result<MetricReport> {
    if y_true.width() != y_pred.width() {
        return Err(MathError::LengthMismatch {
            expected: y_true.width(),
            actual: y_pred.width(),
        });
    }
    let (t, p) = cast_pair(y_true.as_slice(), y_pred.as_slice())?;
    let horizon = y_true.width();

    let rows = || t.chunks_exact(horizon).zip(p.chunks_exact(horizon));
    let mae = mean(rows().map(|(a, b)| mae_of(a, b)));
    let mse = mean(rows().map(|(a, b)| mse_of(a, b)));
    let rmse = mean(rows().map(|(a, b)| mse_of(a, b).sqrt()));
    let mape = mean(rows().map(|(a, b)| mape_of(a, b)));

    let naive = mean(
        t.iter()
            .skip(horizon)
            .zip(t.iter())
            .map(|(later, earlier)| (later - earlier).abs()),
    );

    Ok(MetricReport {
        mae,
        mse,
        rmse,
        mape,
        smape: smape_of(&t, &p),
        mase: scaled_error(mae_of(&t, &p), naive),
        r2: r2_of(&t, &p),
    })
}
