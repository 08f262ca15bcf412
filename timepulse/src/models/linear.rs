//! Ridge regression over the feature columns

use crate::data::FeatureMatrix;
use crate::error::{PulseError, Result};
use crate::models::{check_rows, ForecastModel, ModelKind};
use crate::preprocessing::{Scaler, ScalerKind};
use pulse_math::metrics::mean_absolute_error;
use tracing::debug;

/// Coefficients learned by one call to `fit`
#[derive(Debug)]
struct FittedLinear {
    columns: Vec<String>,
    scaler: Option<Box<dyn Scaler>>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Linear model `y = intercept + w · x` fitted by ridge regression.
///
/// Inputs are scaled with a scaler built fresh on every `fit`. The intercept is
/// not penalized.
#[derive(Debug)]
pub struct LinearModel {
    alpha: f64,
    scaler: ScalerKind,
    built: bool,
    fitted: Option<FittedLinear>,
}

impl LinearModel {
    /// Ridge penalty `alpha` (0 for ordinary least squares) and input scaling
    pub fn new(alpha: f64, scaler: ScalerKind) -> Result<Self> {
        if !(alpha >= 0.0 && alpha.is_finite()) {
            return Err(PulseError::InvalidArgument(format!(
                "Ridge penalty must be a finite non-negative number, got {}",
                alpha
            )));
        }

        Ok(Self {
            alpha,
            scaler,
            built: false,
            fitted: None,
        })
    }

    /// Learned feature weights, in column order
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.coefficients.as_slice())
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }

    fn scaled(scaler: &Option<Box<dyn Scaler>>, x: &FeatureMatrix) -> Result<Vec<f64>> {
        match scaler {
            Some(scaler) => scaler.transform(x.as_slice()),
            None => Ok(x.as_slice().to_vec()),
        }
    }

    fn predict_fitted(fitted: &FittedLinear, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.column_names() != fitted.columns.as_slice() {
            return Err(PulseError::ModelError(format!(
                "Prediction columns {:?} differ from training columns {:?}",
                x.column_names(),
                fitted.columns
            )));
        }
        if x.n_cols() == 0 {
            return Ok(vec![fitted.intercept; x.n_rows()]);
        }

        let values = Self::scaled(&fitted.scaler, x)?;
        Ok(values
            .chunks_exact(x.n_cols())
            .map(|row| {
                fitted.intercept
                    + row
                        .iter()
                        .zip(&fitted.coefficients)
                        .map(|(v, w)| v * w)
                        .sum::<f64>()
            })
            .collect())
    }
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            alpha: 1e-3,
            scaler: ScalerKind::MinMax,
            built: false,
            fitted: None,
        }
    }
}

impl ForecastModel for LinearModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn build(&mut self) -> Result<()> {
        self.built = true;
        self.fitted = None;
        Ok(())
    }

    fn fit(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[f64],
        x_val: &FeatureMatrix,
        y_val: &[f64],
    ) -> Result<()> {
        if !self.built {
            return Err(PulseError::ModelError("Model must be built before fitting".to_string()));
        }
        check_rows(x_train, y_train, "Training")?;
        check_rows(x_val, y_val, "Validation")?;
        if x_train.is_empty() {
            return Err(PulseError::ModelError("Cannot fit on an empty training set".to_string()));
        }

        let n_cols = x_train.n_cols();
        let mut scaler = self.scaler.build();
        let values = match (&mut scaler, n_cols) {
            (Some(scaler), n) if n > 0 => scaler.fit_transform(x_train.as_slice(), n)?,
            _ => x_train.as_slice().to_vec(),
        };

        // Normal equations over [1, x]; the intercept sits at position 0
        let n_params = n_cols + 1;
        let mut xtx = vec![vec![0.0; n_params]; n_params];
        let mut xty = vec![0.0; n_params];
        let mut design = vec![1.0; n_params];
        for (r, y) in y_train.iter().enumerate() {
            design[1..].copy_from_slice(&values[r * n_cols..(r + 1) * n_cols]);
            for i in 0..n_params {
                for j in 0..n_params {
                    xtx[i][j] += design[i] * design[j];
                }
                xty[i] += design[i] * y;
            }
        }
        for (i, diagonal) in xtx.iter_mut().enumerate().skip(1) {
            diagonal[i] += self.alpha;
        }

        let params = solve_linear_system(&xtx, &xty).ok_or_else(|| {
            PulseError::ModelError(
                "Normal equations are singular; add a ridge penalty or drop collinear columns"
                    .to_string(),
            )
        })?;

        let fitted = FittedLinear {
            columns: x_train.column_names().to_vec(),
            scaler,
            coefficients: params[1..].to_vec(),
            intercept: params[0],
        };

        if !x_val.is_empty() {
            let val_pred = Self::predict_fitted(&fitted, x_val)?;
            let val_mae = mean_absolute_error(y_val, val_pred.as_slice())?;
            debug!(rows = x_train.n_rows(), columns = n_cols, val_mae, "fitted linear model");
        }

        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            PulseError::ModelError("Model must be fitted before predicting".to_string())
        })?;
        Self::predict_fitted(fitted, x)
    }
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting
fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, rhs)| {
            let mut r = row.clone();
            r.push(*rhs);
            r
        })
        .collect();

    for col in 0..n {
        let (pivot, max_val) = (col..n)
            .map(|row| (row, aug[row][col].abs()))
            .fold((col, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if max_val < 1e-12 {
            return None;
        }
        aug.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| aug[i][j] * x[j]).sum();
        x[i] = (aug[i][n] - tail) / aug[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_linear_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear_system(&a, &[3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear_system(&a, &[1.0, 2.0]).is_none());
    }
}
