//! Persistence forecast

use crate::data::FeatureMatrix;
use crate::error::{PulseError, Result};
use crate::models::{check_rows, ForecastModel, ModelKind};

/// Predicts the value of one lag column, by default the first column named `*-1`
#[derive(Debug, Clone, Default)]
pub struct NaiveModel {
    lag_column: Option<String>,
    fitted_column: Option<String>,
    built: bool,
}

impl NaiveModel {
    /// Persistence model reading an explicit lag column
    pub fn with_column(column: impl Into<String>) -> Self {
        Self {
            lag_column: Some(column.into()),
            ..Self::default()
        }
    }

    fn resolve_column(&self, x: &FeatureMatrix) -> Result<String> {
        let found = match &self.lag_column {
            Some(name) => x.column_index(name).map(|_| name.clone()),
            None => x.column_names().iter().find(|c| c.ends_with("-1")).cloned(),
        };
        found.ok_or_else(|| {
            PulseError::ModelError(format!(
                "No lag column for the naive forecast among {:?}",
                x.column_names()
            ))
        })
    }
}

impl ForecastModel for NaiveModel {
    fn name(&self) -> &str {
        "naive"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Naive
    }

    fn build(&mut self) -> Result<()> {
        self.built = true;
        self.fitted_column = None;
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

        self.fitted_column = Some(self.resolve_column(x_train)?);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let column = self.fitted_column.as_deref().ok_or_else(|| {
            PulseError::ModelError("Model must be fitted before predicting".to_string())
        })?;

        x.column(column).ok_or_else(|| {
            PulseError::ModelError(format!(
                "Column '{}' is missing from the prediction input",
                column
            ))
        })
    }
}
