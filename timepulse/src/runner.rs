//! Train a model on a split and score its test predictions

use crate::error::{PulseError, Result};
use crate::models::{ForecastModel, ModelKind, ModelRegistry};
use crate::split::SplitData;
use pulse_math::metrics::{evaluate_preds, MetricReport};
use tracing::{info, info_span};

/// Test-set predictions of a model and their scores
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRun {
    pub model_name: String,
    pub predictions: Vec<f64>,
    pub metrics: MetricReport,
}

/// Build, compile, fit and predict with `model`, then evaluate on the test labels.
///
/// The test set doubles as the validation set passed to `fit`.
pub fn run_model(model: &mut dyn ForecastModel, split: &SplitData) -> Result<ModelRun> {
    let span = info_span!("run_model", model = model.name(), kind = %model.kind());
    let _guard = span.enter();

    model.build()?;
    model.compile()?;
    model.fit(&split.x_train, &split.y_train, &split.x_test, &split.y_test)?;
    let predictions = model.predict(&split.x_test)?;

    if predictions.len() != split.y_test.len() {
        return Err(PulseError::ModelError(format!(
            "Model '{}' returned {} predictions for {} test rows",
            model.name(),
            predictions.len(),
            split.y_test.len()
        )));
    }

    let metrics = evaluate_preds(split.y_test.as_slice(), predictions.as_slice())?;
    info!(
        train_rows = split.y_train.len(),
        test_rows = split.y_test.len(),
        mae = metrics.mae,
        rmse = metrics.rmse,
        "model evaluated"
    );

    Ok(ModelRun {
        model_name: model.name().to_string(),
        predictions,
        metrics,
    })
}

/// [`run_model`] on a fresh model of `kind` taken from `registry`
pub fn run_registered(
    registry: &ModelRegistry,
    kind: ModelKind,
    split: &SplitData,
) -> Result<ModelRun> {
    let mut model = registry.create(kind)?;
    run_model(model.as_mut(), split)
}
