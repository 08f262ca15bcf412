use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use timepulse::data::FeatureMatrix;
use timepulse::error::PulseError;
use timepulse::models::{ForecastModel, LinearModel, ModelKind, ModelRegistry, NaiveModel};
use timepulse::preprocessing::ScalerKind;

fn matrix(columns: &[&str], rows: &[Vec<f64>]) -> FeatureMatrix {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    FeatureMatrix::new(
        (0..rows.len()).map(|i| start + Days::new(i as u64)).collect(),
        columns.iter().map(|c| c.to_string()).collect(),
        rows.concat(),
    )
    .unwrap()
}

/// Rows of `y = 1 + 2 * a + 3 * b`
fn linear_data(n: usize) -> (FeatureMatrix, Vec<f64>) {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
        .collect();
    let y = rows.iter().map(|r| 1.0 + 2.0 * r[0] + 3.0 * r[1]).collect();
    (matrix(&["a", "b"], &rows), y)
}

#[rstest]
#[case("naive", ModelKind::Naive)]
#[case("linear", ModelKind::Linear)]
#[case("Residual-Stack", ModelKind::ResidualStack)]
#[case("boosted-tree", ModelKind::BoostedTree)]
fn test_model_kind_from_str(#[case] text: &str, #[case] expected: ModelKind) {
    assert_eq!(text.parse::<ModelKind>().unwrap(), expected);
    assert_eq!(expected.to_string().parse::<ModelKind>().unwrap(), expected);
}

#[test]
fn test_model_kind_rejects_unknown() {
    assert!("transformer".parse::<ModelKind>().is_err());
}

#[test]
fn test_naive_model_uses_first_lag() {
    let x = matrix(
        &["total_holidays", "value-1", "value-2"],
        &[vec![1.0, 10.0, 9.0], vec![0.0, 11.0, 10.0]],
    );
    let y = vec![11.0, 12.0];

    let mut model = NaiveModel::default();
    model.build().unwrap();
    model.fit(&x, &y, &x, &y).unwrap();

    assert_eq!(model.predict(&x).unwrap(), vec![10.0, 11.0]);
}

#[test]
fn test_naive_model_with_explicit_column() {
    let x = matrix(&["value-1", "value-2"], &[vec![10.0, 9.0], vec![11.0, 10.0]]);
    let y = vec![11.0, 12.0];

    let mut model = NaiveModel::with_column("value-2");
    model.build().unwrap();
    model.fit(&x, &y, &x, &y).unwrap();

    assert_eq!(model.predict(&x).unwrap(), vec![9.0, 10.0]);
}

#[test]
fn test_naive_model_lifecycle_errors() {
    let x = matrix(&["a"], &[vec![1.0]]);
    let y = vec![1.0];

    let mut model = NaiveModel::default();
    assert!(matches!(model.fit(&x, &y, &x, &y), Err(PulseError::ModelError(_))));

    model.build().unwrap();
    assert!(matches!(model.predict(&x), Err(PulseError::ModelError(_))));
    // no lag column among the features
    assert!(matches!(model.fit(&x, &y, &x, &y), Err(PulseError::ModelError(_))));
}

#[rstest]
#[case(ScalerKind::None)]
#[case(ScalerKind::MinMax)]
#[case(ScalerKind::Standard)]
fn test_linear_model_recovers_exact_relation(#[case] scaler: ScalerKind) {
    let (x, y) = linear_data(20);

    let mut model = LinearModel::new(0.0, scaler).unwrap();
    model.build().unwrap();
    model.fit(&x, &y, &x, &y).unwrap();
    let predictions = model.predict(&x).unwrap();

    for (p, t) in predictions.iter().zip(&y) {
        assert_relative_eq!(*p, *t, epsilon = 1e-6);
    }
}

#[test]
fn test_linear_model_unscaled_coefficients() {
    let (x, y) = linear_data(15);

    let mut model = LinearModel::new(0.0, ScalerKind::None).unwrap();
    model.build().unwrap();
    model.fit(&x, &y, &x, &y).unwrap();

    let coefficients = model.coefficients().unwrap();
    assert_relative_eq!(coefficients[0], 2.0, epsilon = 1e-8);
    assert_relative_eq!(coefficients[1], 3.0, epsilon = 1e-8);
    assert_relative_eq!(model.intercept().unwrap(), 1.0, epsilon = 1e-8);
}

#[test]
fn test_linear_model_ridge_shrinks_weights() {
    let (x, y) = linear_data(15);

    let mut plain = LinearModel::new(0.0, ScalerKind::None).unwrap();
    plain.build().unwrap();
    plain.fit(&x, &y, &x, &y).unwrap();

    let mut ridge = LinearModel::new(50.0, ScalerKind::None).unwrap();
    ridge.build().unwrap();
    ridge.fit(&x, &y, &x, &y).unwrap();

    let norm = |w: &[f64]| w.iter().map(|v| v * v).sum::<f64>();
    assert!(norm(ridge.coefficients().unwrap()) < norm(plain.coefficients().unwrap()));
}

#[test]
fn test_linear_model_errors() {
    assert!(LinearModel::new(-1.0, ScalerKind::None).is_err());

    let (x, y) = linear_data(10);
    let mut model = LinearModel::default();
    assert!(matches!(model.fit(&x, &y, &x, &y), Err(PulseError::ModelError(_))));

    model.build().unwrap();
    assert!(model.predict(&x).is_err());
    assert!(model.fit(&x, &y[..5], &x, &y).is_err());

    model.fit(&x, &y, &x, &y).unwrap();
    let other = matrix(&["b", "a"], &[vec![1.0, 2.0]]);
    assert!(matches!(model.predict(&other), Err(PulseError::ModelError(_))));

    // collinear columns without a penalty
    let collinear = matrix(&["a", "a2"], &[vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]]);
    let target = vec![1.0, 2.0, 3.0];
    let mut ols = LinearModel::new(0.0, ScalerKind::None).unwrap();
    ols.build().unwrap();
    assert!(ols.fit(&collinear, &target, &collinear, &target).is_err());
}

#[test]
fn test_build_discards_previous_fit() {
    let (x, y) = linear_data(10);
    let mut model = LinearModel::default();
    model.build().unwrap();
    model.fit(&x, &y, &x, &y).unwrap();
    assert!(model.predict(&x).is_ok());

    model.build().unwrap();
    assert!(model.predict(&x).is_err());
}

#[test]
fn test_registry_builtins() {
    let registry = ModelRegistry::with_builtins();

    assert_eq!(registry.kinds(), vec![ModelKind::Naive, ModelKind::Linear]);
    assert_eq!(registry.create(ModelKind::Linear).unwrap().kind(), ModelKind::Linear);
    assert!(matches!(
        registry.create(ModelKind::Dense),
        Err(PulseError::ModelError(_))
    ));
}

#[test]
fn test_registry_register_external_kind() {
    let mut registry = ModelRegistry::new();
    assert!(registry.kinds().is_empty());

    registry.register(ModelKind::Dense, || Box::new(NaiveModel::with_column("value-1")));

    assert!(registry.contains(ModelKind::Dense));
    let model = registry.create(ModelKind::Dense).unwrap();
    assert_eq!(model.name(), "naive");
}
