use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::{BTreeMap, HashSet};
use timepulse::data::{ColumnData, TimeSeriesTable};
use timepulse::error::PulseError;
use timepulse::split::{
    chronological_split, stratified_shuffle_indices, stratified_split, StratifiedSplitOptions,
};

/// 50 daily rows; categories 0, 1 and 2 appear 30, 15 and 5 times
fn categorized_table() -> TimeSeriesTable {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let index: Vec<NaiveDate> = (0..50).map(|i| start + Days::new(i)).collect();
    let categories: Vec<i64> = (0..50)
        .map(|i| match i % 10 {
            0..=5 => 0,
            6..=8 => 1,
            _ => 2,
        })
        .collect();
    let values: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let lags: Vec<f64> = (0..50).map(|i| 99.0 + i as f64).collect();

    TimeSeriesTable::new(index)
        .unwrap()
        .with_float_column("value", &values)
        .unwrap()
        .with_int_column("stringency_category", &categories)
        .unwrap()
        .with_float_column("value-1", &lags)
        .unwrap()
}

fn category_counts(values: Vec<f64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v as i64).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_stratified_split_sizes_and_columns() {
    let table = categorized_table();

    let split = stratified_split(
        &table,
        "value",
        "stringency_category",
        &StratifiedSplitOptions::default(),
    )
    .unwrap();

    assert_eq!(split.x_train.n_rows(), 40);
    assert_eq!(split.x_test.n_rows(), 10);
    assert_eq!(split.y_train.len(), 40);
    assert_eq!(split.y_test.len(), 10);
    assert_eq!(
        split.x_train.column_names().to_vec(),
        vec!["stringency_category".to_string(), "value-1".to_string()]
    );
}

#[test]
fn test_stratified_split_preserves_category_shares() {
    let table = categorized_table();

    let split = stratified_split(
        &table,
        "value",
        "stringency_category",
        &StratifiedSplitOptions::default(),
    )
    .unwrap();

    let test_counts = category_counts(split.x_test.column("stringency_category").unwrap());
    let train_counts = category_counts(split.x_train.column("stringency_category").unwrap());

    assert_eq!(test_counts, BTreeMap::from([(0, 6), (1, 3), (2, 1)]));
    assert_eq!(train_counts, BTreeMap::from([(0, 24), (1, 12), (2, 4)]));
}

#[test]
fn test_stratified_split_is_a_disjoint_cover() {
    let table = categorized_table();

    let split = stratified_split(
        &table,
        "value",
        "stringency_category",
        &StratifiedSplitOptions::default(),
    )
    .unwrap();

    let train: HashSet<NaiveDate> = split.x_train.index().iter().copied().collect();
    let test: HashSet<NaiveDate> = split.x_test.index().iter().copied().collect();

    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), table.len());
}

#[test]
fn test_stratified_split_labels_follow_rows() {
    let table = categorized_table();

    let split = stratified_split(
        &table,
        "value",
        "stringency_category",
        &StratifiedSplitOptions::default(),
    )
    .unwrap();

    for (date, label) in split.x_test.index().iter().zip(&split.y_test) {
        assert_eq!(table.value(*date, "value"), Some(*label));
    }
    for (row, label) in split.x_train.rows().zip(&split.y_train) {
        // value-1 is always one below the target in this table
        assert_eq!(row[1] + 1.0, *label);
    }
}

#[test]
fn test_stratified_split_is_deterministic() {
    let table = categorized_table();
    let options = StratifiedSplitOptions {
        random_seed: 7,
        ..StratifiedSplitOptions::default()
    };

    let first = stratified_split(&table, "value", "stringency_category", &options).unwrap();
    let second = stratified_split(&table, "value", "stringency_category", &options).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_stratified_shuffle_candidates() {
    let labels: Vec<i64> = (0..20).map(|i| i % 2).collect();
    let options = StratifiedSplitOptions {
        test_size: 0.25,
        n_splits: 3,
        ..StratifiedSplitOptions::default()
    };

    let candidates = stratified_shuffle_indices(&labels, &options).unwrap();

    assert_eq!(candidates.len(), 3);
    for candidate in &candidates {
        assert_eq!(candidate.test.len(), 5);
        let mut all: Vec<usize> = candidate.train.iter().chain(&candidate.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    // same seed, same candidates
    let again = stratified_shuffle_indices(&labels, &options).unwrap();
    assert_eq!(candidates, again);
}

#[rstest]
#[case(StratifiedSplitOptions { split_index: 1, ..StratifiedSplitOptions::default() })]
#[case(StratifiedSplitOptions { n_splits: 0, ..StratifiedSplitOptions::default() })]
#[case(StratifiedSplitOptions { test_size: 0.0, ..StratifiedSplitOptions::default() })]
#[case(StratifiedSplitOptions { test_size: 1.0, ..StratifiedSplitOptions::default() })]
fn test_stratified_split_rejects_options(#[case] options: StratifiedSplitOptions) {
    let table = categorized_table();

    let result = stratified_split(&table, "value", "stringency_category", &options);

    assert!(matches!(result, Err(PulseError::InvalidArgument(_))));
}

#[test]
fn test_stratified_split_rejects_target_as_splitter() {
    let table = categorized_table();

    let result = stratified_split(&table, "value", "value", &StratifiedSplitOptions::default());

    assert!(matches!(result, Err(PulseError::InvalidArgument(_))));
}

#[test]
fn test_stratified_split_rejects_singleton_category() {
    let mut table = categorized_table();
    let mut categories = vec![Some(0); 50];
    categories[0] = Some(5);
    table.add_column("lonely", ColumnData::Int(categories)).unwrap();

    let result = stratified_split(&table, "value", "lonely", &StratifiedSplitOptions::default());

    assert!(matches!(result, Err(PulseError::InvalidArgument(_))));
}

#[test]
fn test_stratified_split_rejects_continuous_splitter() {
    let table = categorized_table();

    let options = StratifiedSplitOptions {
        test_size: 0.5,
        ..StratifiedSplitOptions::default()
    };

    let result = stratified_split(&table, "stringency_category", "value-1", &options);

    // every value-1 is distinct, so each category holds a single row
    assert!(matches!(result, Err(PulseError::InvalidArgument(_))));
}

#[test]
fn test_chronological_split_keeps_order() {
    let table = categorized_table();

    let split = chronological_split(&table, "value", 0.3).unwrap();

    assert_eq!(split.y_train.len(), 35);
    assert_eq!(split.y_test.len(), 15);
    assert_eq!(split.y_train[0], 100.0);
    assert_eq!(split.y_test[0], 135.0);
    assert!(split.x_train.index().windows(2).all(|w| w[0] < w[1]));
    assert!(split.x_train.index().last() < split.x_test.index().first());
}

#[test]
fn test_chronological_split_rounds_halves_away_from_zero() {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let index: Vec<NaiveDate> = (0..6).map(|i| start + Days::new(i)).collect();
    let table = TimeSeriesTable::new(index)
        .unwrap()
        .with_float_column("value", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        .unwrap();

    // 6 * 0.75 = 4.5
    let split = chronological_split(&table, "value", 0.25).unwrap();

    assert_eq!(split.y_train, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(split.y_test, vec![6.0]);
}

#[test]
fn test_chronological_split_rejects_bad_fraction() {
    let table = categorized_table();
    assert!(chronological_split(&table, "value", 1.5).is_err());
}
