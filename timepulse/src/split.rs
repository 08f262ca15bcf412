//! Train/test partitions of feature tables
//!
//! [`stratified_split`] shuffles rows while keeping the share of every category
//! of a label column equal in train and test. [`chronological_split`] keeps time
//! order and cuts once.

use crate::data::{FeatureMatrix, TimeSeriesTable};
use crate::error::{PulseError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Features and labels of one train/test partition
#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    pub x_train: FeatureMatrix,
    pub y_train: Vec<f64>,
    pub x_test: FeatureMatrix,
    pub y_test: Vec<f64>,
}

impl SplitData {
    fn from_indices(
        table: &TimeSeriesTable,
        target_column: &str,
        train: &[usize],
        test: &[usize],
    ) -> Result<Self> {
        let y = table.float_values(target_column)?;
        Ok(Self {
            x_train: FeatureMatrix::from_table_rows(table, train, target_column)?,
            y_train: train.iter().map(|&r| y[r]).collect(),
            x_test: FeatureMatrix::from_table_rows(table, test, target_column)?,
            y_test: test.iter().map(|&r| y[r]).collect(),
        })
    }
}

/// Parameters of a stratified shuffle split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratifiedSplitOptions {
    /// Share of rows placed in the test set
    pub test_size: f64,
    /// Seed of the shuffling generator
    pub random_seed: u64,
    /// Number of candidate partitions drawn
    pub n_splits: usize,
    /// Which candidate partition is returned
    pub split_index: usize,
}

impl Default for StratifiedSplitOptions {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_seed: 42,
            n_splits: 1,
            split_index: 0,
        }
    }
}

/// Row indices of one candidate partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Distribute `draws` over classes in proportion to `counts`.
///
/// Each class gets the floor of its share; leftover draws go to the classes
/// with the largest remainders, lower class position first on ties.
fn approximate_mode(counts: &[usize], draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut allocation: Vec<usize> = counts.iter().map(|&c| c * draws / total).collect();
    let remainders: Vec<usize> = counts.iter().map(|&c| c * draws % total).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));

    let mut left = draws - allocation.iter().sum::<usize>();
    for class in order {
        if left == 0 {
            break;
        }
        if allocation[class] < counts[class] {
            allocation[class] += 1;
            left -= 1;
        }
    }

    allocation
}

/// Integer category of every row of `splitter_column`
fn category_labels(table: &TimeSeriesTable, splitter_column: &str) -> Result<Vec<i64>> {
    let data = table.require_column(splitter_column)?;
    (0..table.len())
        .map(|row| match data.get_f64(row) {
            Some(v) if v.fract() == 0.0 => Ok(v as i64),
            Some(v) => Err(PulseError::InvalidArgument(format!(
                "Column '{}' holds the non-categorical value {} at {}",
                splitter_column,
                v,
                table.index()[row]
            ))),
            None => Err(PulseError::InvalidArgument(format!(
                "Column '{}' has a missing category at {}",
                splitter_column,
                table.index()[row]
            ))),
        })
        .collect()
}

/// Draw `n_splits` stratified partitions of `labels` and return them all.
///
/// Every candidate comes from the same generator, seeded once, so the result
/// depends only on the labels and the options.
pub fn stratified_shuffle_indices(
    labels: &[i64],
    options: &StratifiedSplitOptions,
) -> Result<Vec<SplitIndices>> {
    if !(options.test_size > 0.0 && options.test_size < 1.0) {
        return Err(PulseError::InvalidArgument(format!(
            "Test size must be between 0 and 1, got {}",
            options.test_size
        )));
    }
    if options.n_splits == 0 {
        return Err(PulseError::InvalidArgument(
            "Number of splits must be positive".to_string(),
        ));
    }

    let mut strata: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        strata.entry(*label).or_default().push(row);
    }

    if let Some((label, rows)) = strata.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PulseError::InvalidArgument(format!(
            "Category {} has only {} row(s); every category needs at least 2 to stratify",
            label,
            rows.len()
        )));
    }

    let n_samples = labels.len();
    let n_classes = strata.len();
    let n_test = (options.test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples - n_test;
    if n_train < n_classes || n_test < n_classes {
        return Err(PulseError::InvalidArgument(format!(
            "Train size {} and test size {} must each be at least the number of categories ({})",
            n_train, n_test, n_classes
        )));
    }

    let counts: Vec<usize> = strata.values().map(Vec::len).collect();
    debug!(n_samples, n_train, n_test, ?counts, "stratifying rows");

    let mut rng = ChaCha8Rng::seed_from_u64(options.random_seed);
    let mut candidates = Vec::with_capacity(options.n_splits);
    for _ in 0..options.n_splits {
        let train_counts = approximate_mode(&counts, n_train);
        let remaining: Vec<usize> = counts.iter().zip(&train_counts).map(|(c, t)| c - t).collect();
        let test_counts = approximate_mode(&remaining, n_test);

        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n_test);
        for (class, rows) in strata.values().enumerate() {
            let mut permuted = rows.clone();
            permuted.shuffle(&mut rng);
            let (n_i, t_i) = (train_counts[class], test_counts[class]);
            train.extend_from_slice(&permuted[..n_i]);
            test.extend_from_slice(&permuted[n_i..n_i + t_i]);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        candidates.push(SplitIndices { train, test });
    }

    Ok(candidates)
}

/// Split a feature table into train and test sets stratified on `splitter_column`.
///
/// `target_column` is removed from the feature matrices and returned as the
/// label vectors. The splitter column stays among the features.
pub fn stratified_split(
    table: &TimeSeriesTable,
    target_column: &str,
    splitter_column: &str,
    options: &StratifiedSplitOptions,
) -> Result<SplitData> {
    if target_column == splitter_column {
        return Err(PulseError::InvalidArgument(format!(
            "Target column '{}' cannot also be the splitter column",
            target_column
        )));
    }
    table.require_column(target_column)?;
    if options.split_index >= options.n_splits {
        return Err(PulseError::InvalidArgument(format!(
            "Split index {} is out of range for {} split(s)",
            options.split_index, options.n_splits
        )));
    }

    let labels = category_labels(table, splitter_column)?;
    let mut candidates = stratified_shuffle_indices(&labels, options)?;
    let chosen = candidates.swap_remove(options.split_index);

    SplitData::from_indices(table, target_column, &chosen.train, &chosen.test)
}

/// Split a feature table into an earlier train part and a later test part.
///
/// The train part holds the first `round(len * (1 - test_split))` rows, with
/// halves rounded away from zero.
pub fn chronological_split(
    table: &TimeSeriesTable,
    target_column: &str,
    test_split: f64,
) -> Result<SplitData> {
    if !(0.0..=1.0).contains(&test_split) {
        return Err(PulseError::InvalidArgument(format!(
            "Test split must be between 0 and 1, got {}",
            test_split
        )));
    }
    table.require_column(target_column)?;

    let split_size = (table.len() as f64 * (1.0 - test_split)).round() as usize;
    let train: Vec<usize> = (0..split_size).collect();
    let test: Vec<usize> = (split_size..table.len()).collect();

    SplitData::from_indices(table, target_column, &train, &test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_mode_exact_shares() {
        assert_eq!(approximate_mode(&[50, 30, 20], 80), vec![40, 24, 16]);
    }

    #[test]
    fn test_approximate_mode_distributes_leftovers() {
        let allocation = approximate_mode(&[3, 3, 4], 5);
        assert_eq!(allocation.iter().sum::<usize>(), 5);
        // floors 1, 1, 2 with remainders 5, 5, 0; the tie goes to the first class
        assert_eq!(allocation, vec![2, 1, 2]);
    }

    #[test]
    fn test_approximate_mode_never_exceeds_counts() {
        let counts = [2, 7, 1, 9];
        for draws in 0..=19 {
            let allocation = approximate_mode(&counts, draws);
            assert_eq!(allocation.iter().sum::<usize>(), draws);
            for (a, c) in allocation.iter().zip(&counts) {
                assert!(a <= c);
            }
        }
    }
}
