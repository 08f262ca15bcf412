//! Sliding-window construction for supervised time series learning
//!
//! A series `x` is cut into every contiguous run of `window_size + horizon`
//! values. The first `window_size` values of a run form the model input and
//! the remaining `horizon` values form its label. Runs are stored back to back
//! in a single buffer so that run `i` always starts at offset `i * width`.

use crate::{MathError, Result};

/// Fixed-width windows stored contiguously, indexed by start offset
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    width: usize,
    data: Vec<f64>,
}

impl WindowSet {
    /// Create a window set from a flat buffer of `count * width` values
    pub fn new(width: usize, data: Vec<f64>) -> Result<Self> {
        if width == 0 {
            return Err(MathError::InvalidArgument(
                "Window width must be positive".to_string(),
            ));
        }
        if data.len() % width != 0 {
            return Err(MathError::InvalidArgument(format!(
                "Buffer of {} values cannot be divided into windows of width {}",
                data.len(),
                width
            )));
        }

        Ok(Self { width, data })
    }

    /// Create an empty window set with room for `count` windows
    pub fn with_capacity(width: usize, count: usize) -> Result<Self> {
        Self::new(width, Vec::with_capacity(width * count))
    }

    /// Build a window set from equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map(Vec::len).ok_or_else(|| {
            MathError::InvalidArgument("Cannot infer window width from zero rows".to_string())
        })?;
        let mut set = Self::with_capacity(width, rows.len())?;
        for row in rows {
            set.push(row)?;
        }
        Ok(set)
    }

    /// Append one window
    pub fn push(&mut self, window: &[f64]) -> Result<()> {
        if window.len() != self.width {
            return Err(MathError::LengthMismatch {
                expected: self.width,
                actual: window.len(),
            });
        }
        self.data.extend_from_slice(window);
        Ok(())
    }

    /// Number of values in each window
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Window starting at offset `index * width`
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.width)?;
        self.data.get(start..start + self.width)
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.width)
    }

    /// The flat row-major buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the windows out as owned rows
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter().map(<[f64]>::to_vec).collect()
    }

    /// Split into the first `count` windows and the rest, keeping order
    pub fn split_at(&self, count: usize) -> (Self, Self) {
        let cut = count.min(self.len()) * self.width;
        let (head, tail) = self.data.split_at(cut);
        (
            Self {
                width: self.width,
                data: head.to_vec(),
            },
            Self {
                width: self.width,
                data: tail.to_vec(),
            },
        )
    }
}

/// Split every row into a prefix of `width - horizon` values and a suffix of `horizon` values.
///
/// E.g. with `horizon = 1` the row `[1, 2, 3, 4, 5, 6]` becomes `([1, 2, 3, 4, 5], [6])`.
pub fn labelled_windows(x: &WindowSet, horizon: usize) -> Result<(WindowSet, WindowSet)> {
    if horizon == 0 {
        return Err(MathError::InvalidArgument(
            "Horizon must be positive".to_string(),
        ));
    }
    if horizon >= x.width() {
        return Err(MathError::InvalidArgument(format!(
            "Horizon ({}) must be smaller than the row length ({})",
            horizon,
            x.width()
        )));
    }

    let prefix = x.width() - horizon;
    let mut windows = WindowSet::with_capacity(prefix, x.len())?;
    let mut labels = WindowSet::with_capacity(horizon, x.len())?;

    for row in x.iter() {
        let (window, label) = row.split_at(prefix);
        windows.push(window)?;
        labels.push(label)?;
    }

    Ok((windows, labels))
}

/// Turn a series into `len(x) - window_size - horizon + 1` labelled windows.
///
/// Window `i` is `x[i..i + window_size]` and its label is
/// `x[i + window_size..i + window_size + horizon]`.
pub fn make_windows(
    x: &[f64],
    window_size: usize,
    horizon: usize,
) -> Result<(WindowSet, WindowSet)> {
    if window_size == 0 {
        return Err(MathError::InvalidArgument(
            "Window size must be positive".to_string(),
        ));
    }
    if horizon == 0 {
        return Err(MathError::InvalidArgument(
            "Horizon must be positive".to_string(),
        ));
    }

    let width = window_size + horizon;
    if x.len() < width {
        return Err(MathError::InvalidArgument(format!(
            "Series of length {} is too short for window size {} and horizon {}",
            x.len(),
            window_size,
            horizon
        )));
    }

    let count = x.len() - width + 1;
    let mut runs = WindowSet::with_capacity(width, count)?;
    for start in 0..count {
        runs.push(&x[start..start + width])?;
    }

    labelled_windows(&runs, horizon)
}

/// Split windows and labels into train and test sets without shuffling.
///
/// The first `round(len * (1 - test_split))` pairs are the train set, the rest
/// the test set. Halves round away from zero, so 6 windows at `0.25` keep 5
/// for training. Order is preserved so no future value leaks into training.
pub fn train_test_split_windows(
    windows: &WindowSet,
    labels: &WindowSet,
    test_split: f64,
) -> Result<(WindowSet, WindowSet, WindowSet, WindowSet)> {
    if windows.len() != labels.len() {
        return Err(MathError::LengthMismatch {
            expected: windows.len(),
            actual: labels.len(),
        });
    }
    if !(0.0..=1.0).contains(&test_split) {
        return Err(MathError::InvalidArgument(format!(
            "Test split must be between 0 and 1, got {}",
            test_split
        )));
    }

    let split_size = (windows.len() as f64 * (1.0 - test_split)).round() as usize;
    let (train_windows, test_windows) = windows.split_at(split_size);
    let (train_labels, test_labels) = labels.split_at(split_size);

    Ok((train_windows, test_windows, train_labels, test_labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_windows_split_rows() {
        let rows = WindowSet::new(6, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let (windows, labels) = labelled_windows(&rows, 1).unwrap();

        assert_eq!(windows.get(0).unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(labels.get(0).unwrap(), &[6.0]);
    }

    #[test]
    fn test_labelled_windows_rejects_long_horizon() {
        let rows = WindowSet::new(3, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(labelled_windows(&rows, 3).is_err());
        assert!(labelled_windows(&rows, 0).is_err());
    }

    #[test]
    fn test_make_windows_counts() {
        let x: Vec<f64> = (1..=12).map(f64::from).collect();
        let (windows, labels) = make_windows(&x, 5, 1).unwrap();

        assert_eq!(windows.len(), 7);
        assert_eq!(labels.len(), 7);
        assert_eq!(windows.get(0).unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(labels.get(0).unwrap(), &[6.0]);
        assert_eq!(windows.get(6).unwrap(), &[7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(labels.get(6).unwrap(), &[12.0]);
        assert!(windows.get(7).is_none());
    }

    #[test]
    fn test_make_windows_too_short() {
        let x = vec![1.0, 2.0, 3.0];
        assert!(make_windows(&x, 3, 1).is_err());
        assert!(make_windows(&x, 2, 1).is_ok());
    }

    #[test]
    fn test_window_set_shape_checks() {
        assert!(WindowSet::new(0, Vec::new()).is_err());
        assert!(WindowSet::new(2, vec![1.0, 2.0, 3.0]).is_err());

        let mut set = WindowSet::with_capacity(2, 1).unwrap();
        assert!(set.push(&[1.0]).is_err());
        set.push(&[1.0, 2.0]).unwrap();
        assert_eq!(set.to_rows(), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_split_keeps_order() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let (windows, labels) = make_windows(&x, 4, 2).unwrap();
        let (train_w, test_w, train_l, test_l) =
            train_test_split_windows(&windows, &labels, 0.2).unwrap();

        assert_eq!(train_w.len(), 12);
        assert_eq!(test_w.len(), 3);
        assert_eq!(train_l.len(), 12);
        assert_eq!(test_l.len(), 3);
        assert_eq!(test_w.get(0), windows.get(12));
    }
}
