//! Lagged feature columns for supervised forecasting

use crate::data::TimeSeriesTable;
use crate::error::{PulseError, Result};
use tracing::debug;

/// Name of the column holding `target_column` lagged by `lag` periods
pub fn lag_column_name(target_column: &str, lag: usize) -> String {
    format!("{}-{}", target_column, lag)
}

/// Add `window_size` lagged copies of `target_column` and drop incomplete rows.
///
/// Column `"{target_column}-{i}"` holds the target value `i` rows earlier, for
/// `i` in `1..=window_size`. Rows with a missing value in any column are then
/// dropped, which always removes the first `window_size` rows.
pub fn windowed_dataframe(
    base: &TimeSeriesTable,
    target_column: &str,
    window_size: usize,
) -> Result<TimeSeriesTable> {
    if window_size == 0 {
        return Err(PulseError::InvalidArgument(
            "Window size must be positive".to_string(),
        ));
    }
    let target = base.require_column(target_column)?.clone();

    let mut windowed = base.clone();
    for lag in 1..=window_size {
        windowed.add_column(lag_column_name(target_column, lag), target.shifted(lag))?;
    }

    let windowed = windowed.drop_missing();
    debug!(
        target_column,
        window_size,
        rows_in = base.len(),
        rows_out = windowed.len(),
        "built windowed table"
    );

    Ok(windowed)
}
