//! Post-processing of external signals into auxiliary tables
//!
//! Fetching is left to the caller. These functions take rows that were
//! already retrieved (holiday dates, a daily stringency index, weather
//! observations, monthly target records) and shape them into date-indexed
//! tables with fixed column names, ready for
//! [`merge_on_canonical_calendar`](crate::calendar::merge_on_canonical_calendar).

use crate::calendar::{month_end, resample, Aggregation, CanonicalDateRange, Frequency};
use crate::data::{ColumnData, TimeSeriesTable};
use crate::error::{PulseError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const STRINGENCY_INDEX_COLUMN: &str = "stringency_index";
pub const STRINGENCY_CATEGORY_COLUMN: &str = "stringency_category";
pub const TOTAL_HOLIDAYS_COLUMN: &str = "total_holidays";
pub const AVG_TEMPERATURE_COLUMN: &str = "avg_temperature";
pub const PRECIPITATION_SUM_COLUMN: &str = "precipitation_sum";

/// Category of a stringency index value.
///
/// `(-1, 33]` is 0 (low), `(33, 66]` is 1 (medium), `(66, 110]` is 2 (high).
/// Values outside `(-1, 110]` have no category.
pub fn stringency_category(index: f64) -> Option<i64> {
    match index {
        x if x > -1.0 && x <= 33.0 => Some(0),
        x if x > 33.0 && x <= 66.0 => Some(1),
        x if x > 66.0 && x <= 110.0 => Some(2),
        _ => None,
    }
}

/// Periodic stringency categories from a daily `stringency_index` column.
///
/// Missing daily values count as 0 before binning. Each period takes the most
/// frequent category, the lowest one on ties. Periods without any categorized
/// day get 0. The result has the single column `stringency_category`.
pub fn stringency_category_table(
    daily: &TimeSeriesTable,
    frequency: Frequency,
) -> Result<TimeSeriesTable> {
    let index = daily.require_column(STRINGENCY_INDEX_COLUMN)?;
    let categories: Vec<Option<i64>> = (0..daily.len())
        .map(|row| stringency_category(index.get_f64(row).unwrap_or(0.0)))
        .collect();

    let mut binned = TimeSeriesTable::new(daily.index().to_vec())?;
    binned.add_column(STRINGENCY_CATEGORY_COLUMN, ColumnData::Int(categories))?;

    let resampled = resample(
        &binned,
        frequency,
        &[(STRINGENCY_CATEGORY_COLUMN, Aggregation::Mode)],
    )?;
    let filled = resampled.require_column(STRINGENCY_CATEGORY_COLUMN)?.to_filled_int();

    debug!(days = daily.len(), periods = resampled.len(), %frequency, "binned stringency index");
    TimeSeriesTable::new(resampled.index().to_vec())?
        .with_int_column(STRINGENCY_CATEGORY_COLUMN, &filled)
}

/// Number of holidays in each period, in column `total_holidays`.
///
/// Dates may arrive unsorted; a date listed twice counts once. Periods between
/// the first and the last holiday that hold none get 0.
pub fn holiday_count_table(dates: &[NaiveDate], frequency: Frequency) -> Result<TimeSeriesTable> {
    let mut unique = dates.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let (first, last) = match (unique.first(), unique.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(PulseError::InvalidArgument(
                "Holiday list is empty".to_string(),
            ))
        }
    };

    let range = CanonicalDateRange::new(first, frequency.period_end(last)?, frequency)?;
    let mut counts: BTreeMap<NaiveDate, i64> = range.dates().iter().map(|d| (*d, 0)).collect();
    for date in &unique {
        *counts.entry(frequency.period_end(*date)?).or_default() += 1;
    }

    let totals: Vec<i64> = counts.values().copied().collect();
    TimeSeriesTable::new(counts.into_keys().collect())?
        .with_int_column(TOTAL_HOLIDAYS_COLUMN, &totals)
}

/// Unit of incoming temperature readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

/// One weather reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    pub avg_temperature: Option<f64>,
    pub precipitation_sum: Option<f64>,
}

/// Periodic weather aggregates.
///
/// `avg_temperature` is converted to Celsius, averaged per period, and rounded
/// to a whole degree with halves going to the even neighbour (2.5 becomes 2).
/// `precipitation_sum` is averaged per period and stays a float. Observations
/// must have distinct dates.
pub fn weather_table(
    observations: &[WeatherObservation],
    unit: TemperatureUnit,
    frequency: Frequency,
) -> Result<TimeSeriesTable> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|o| o.date);

    let mut table = TimeSeriesTable::new(sorted.iter().map(|o| o.date).collect())?;
    let temperature = sorted
        .iter()
        .map(|o| o.avg_temperature.map(|t| unit.to_celsius(t)))
        .collect();
    let precipitation = sorted.iter().map(|o| o.precipitation_sum).collect();

    table.add_column(AVG_TEMPERATURE_COLUMN, ColumnData::Float(temperature))?;
    table.add_column(PRECIPITATION_SUM_COLUMN, ColumnData::Float(precipitation))?;

    let resampled = resample(
        &table,
        frequency,
        &[
            (AVG_TEMPERATURE_COLUMN, Aggregation::Mean),
            (PRECIPITATION_SUM_COLUMN, Aggregation::Mean),
        ],
    )?;

    let mean_temperature = resampled.require_column(AVG_TEMPERATURE_COLUMN)?;
    let rounded = (0..resampled.len())
        .map(|row| mean_temperature.get_f64(row).map(|t| t.round_ties_even() as i64))
        .collect();

    let mut weather = TimeSeriesTable::new(resampled.index().to_vec())?;
    weather.add_column(AVG_TEMPERATURE_COLUMN, ColumnData::Int(rounded))?;
    weather.add_column(
        PRECIPITATION_SUM_COLUMN,
        resampled.require_column(PRECIPITATION_SUM_COLUMN)?.clone(),
    )?;

    Ok(weather)
}

/// A target value reported for a calendar month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub year: i32,
    pub month: u32,
    pub value: Option<f64>,
}

/// Replace each missing value with the next observed one.
///
/// Trailing missing values have nothing to copy and stay missing.
pub fn backward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut filled = values.to_vec();
    let mut next = None;
    for value in filled.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
    filled
}

/// Month-end indexed base table from monthly records, missing values back-filled
pub fn monthly_base_table(records: &[MonthlyRecord], column: &str) -> Result<TimeSeriesTable> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| (r.year, r.month));

    let index = sorted
        .iter()
        .map(|r| {
            month_end(r.year, r.month).ok_or_else(|| {
                PulseError::InvalidArgument(format!("Invalid month {}-{}", r.year, r.month))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let values: Vec<Option<f64>> = sorted.iter().map(|r| r.value).collect();
    let mut table = TimeSeriesTable::new(index)?;
    table.add_column(column, ColumnData::Float(backward_fill(&values)))?;
    Ok(table)
}
