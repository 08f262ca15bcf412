//! Canonical calendars and alignment of auxiliary series onto a base series
//!
//! Auxiliary sources (holiday counts, stringency categories, weather) arrive on
//! their own irregular date grids. They are first laid onto a gap-free grid of
//! period-end dates spanning the base series, then joined onto the base rows.

use crate::data::{ColumnData, TimeSeriesTable};
use crate::error::{PulseError, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Period grid on which series are aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    /// Every calendar day
    Daily,
    /// Sundays, closing Monday-to-Sunday weeks
    WeekEnd,
    /// Last day of each month
    #[default]
    MonthEnd,
}

impl Frequency {
    /// Last date of the period that contains `date`
    pub fn period_end(self, date: NaiveDate) -> Result<NaiveDate> {
        let end = match self {
            Frequency::Daily => Some(date),
            Frequency::WeekEnd => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date.checked_add_days(Days::new(u64::from(to_sunday)))
            }
            Frequency::MonthEnd => month_end(date.year(), date.month()),
        };
        end.ok_or_else(|| out_of_range(date))
    }

    /// The period end following `end`
    fn next_period_end(self, end: NaiveDate) -> Result<NaiveDate> {
        let next_day = end.succ_opt().ok_or_else(|| out_of_range(end))?;
        self.period_end(next_day)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::WeekEnd => write!(f, "week-end"),
            Frequency::MonthEnd => write!(f, "month-end"),
        }
    }
}

impl FromStr for Frequency {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "d" | "daily" => Ok(Frequency::Daily),
            "w" | "week-end" | "weekly" => Ok(Frequency::WeekEnd),
            "m" | "month-end" | "monthly" => Ok(Frequency::MonthEnd),
            _ => Err(PulseError::InvalidArgument(format!(
                "Unsupported frequency: {}",
                s
            ))),
        }
    }
}

fn out_of_range(date: NaiveDate) -> PulseError {
    PulseError::InvalidArgument(format!("Date {} is outside the supported calendar", date))
}

/// Last day of `month` in `year`
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Gap-free ascending period-end dates within `[start, end]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDateRange {
    frequency: Frequency,
    dates: Vec<NaiveDate>,
}

impl CanonicalDateRange {
    /// Every period end `e` with `start <= e <= end`.
    ///
    /// The range is empty when `start` and `end` fall in the same period and
    /// that period ends after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Result<Self> {
        if start > end {
            return Err(PulseError::InvalidArgument(format!(
                "Range start {} is after range end {}",
                start, end
            )));
        }

        let mut dates = Vec::new();
        let mut current = frequency.period_end(start)?;
        while current <= end {
            dates.push(current);
            current = frequency.next_period_end(current)?;
        }

        Ok(Self { frequency, dates })
    }

    /// The range spanning the observed dates of `table`
    pub fn spanning(table: &TimeSeriesTable, frequency: Frequency) -> Result<Self> {
        match (table.min_date(), table.max_date()) {
            (Some(min_date), Some(max_date)) => Self::new(min_date, max_date, frequency),
            _ => Err(PulseError::InvalidArgument(
                "Cannot build a calendar from an empty table".to_string(),
            )),
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }
}

/// Lay every column of `table` onto the canonical dates.
///
/// Dates outside the range are dropped, canonical dates without an
/// observation get 0, and every value is truncated to an integer.
pub fn align_to_calendar(
    table: &TimeSeriesTable,
    range: &CanonicalDateRange,
) -> Result<TimeSeriesTable> {
    let rows: Vec<Option<usize>> = range.dates().iter().map(|d| table.position(*d)).collect();

    let mut aligned = TimeSeriesTable::new(range.dates().to_vec())?;
    for column in table.columns() {
        let filled = column.data().to_filled_int();
        let values = rows
            .iter()
            .map(|row| Some(row.map(|r| filled[r]).unwrap_or(0)))
            .collect();
        aligned.add_column(column.name(), ColumnData::Int(values))?;
    }

    Ok(aligned)
}

/// Merge auxiliary tables onto the canonical calendar of `base`.
///
/// The canonical range runs from the first to the last date of `base` at
/// `frequency`. Each auxiliary table is aligned onto that range with
/// [`align_to_calendar`] and then left-joined onto the base rows: base dates
/// that are not canonical dates get missing auxiliary values. The base table is
/// not modified.
pub fn merge_on_canonical_calendar(
    base: &TimeSeriesTable,
    auxiliaries: &[&TimeSeriesTable],
    frequency: Frequency,
) -> Result<TimeSeriesTable> {
    if base.is_empty() {
        return Err(PulseError::InvalidArgument(
            "Base table is empty; it has no date extent to align on".to_string(),
        ));
    }

    let range = CanonicalDateRange::spanning(base, frequency)?;
    debug!(
        rows = base.len(),
        periods = range.len(),
        auxiliaries = auxiliaries.len(),
        %frequency,
        "merging auxiliary tables onto canonical calendar"
    );

    let mut merged = base.clone();
    for auxiliary in auxiliaries {
        let aligned = align_to_calendar(auxiliary, &range)?;
        let rows: Vec<Option<usize>> = base.index().iter().map(|d| aligned.position(*d)).collect();

        for column in aligned.columns() {
            let data = column.data().take_optional(&rows);
            merged.add_column(column.name(), data)?;
        }
    }

    Ok(merged)
}

/// How values falling in the same period are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of observations; empty periods give 0
    Sum,
    /// Arithmetic mean as a float; empty periods are missing
    Mean,
    /// Most frequent value, smallest on ties; empty periods are missing
    Mode,
}

fn aggregate(values: &[f64], aggregation: Aggregation) -> Option<f64> {
    match aggregation {
        Aggregation::Sum => Some(values.iter().sum()),
        Aggregation::Mean if values.is_empty() => None,
        Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        Aggregation::Mode => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mut best: Option<(f64, usize)> = None;
            let mut start = 0;
            while start < sorted.len() {
                let value = sorted[start];
                let run = sorted[start..].iter().take_while(|v| **v == value).count();
                if best.map_or(true, |(_, count)| run > count) {
                    best = Some((value, run));
                }
                start += run;
            }
            best.map(|(value, _)| value)
        }
    }
}

/// Group the rows of `table` into periods and aggregate the listed columns.
///
/// The result covers every period from the one holding the first row to the
/// one holding the last row. Integer columns stay integer except under
/// [`Aggregation::Mean`].
pub fn resample(
    table: &TimeSeriesTable,
    frequency: Frequency,
    columns: &[(&str, Aggregation)],
) -> Result<TimeSeriesTable> {
    let range = match (table.min_date(), table.max_date()) {
        (Some(first), Some(last)) => {
            CanonicalDateRange::new(first, frequency.period_end(last)?, frequency)?
        }
        _ => {
            return Err(PulseError::InvalidArgument(
                "Cannot resample an empty table".to_string(),
            ))
        }
    };

    let mut resampled = TimeSeriesTable::new(range.dates().to_vec())?;
    for &(name, aggregation) in columns {
        let data = table.require_column(name)?;

        let mut groups: BTreeMap<NaiveDate, Vec<f64>> =
            range.dates().iter().map(|d| (*d, Vec::new())).collect();
        for (row, date) in table.index().iter().enumerate() {
            if let Some(value) = data.get_f64(row) {
                groups.entry(frequency.period_end(*date)?).or_default().push(value);
            }
        }

        let aggregated: Vec<Option<f64>> = groups
            .values()
            .map(|values| aggregate(values, aggregation))
            .collect();
        let column = match (data, aggregation) {
            (ColumnData::Int(_), Aggregation::Sum | Aggregation::Mode) => {
                ColumnData::Int(aggregated.iter().map(|v| v.map(|x| x as i64)).collect())
            }
            _ => ColumnData::Float(aggregated),
        };
        resampled.add_column(name, column)?;
    }

    Ok(resampled)
}
