//! Date-indexed tables and feature matrices

use crate::error::{PulseError, Result};
use chrono::NaiveDate;
use num_traits::ToPrimitive;
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name of the date index when a table is exported
pub const INDEX_NAME: &str = "Date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values of one table column; `None` marks a missing observation
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Int(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row` as a float, `None` when missing or out of range
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Float(values) => values.get(row).copied().flatten(),
            ColumnData::Int(values) => values.get(row).copied().flatten().map(|v| v as f64),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        self.get_f64(row).is_none()
    }

    /// Values moved `periods` rows later; the first `periods` rows become missing
    pub fn shifted(&self, periods: usize) -> ColumnData {
        fn shift<T: Copy>(values: &[Option<T>], periods: usize) -> Vec<Option<T>> {
            let n = values.len();
            let mut out = vec![None; periods.min(n)];
            out.extend_from_slice(&values[..n.saturating_sub(periods)]);
            out
        }

        match self {
            ColumnData::Float(values) => ColumnData::Float(shift(values, periods)),
            ColumnData::Int(values) => ColumnData::Int(shift(values, periods)),
        }
    }

    /// Rows picked by position, in the given order
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Float(values) => {
                ColumnData::Float(rows.iter().map(|&r| values.get(r).copied().flatten()).collect())
            }
            ColumnData::Int(values) => {
                ColumnData::Int(rows.iter().map(|&r| values.get(r).copied().flatten()).collect())
            }
        }
    }

    /// Rows picked by optional position; `None` positions become missing values
    pub fn take_optional(&self, rows: &[Option<usize>]) -> ColumnData {
        match self {
            ColumnData::Float(values) => ColumnData::Float(
                rows.iter()
                    .map(|r| r.and_then(|r| values.get(r).copied().flatten()))
                    .collect(),
            ),
            ColumnData::Int(values) => ColumnData::Int(
                rows.iter()
                    .map(|r| r.and_then(|r| values.get(r).copied().flatten()))
                    .collect(),
            ),
        }
    }

    /// Integer view with missing values filled by 0 and floats truncated toward zero
    pub fn to_filled_int(&self) -> Vec<i64> {
        match self {
            ColumnData::Int(values) => values.iter().map(|v| v.unwrap_or(0)).collect(),
            ColumnData::Float(values) => values
                .iter()
                .map(|v| match v {
                    Some(x) if x.is_finite() => x.trunc() as i64,
                    _ => 0,
                })
                .collect(),
        }
    }

    fn format_cell(&self, row: usize) -> String {
        match self {
            ColumnData::Float(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
            ColumnData::Int(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}

/// A named table column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }
}

/// Rows of named values keyed by a strictly increasing date index
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Create a table with no columns over the given dates
    pub fn new(index: Vec<NaiveDate>) -> Result<Self> {
        if let Some(pair) = index.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(PulseError::InvalidArgument(format!(
                "Date index must be unique and sorted ascending, found {} before {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Add a column, failing on a duplicate name or a length mismatch
    pub fn add_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(PulseError::InvalidArgument(format!(
                "Column '{}' already exists",
                name
            )));
        }
        if data.len() != self.index.len() {
            return Err(PulseError::InvalidArgument(format!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                data.len(),
                self.index.len()
            )));
        }

        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Builder form of [`add_column`](Self::add_column) for float values
    pub fn with_float_column<T: ToPrimitive>(mut self, name: &str, values: &[T]) -> Result<Self> {
        let values = values
            .iter()
            .map(|v| {
                v.to_f64().map(Some).ok_or_else(|| {
                    PulseError::InvalidArgument(format!(
                        "Value in column '{}' is not numeric",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.add_column(name, ColumnData::Float(values))?;
        Ok(self)
    }

    /// Builder form of [`add_column`](Self::add_column) for integer values
    pub fn with_int_column(mut self, name: &str, values: &[i64]) -> Result<Self> {
        self.add_column(name, ColumnData::Int(values.iter().copied().map(Some).collect()))?;
        Ok(self)
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Row position of `date`
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.index.binary_search(&date).ok()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Look up a column, failing with `InvalidArgument` when it is absent
    pub fn require_column(&self, name: &str) -> Result<&ColumnData> {
        self.column(name).ok_or_else(|| {
            PulseError::InvalidArgument(format!("Column '{}' not found in table", name))
        })
    }

    /// Value of `column` at `date`
    pub fn value(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let row = self.position(date)?;
        self.column(column)?.get_f64(row)
    }

    /// Column values as floats, failing when any value is missing
    pub fn float_values(&self, column: &str) -> Result<Vec<f64>> {
        let data = self.require_column(column)?;
        (0..self.len())
            .map(|row| {
                data.get_f64(row).ok_or_else(|| {
                    PulseError::DataError(format!(
                        "Column '{}' has a missing value at {}",
                        column, self.index[row]
                    ))
                })
            })
            .collect()
    }

    /// True when `row` has a value in every column
    pub fn is_complete_row(&self, row: usize) -> bool {
        self.columns.iter().all(|c| !c.data.is_missing(row))
    }

    /// Keep rows at increasing positions `rows`
    fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(rows),
                })
                .collect(),
        }
    }

    /// Copy of the table without rows that have a missing value in any column
    pub fn drop_missing(&self) -> Self {
        let rows: Vec<usize> = (0..self.len()).filter(|&r| self.is_complete_row(r)).collect();
        debug!(before = self.len(), after = rows.len(), "dropped incomplete rows");
        self.select_rows(&rows)
    }

    /// Convert the table to a polars DataFrame with a `Date` column first
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .ok_or_else(|| PulseError::DataError("Invalid epoch date".to_string()))?;
        let days: Vec<i32> = self
            .index
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();

        let mut series = vec![Series::new(INDEX_NAME, days).cast(&DataType::Date)?];
        for column in &self.columns {
            let s = match &column.data {
                ColumnData::Float(values) => Series::new(&column.name, values.as_slice()),
                ColumnData::Int(values) => Series::new(&column.name, values.as_slice()),
            };
            series.push(s);
        }

        Ok(DataFrame::new(series)?)
    }

    /// Write the table as CSV with a `Date` column first. Output is deterministic.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec![INDEX_NAME.to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        csv_writer.write_record(&header)?;

        for (row, date) in self.index.iter().enumerate() {
            let mut record = vec![date.format(DATE_FORMAT).to_string()];
            record.extend(self.columns.iter().map(|c| c.data.format_cell(row)));
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// The CSV rendering of the table as a string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| PulseError::CsvError(e.to_string()))
    }
}

/// Row-major numeric matrix with named columns and a per-row date
///
/// Rows may appear in any order, e.g. after a shuffled split.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != index.len() * columns.len() {
            return Err(PulseError::InvalidArgument(format!(
                "Expected {} values for {} rows and {} columns, got {}",
                index.len() * columns.len(),
                index.len(),
                columns.len(),
                values.len()
            )));
        }

        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// Gather `rows` of `table` (in the given order), leaving out `exclude`
    pub fn from_table_rows(
        table: &TimeSeriesTable,
        rows: &[usize],
        exclude: &str,
    ) -> Result<Self> {
        let columns: Vec<&Column> =
            table.columns().iter().filter(|c| c.name() != exclude).collect();
        let mut values = Vec::with_capacity(rows.len() * columns.len());

        for &row in rows {
            for column in &columns {
                let value = column.data().get_f64(row).ok_or_else(|| {
                    PulseError::DataError(format!(
                        "Column '{}' has a missing value at {}",
                        column.name(),
                        table.index()[row]
                    ))
                })?;
                values.push(value);
            }
        }

        Self::new(
            rows.iter().map(|&r| table.index()[r]).collect(),
            columns.iter().map(|c| c.name().to_string()).collect(),
            values,
        )
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one row; `None` past the last row
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.n_rows() {
            return None;
        }
        let n_cols = self.n_cols();
        self.values.get(row * n_cols..(row + 1) * n_cols)
    }

    /// Iterate rows in order; rows of a matrix without columns are empty slices
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows()).filter_map(move |row| self.row(row))
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column_index(name)?;
        Some(self.rows().map(|row| row[col]).collect())
    }

    /// The flat row-major buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Data loader for date-indexed tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesTable> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Create a table from a DataFrame, detecting the date column
    pub fn from_dataframe(df: DataFrame) -> Result<TimeSeriesTable> {
        let date_column = Self::detect_date_column(&df)?;
        Self::from_dataframe_with_index(df, &date_column)
    }

    /// Create a table from a DataFrame using `date_column` as the index.
    ///
    /// Rows are sorted by date. Integer columns stay integer, float columns stay
    /// float, and columns of any other type are skipped.
    pub fn from_dataframe_with_index(df: DataFrame, date_column: &str) -> Result<TimeSeriesTable> {
        let dates = Self::parse_dates(df.column(date_column)?)?;

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        let index: Vec<NaiveDate> = order.iter().map(|&i| dates[i]).collect();

        let mut table = TimeSeriesTable::new(index)?;
        for series in df.get_columns() {
            if series.name() == date_column {
                continue;
            }
            let data = match series.dtype() {
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64 => {
                    let cast = series.cast(&DataType::Int64)?;
                    let values: Vec<Option<i64>> = cast.i64()?.into_iter().collect();
                    ColumnData::Int(values).take(&order)
                }
                DataType::Float32 | DataType::Float64 => {
                    let cast = series.cast(&DataType::Float64)?;
                    let values: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
                    ColumnData::Float(values).take(&order)
                }
                other => {
                    debug!(column = series.name(), dtype = ?other, "skipping non-numeric column");
                    continue;
                }
            };
            table.add_column(series.name(), data)?;
        }

        Ok(table)
    }

    /// Detect the date column in a DataFrame
    fn detect_date_column(df: &DataFrame) -> Result<String> {
        for name in df.get_column_names() {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(name.to_string());
            }
        }

        df.get_columns()
            .first()
            .map(|s| s.name().to_string())
            .ok_or_else(|| PulseError::InvalidArgument("DataFrame has no columns".to_string()))
    }

    fn parse_dates(series: &Series) -> Result<Vec<NaiveDate>> {
        let text = series.cast(&DataType::Utf8)?;
        text.utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.ok_or_else(|| {
                    PulseError::InvalidArgument(format!("Missing date at row {}", row))
                })?;
                // timestamps keep only their calendar date
                let day = value.get(..10).unwrap_or(value);
                NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|e| {
                    PulseError::InvalidArgument(format!(
                        "Column '{}' is not a date column: cannot parse '{}' ({})",
                        series.name(),
                        value,
                        e
                    ))
                })
            })
            .collect()
    }
}
