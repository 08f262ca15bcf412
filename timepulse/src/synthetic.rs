//! Seeded synthetic series for tests and demos

use crate::calendar::month_end;
use crate::collectors::STRINGENCY_INDEX_COLUMN;
use crate::data::TimeSeriesTable;
use crate::error::{PulseError, Result};
use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distribution of the monthly value of one place
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl PlaceStatistics {
    pub fn new(mean: f64, std: f64, min: f64, max: f64) -> Result<Self> {
        if std.is_nan() || std < 0.0 || !(min <= max) {
            return Err(PulseError::InvalidArgument(format!(
                "Invalid place statistics: std {}, range [{}, {}]",
                std, min, max
            )));
        }
        Ok(Self { mean, std, min, max })
    }
}

/// Statistics of the seven reference places `a` through `g`
pub fn default_places() -> BTreeMap<String, PlaceStatistics> {
    [
        ("a", 3_794_562.457_875, 1_572_850.703_455_978, 1_614_366.0, 7_230_859.2),
        ("b", 3_743_471.0, 1_529_672.221_080_572, 1_613_450.0, 6_844_340.0),
        ("c", 465_997.784_810_126_6, 374_236.367_895_830_5, 0.0, 1_286_498.0),
        ("d", 389_683.212_5, 133_699.419_739_014_6, 137_743.0, 676_129.0),
        ("e", 0.0, 0.0, 0.0, 0.0),
        ("f", 48_711.262_5, 118_549.192_241_266_7, 0.0, 535_042.0),
        ("g", 1_478.037_5, 9_437.022_339_919_808, 0.0, 69_600.0),
    ]
    .into_iter()
    .map(|(name, mean, std, min, max)| (name.to_string(), PlaceStatistics { mean, std, min, max }))
    .collect()
}

/// Generator of month-end `value` series, reproducible from a seed
#[derive(Debug, Clone)]
pub struct MockSeriesGenerator {
    rng: ChaCha8Rng,
}

impl MockSeriesGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn draw(&mut self, normal: &Normal<f64>, stats: &PlaceStatistics) -> f64 {
        let value = normal.sample(&mut self.rng).clamp(stats.min, stats.max);
        (value * 10.0).round() / 10.0
    }

    /// One value per month from January of `start_year` to December of
    /// `end_year`, drawn from a normal distribution, clipped to the place's
    /// range and rounded to one decimal.
    pub fn monthly_series(
        &mut self,
        stats: &PlaceStatistics,
        start_year: i32,
        end_year: i32,
    ) -> Result<TimeSeriesTable> {
        let places = BTreeMap::from([("value".to_string(), *stats)]);
        let mut all = self.monthly_places(&places, start_year, end_year)?;
        all.remove("value")
            .ok_or_else(|| PulseError::DataError("Generated series is missing".to_string()))
    }

    /// A series per place, drawn month by month and place by place in name order
    pub fn monthly_places(
        &mut self,
        places: &BTreeMap<String, PlaceStatistics>,
        start_year: i32,
        end_year: i32,
    ) -> Result<BTreeMap<String, TimeSeriesTable>> {
        if start_year > end_year {
            return Err(PulseError::InvalidArgument(format!(
                "Start year {} is after end year {}",
                start_year, end_year
            )));
        }

        let distributions = places
            .iter()
            .map(|(name, stats)| {
                let stats = PlaceStatistics::new(stats.mean, stats.std, stats.min, stats.max)?;
                Normal::new(stats.mean, stats.std)
                    .map(|normal| (name.clone(), (normal, stats)))
                    .map_err(|e| PulseError::InvalidArgument(format!("Place '{}': {}", name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut index = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); distributions.len()];
        for year in start_year..=end_year {
            for month in 1..=12 {
                let date = month_end(year, month).ok_or_else(|| {
                    PulseError::InvalidArgument(format!(
                        "Year {} is outside the supported calendar",
                        year
                    ))
                })?;
                index.push(date);
                for (column, (_, (normal, stats))) in values.iter_mut().zip(&distributions) {
                    column.push(self.draw(normal, stats));
                }
            }
        }

        distributions
            .iter()
            .zip(values)
            .map(|((name, _), column)| {
                let table =
                    TimeSeriesTable::new(index.clone())?.with_float_column("value", &column)?;
                Ok((name.clone(), table))
            })
            .collect()
    }

    /// Daily `stringency_index` from `start` to `end` as a bounded random walk in `[0, 100]`
    pub fn daily_stringency_index(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeriesTable> {
        if start > end {
            return Err(PulseError::InvalidArgument(format!(
                "Range start {} is after range end {}",
                start, end
            )));
        }

        let mut index = Vec::new();
        let mut values = Vec::new();
        let mut level: f64 = self.rng.gen_range(0.0..100.0);
        let mut date = start;
        while date <= end {
            index.push(date);
            values.push((level * 100.0).round() / 100.0);
            level = (level + self.rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0);
            date = date.checked_add_days(Days::new(1)).ok_or_else(|| {
                PulseError::InvalidArgument(format!("Date {} has no successor", date))
            })?;
        }

        TimeSeriesTable::new(index)?.with_float_column(STRINGENCY_INDEX_COLUMN, &values)
    }
}

/// Fixed-date holidays (1 Jan, 6 Jan, 1 May, 15 Aug, 12 Oct, 1 Nov, 6 Dec,
/// 8 Dec, 25 Dec) for every year from `start_year` to `end_year`
pub fn fixed_holidays(start_year: i32, end_year: i32) -> Vec<NaiveDate> {
    const FIXED: [(u32, u32); 9] = [
        (1, 1),
        (1, 6),
        (5, 1),
        (8, 15),
        (10, 12),
        (11, 1),
        (12, 6),
        (12, 8),
        (12, 25),
    ];

    (start_year..=end_year)
        .flat_map(|year| {
            FIXED
                .iter()
                .filter_map(move |&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        })
        .collect()
}
