use std::collections::BTreeMap;
use timepulse::calendar::Frequency;
use timepulse::collectors::{holiday_count_table, stringency_category_table};
use timepulse::models::{ModelKind, ModelRegistry};
use timepulse::pipeline::{DataPipeline, PipelineConfig, SplitStrategy};
use timepulse::runner::run_registered;
use timepulse::synthetic::{default_places, fixed_holidays, MockSeriesGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timepulse=info".into()),
        )
        .init();

    // An optional JSON file overrides the default settings
    let config = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading configuration from: {}", path);
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig {
            split_strategy: SplitStrategy::Chronological,
            ..PipelineConfig::default()
        },
    };
    println!("Configuration:\n{}", config.to_json_string()?);

    let mut generator = MockSeriesGenerator::new(config.random_seed);
    let places = default_places();
    let series = generator.monthly_places(&places, 2016, 2022)?;

    let holidays = holiday_count_table(&fixed_holidays(2016, 2022), Frequency::MonthEnd)?;
    let start = chrono::NaiveDate::from_ymd_opt(2016, 1, 1).ok_or("invalid start date")?;
    let end = chrono::NaiveDate::from_ymd_opt(2022, 12, 31).ok_or("invalid end date")?;
    let daily_index = generator.daily_stringency_index(start, end)?;
    let stringency = stringency_category_table(&daily_index, config.frequency)?;

    let pipeline = DataPipeline::new(config)?;
    let registry = ModelRegistry::with_builtins();

    let mut results: BTreeMap<(String, ModelKind), f64> = BTreeMap::new();
    for (place, base) in &series {
        let split = match pipeline.run(base, &[&holidays, &stringency]) {
            Ok(split) => split,
            Err(e) => {
                println!("Skipping place {}: {}", place, e);
                continue;
            }
        };

        for kind in registry.kinds() {
            let run = run_registered(&registry, kind, &split)?;
            println!("Place {} / {}: {}", place, kind, run.metrics);
            results.insert((place.clone(), kind), run.metrics.mae);
        }
    }

    println!("\nMAE by place:");
    for ((place, kind), mae) in &results {
        println!("  {:<3} {:<8} {:.2}", place, kind.to_string(), mae);
    }

    Ok(())
}
