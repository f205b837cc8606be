use chrono::{Duration, NaiveDate};
use forecast_engine::config::{ExecutionKind, Provider};
use forecast_engine::progress::NoProgress;
use forecast_engine::source::CsvSource;
use forecast_engine::{DashboardConfig, ForecastPipeline, Strategy, StrategyReport};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Engine: Seasonal Search from CSV");
    println!("=========================================\n");

    let start = NaiveDate::from_ymd_opt(2023, 1, 2).ok_or("bad start date")?;

    // Use the CSV given on the command line, or write a sample one
    let dir = tempfile::tempdir()?;
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = dir.path().join("prices.csv");
            write_sample_prices(&path, start)?;
            path
        }
    };
    println!("Reading prices from {}", path.display());
    let mut config = DashboardConfig {
        symbol: "INFY.NS".to_string(),
        start,
        end: Some(start + Duration::days(365)),
        strategy: Strategy::SeasonalSearch,
        ..DashboardConfig::default()
    };
    config.source.provider = Provider::Csv;
    config.source.csv_path = Some(path.clone());
    config.seasonal.initial_days = 120;
    config.seasonal.trial_bound = 5;
    config.seasonal.future_period_days = 10;
    config.seasonal.execution = ExecutionKind::Sequential;

    let pipeline = ForecastPipeline::new(CsvSource::new(&path), config)?.with_progress(Box::new(NoProgress));
    let report = pipeline.run()?;

    let StrategyReport::SeasonalSearch(seasonal) = &report.outcome else {
        return Err("expected seasonal-search output".into());
    };

    println!("\nBest parameters: {}", seasonal.best);
    println!("Cross-validated MAPE: {}", seasonal.mape);

    println!("\nForecast:");
    for (row, part) in seasonal.forecast.iter().zip(&seasonal.components) {
        println!(
            "  {}: {:.2} ({:.2} .. {:.2})  trend {:.2}, weekly {:+.2}, yearly {:+.2}, holidays {:+.2}",
            row.date, row.forecast, row.lower, row.upper, part.trend, part.weekly, part.yearly, part.holidays
        );
    }

    Ok(())
}

// Weekday closes with a drift and a weekly swing
fn write_sample_prices(path: &Path, start: NaiveDate) -> std::io::Result<()> {
    let swing = [0.0, 6.0, -4.0, 2.0, 8.0];

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "date,close")?;
    for i in 0..250 {
        if i % 7 >= 5 {
            continue;
        }
        let date = start + Duration::days(i as i64);
        let price = 1450.0 + 0.8 * i as f64 + swing[i % 7] + 10.0 * (i as f64 / 30.0).sin();
        writeln!(file, "{},{:.2}", date, price)?;
    }
    Ok(())
}
