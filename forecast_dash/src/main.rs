//! forecast-dash: forecast one index constituent from the terminal

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use forecast_dash::universe::{with_suffix, Universe};
use forecast_dash::{export, logging, render, SAMPLE_UNIVERSE};
use forecast_engine::automl::BlendRule;
use forecast_engine::config::{ExecutionKind, Provider};
use forecast_engine::source::{CachedSource, CsvSource, PriceSource, YahooSource};
use forecast_engine::{DashboardConfig, ForecastPipeline, Strategy};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "forecast-dash")]
#[command(about = "Short-horizon price forecasts for NIFTY 500 constituents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a price history and forecast it
    Forecast(ForecastArgs),

    /// List or search the constituent universe
    Universe {
        /// Constituent CSV with Symbol and Company Name columns
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Only show entries whose symbol or name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Write a configuration file with every default filled in
    InitConfig {
        #[arg(default_value = "forecast-dash.toml")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct ForecastArgs {
    /// TOML configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticker, with or without the .NS suffix
    #[arg(short, long)]
    symbol: Option<String>,

    /// First day of history (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Day after the last day of history (YYYY-MM-DD); defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// seasonal-search or automl-ensemble
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Read prices from a CSV file instead of Yahoo Finance
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Holiday calendar for the seasonal model (IND, US, GB)
    #[arg(long, conflicts_with = "no_holidays")]
    country: Option<String>,

    /// Fit the seasonal model without holidays
    #[arg(long)]
    no_holidays: bool,

    /// Hyperparameter combinations to sample
    #[arg(long)]
    trials: Option<usize>,

    /// Days to forecast with the seasonal strategy
    #[arg(long)]
    future_days: Option<usize>,

    /// Days to forecast with the automl strategy
    #[arg(long)]
    horizon: Option<usize>,

    /// Blend rule for the automl strategy (gmean, mean, median)
    #[arg(long)]
    blend: Option<BlendRule>,

    #[arg(long)]
    seed: Option<u64>,

    /// Run the final cross-validation on one thread
    #[arg(long)]
    sequential: bool,

    /// Constituent CSV used to show the company name
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Write the forecast table as CSV
    #[arg(long)]
    out_csv: Option<PathBuf>,

    /// Write the whole report as JSON
    #[arg(long)]
    out_json: Option<PathBuf>,
}

impl ForecastArgs {
    fn resolve_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::load(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => DashboardConfig::default(),
        };

        if let Some(symbol) = &self.symbol {
            config.symbol = with_suffix(symbol);
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if self.end.is_some() {
            config.end = self.end;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(path) = &self.csv {
            config.source.provider = Provider::Csv;
            config.source.csv_path = Some(path.clone());
        }
        if let Some(country) = &self.country {
            config.seasonal.country = Some(country.clone());
        }
        if self.no_holidays {
            config.seasonal.country = None;
        }
        if let Some(trials) = self.trials {
            config.seasonal.trial_bound = trials;
            config.automl.tuning_trials = trials;
        }
        if let Some(days) = self.future_days {
            config.seasonal.future_period_days = days;
        }
        if let Some(horizon) = self.horizon {
            config.automl.horizon = horizon;
        }
        if let Some(blend) = self.blend {
            config.automl.blend_rule = blend;
        }
        if let Some(seed) = self.seed {
            config.seasonal.seed = seed;
            config.automl.seed = seed;
        }
        if self.sequential {
            config.seasonal.execution = ExecutionKind::Sequential;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run_forecast(args: ForecastArgs) -> Result<()> {
    let config = args.resolve_config()?;

    let source: Box<dyn PriceSource> = match (&config.source.provider, &config.source.csv_path) {
        (Provider::Csv, Some(path)) => Box::new(CsvSource::new(path)),
        _ => Box::new(YahooSource::new()?),
    };
    let pipeline = ForecastPipeline::new(CachedSource::new(source), config)?;

    let universe_path = args.universe.unwrap_or_else(|| PathBuf::from(SAMPLE_UNIVERSE));
    let company = Universe::load(&universe_path)
        .ok()
        .and_then(|u| u.company(&pipeline.config().symbol).map(str::to_string));

    let report = pipeline.run()?;
    info!(symbol = %report.symbol, rows = report.forecast().len(), "forecast ready");

    println!("{}", render::report(&report, company.as_deref()));

    if let Some(path) = &args.out_csv {
        export::write_forecast_csv(report.forecast(), path)?;
        println!("Forecast written to {}", path.display());
    }
    if let Some(path) = &args.out_json {
        export::write_report_json(&report, path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_universe(file: Option<PathBuf>, search: Option<String>) -> Result<()> {
    let path = file.unwrap_or_else(|| PathBuf::from(SAMPLE_UNIVERSE));
    let universe = Universe::load(&path).with_context(|| format!("reading {}", path.display()))?;

    let entries = match &search {
        Some(query) => universe.search(query),
        None => universe.constituents().iter().collect(),
    };

    println!("{:<16} {}", "Symbol", "Company Name");
    println!("{:-<60}", "");
    for c in &entries {
        println!("{:<16} {}", c.symbol, c.company);
    }
    println!("\n{} of {} constituents", entries.len(), universe.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Forecast(args) => run_forecast(args),
        Commands::Universe { file, search } => run_universe(file, search),
        Commands::InitConfig { path } => {
            DashboardConfig::default().save(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}
