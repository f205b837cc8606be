//! Dashboard configuration
//!
//! Loaded from a TOML file, overridden from the command line, and validated
//! once at the input boundary before any data is fetched.

use crate::automl::{AutoMlConfig, BlendRule, MAX_FORECAST_HORIZON};
use crate::cv::{CvConfig, ExecutionMode, MetricAggregation};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which forecasting flow a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    SeasonalSearch,
    AutomlEnsemble,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::SeasonalSearch => f.write_str("seasonal-search"),
            Strategy::AutomlEnsemble => f.write_str("automl-ensemble"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seasonal-search" | "seasonal" | "prophet" => Ok(Strategy::SeasonalSearch),
            "automl-ensemble" | "automl" => Ok(Strategy::AutomlEnsemble),
            other => Err(ForecastError::Configuration(format!(
                "Unknown strategy '{}' (expected seasonal-search or automl-ensemble)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub provider: Provider,
    /// Required when `provider = "csv"`
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionKind {
    Sequential,
    #[default]
    Parallel,
}

/// Settings of the seasonal-search strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSettings {
    pub initial_days: usize,
    pub period_days: usize,
    pub horizon_days: usize,
    pub future_period_days: usize,
    pub trial_bound: usize,
    /// Holiday calendar; `None` disables holiday features
    pub country: Option<String>,
    pub aggregation: MetricAggregation,
    /// How the final cross-validation runs; the search itself is sequential
    pub execution: ExecutionKind,
    pub workers: usize,
    pub fold_timeout_secs: u64,
    pub seed: u64,
}

impl Default for SeasonalSettings {
    fn default() -> Self {
        Self {
            initial_days: 200,
            period_days: 10,
            horizon_days: 7,
            future_period_days: 7,
            trial_bound: 10,
            country: Some("IND".to_string()),
            aggregation: MetricAggregation::LatestFold,
            execution: ExecutionKind::Parallel,
            workers: 4,
            fold_timeout_secs: 120,
            seed: 42,
        }
    }
}

impl SeasonalSettings {
    pub fn cv_config(&self) -> Result<CvConfig> {
        CvConfig::new(self.initial_days, self.period_days, self.horizon_days)
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match self.execution {
            ExecutionKind::Sequential => ExecutionMode::Sequential,
            ExecutionKind::Parallel => ExecutionMode::Parallel {
                workers: self.workers,
                fold_timeout: Duration::from_secs(self.fold_timeout_secs),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range("seasonal.initial_days", self.initial_days, 7, 756)?;
        check_range("seasonal.period_days", self.period_days, 7, 252)?;
        check_range("seasonal.horizon_days", self.horizon_days, 7, 252)?;
        check_range("seasonal.future_period_days", self.future_period_days, 1, 252)?;
        check_min("seasonal.trial_bound", self.trial_bound)?;
        check_min("seasonal.workers", self.workers)?;
        if self.fold_timeout_secs == 0 {
            return Err(ForecastError::Configuration(
                "seasonal.fold_timeout_secs must be at least 1".to_string(),
            ));
        }
        if let Some(country) = &self.country {
            crate::holidays::HolidayCalendar::for_country(country)?;
        }
        Ok(())
    }
}

/// Settings of the automl-ensemble strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoMlSettings {
    /// Forecast length, also used as the holdout and fold length
    pub horizon: usize,
    pub fold_count: usize,
    pub ensemble_size: usize,
    pub blend_rule: BlendRule,
    pub tuning_trials: usize,
    pub seed: u64,
}

impl Default for AutoMlSettings {
    fn default() -> Self {
        Self {
            horizon: 5,
            fold_count: 5,
            ensemble_size: 3,
            blend_rule: BlendRule::GeometricMean,
            tuning_trials: 10,
            seed: 42,
        }
    }
}

impl AutoMlSettings {
    /// Engine configuration. The holdout stays at the default fold length;
    /// only the final forecast follows `horizon`.
    pub fn engine_config(&self) -> AutoMlConfig {
        AutoMlConfig {
            forecast_horizon: self.horizon,
            fold_count: self.fold_count,
            ensemble_size: self.ensemble_size,
            blend_rule: self.blend_rule,
            tuning_trials: self.tuning_trials,
            seed: self.seed,
            ..AutoMlConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range("automl.horizon", self.horizon, 1, MAX_FORECAST_HORIZON)?;
        check_min("automl.fold_count", self.fold_count)?;
        check_min("automl.ensemble_size", self.ensemble_size)?;
        check_min("automl.tuning_trials", self.tuning_trials)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub symbol: String,
    pub start: NaiveDate,
    /// Exclusive; today when absent
    pub end: Option<NaiveDate>,
    pub strategy: Strategy,
    pub source: SourceConfig,
    pub seasonal: SeasonalSettings,
    pub automl: AutoMlSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            symbol: "RELIANCE.NS".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end: None,
            strategy: Strategy::default(),
            source: SourceConfig::default(),
            seasonal: SeasonalSettings::default(),
            automl: AutoMlSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file; missing keys take defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DashboardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved end date
    pub fn end_date(&self) -> NaiveDate {
        self.end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ForecastError::Configuration(
                "symbol must not be empty".to_string(),
            ));
        }
        let end = self.end_date();
        if self.start >= end {
            return Err(ForecastError::Configuration(format!(
                "The end date must fall after the start date ({} >= {})",
                self.start, end
            )));
        }
        if self.source.provider == Provider::Csv && self.source.csv_path.is_none() {
            return Err(ForecastError::Configuration(
                "source.csv_path is required for the csv provider".to_string(),
            ));
        }
        self.seasonal.validate()?;
        self.automl.validate()
    }
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        return Err(ForecastError::Configuration(format!(
            "{} must be within {}..={}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

fn check_min(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ForecastError::Configuration(format!(
            "{} must be at least 1",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    fn valid() -> DashboardConfig {
        DashboardConfig {
            end: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = valid();
        config.validate().unwrap();
        assert_eq!(config.seasonal.initial_days, 200);
        assert_eq!(config.automl.blend_rule, BlendRule::GeometricMean);
        assert_eq!(config.strategy, Strategy::SeasonalSearch);
    }

    #[rstest]
    #[case(6, 10, 7, 7)]
    #[case(757, 10, 7, 7)]
    #[case(200, 6, 7, 7)]
    #[case(200, 253, 7, 7)]
    #[case(200, 10, 6, 7)]
    #[case(200, 10, 7, 0)]
    #[case(200, 10, 7, 253)]
    fn test_seasonal_bounds(
        #[case] initial: usize,
        #[case] period: usize,
        #[case] horizon: usize,
        #[case] future: usize,
    ) {
        let mut config = valid();
        config.seasonal.initial_days = initial;
        config.seasonal.period_days = period;
        config.seasonal.horizon_days = horizon;
        config.seasonal.future_period_days = future;

        assert!(matches!(config.validate(), Err(ForecastError::Configuration(_))));
    }

    #[rstest]
    #[case(0)]
    #[case(61)]
    fn test_automl_horizon_bounds(#[case] horizon: usize) {
        let mut config = valid();
        config.automl.horizon = horizon;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_order_and_csv_path() {
        let mut config = valid();
        config.start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.source.provider = Provider::Csv;
        assert!(config.validate().is_err());
        config.source.csv_path = Some(PathBuf::from("prices.csv"));
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_country_rejected() {
        let mut config = valid();
        config.seasonal.country = Some("XX".to_string());
        assert!(config.validate().is_err());
        config.seasonal.country = None;
        config.validate().unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");

        let mut config = valid();
        config.strategy = Strategy::AutomlEnsemble;
        config.automl.blend_rule = BlendRule::Median;
        config.save(&path).unwrap();

        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: DashboardConfig = toml::from_str(
            r#"
            symbol = "TCS.NS"
            strategy = "automl-ensemble"

            [automl]
            blend_rule = "mean"
            "#,
        )
        .unwrap();

        assert_eq!(config.symbol, "TCS.NS");
        assert_eq!(config.strategy, Strategy::AutomlEnsemble);
        assert_eq!(config.automl.blend_rule, BlendRule::Mean);
        assert_eq!(config.automl.horizon, 5);
        assert_eq!(config.seasonal, SeasonalSettings::default());
    }

    #[test]
    fn test_execution_mode() {
        let mut settings = SeasonalSettings::default();
        assert_eq!(
            settings.execution_mode(),
            ExecutionMode::Parallel {
                workers: 4,
                fold_timeout: Duration::from_secs(120)
            }
        );
        settings.execution = ExecutionKind::Sequential;
        assert_eq!(settings.execution_mode(), ExecutionMode::Sequential);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("automl".parse::<Strategy>().unwrap(), Strategy::AutomlEnsemble);
        assert_eq!(Strategy::SeasonalSearch.to_string(), "seasonal-search");
        assert!("arima".parse::<Strategy>().is_err());
    }
}
