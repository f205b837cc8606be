//! Decomposable seasonal model: piecewise-linear trend, Fourier weekly and
//! yearly seasonality, and additive holiday effects.
//!
//! The fit is a MAP estimate under Gaussian priors, which for this linear
//! design is ridge regression with one penalty per column block. Prediction
//! intervals come from simulating future trend changes and observation
//! noise with a seeded generator.

use crate::data::{ComponentRow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::holidays::HolidayCalendar;
use crate::models::{ensure_history, ensure_horizon, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::params::{ParamSet, ParameterGrid};
use chrono::{Duration, NaiveDate};
use forecast_math::fourier::fourier_features;
use forecast_math::linalg::{dot, ridge_solve};
use forecast_math::stats::{quantile, root_mean_square};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

pub const CHANGEPOINT_PRIOR_SCALE: &str = "changepoint_prior_scale";
pub const SEASONALITY_PRIOR_SCALE: &str = "seasonality_prior_scale";
pub const HOLIDAYS_PRIOR_SCALE: &str = "holidays_prior_scale";
pub const SEASONALITY_MODE: &str = "seasonality_mode";

const WEEKLY_PERIOD: f64 = 7.0;
const WEEKLY_ORDER: usize = 3;
const YEARLY_PERIOD: f64 = 365.25;
const YEARLY_ORDER: usize = 10;
/// Weekly terms need two full weeks, yearly terms two full years
const WEEKLY_MIN_DAYS: usize = 14;
const YEARLY_MIN_DAYS: usize = 730;
/// Penalty for the preliminary trend-only fit
const PILOT_PENALTY: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

impl fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityMode::Additive => f.write_str("additive"),
            SeasonalityMode::Multiplicative => f.write_str("multiplicative"),
        }
    }
}

impl FromStr for SeasonalityMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "additive" => Ok(SeasonalityMode::Additive),
            "multiplicative" => Ok(SeasonalityMode::Multiplicative),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown seasonality mode '{}'",
                other
            ))),
        }
    }
}

/// Fully specified configuration of the seasonal model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalConfig {
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    pub seasonality_mode: SeasonalityMode,
    /// Fraction of the history in which trend changepoints may sit
    pub changepoint_range: f64,
    pub n_changepoints: usize,
    pub interval_width: f64,
    /// Simulated paths per forecast; 0 disables interval estimation
    pub uncertainty_samples: usize,
    /// Country code of the holiday calendar, if any
    pub country_holidays: Option<String>,
    pub seed: u64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            seasonality_mode: SeasonalityMode::Additive,
            changepoint_range: 0.8,
            n_changepoints: 25,
            interval_width: 0.8,
            uncertainty_samples: 200,
            country_holidays: None,
            seed: 0,
        }
    }
}

impl SeasonalConfig {
    /// Override the tunable hyperparameters present in `params`
    pub fn with_params(mut self, params: &ParamSet) -> Result<Self> {
        self.changepoint_prior_scale =
            params.f64_or(CHANGEPOINT_PRIOR_SCALE, self.changepoint_prior_scale)?;
        self.seasonality_prior_scale =
            params.f64_or(SEASONALITY_PRIOR_SCALE, self.seasonality_prior_scale)?;
        self.holidays_prior_scale =
            params.f64_or(HOLIDAYS_PRIOR_SCALE, self.holidays_prior_scale)?;
        if let Some(mode) = params.get(SEASONALITY_MODE) {
            self.seasonality_mode = mode
                .as_str()
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!("{} must be text", SEASONALITY_MODE))
                })?
                .parse()?;
        }
        Ok(self)
    }

    pub fn with_changepoint_range(mut self, range: f64) -> Self {
        self.changepoint_range = range;
        self
    }

    pub fn with_country_holidays(mut self, country: Option<String>) -> Self {
        self.country_holidays = country;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The tunable hyperparameters as a combination
    pub fn to_params(&self) -> ParamSet {
        ParamSet::new()
            .with(CHANGEPOINT_PRIOR_SCALE, self.changepoint_prior_scale)
            .with(SEASONALITY_PRIOR_SCALE, self.seasonality_prior_scale)
            .with(HOLIDAYS_PRIOR_SCALE, self.holidays_prior_scale)
            .with(SEASONALITY_MODE, self.seasonality_mode.to_string().as_str())
    }

    pub fn validate(&self) -> Result<()> {
        for (label, scale) in [
            (CHANGEPOINT_PRIOR_SCALE, self.changepoint_prior_scale),
            (SEASONALITY_PRIOR_SCALE, self.seasonality_prior_scale),
            (HOLIDAYS_PRIOR_SCALE, self.holidays_prior_scale),
        ] {
            if scale <= 0.0 || !scale.is_finite() {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    label, scale
                )));
            }
        }
        if self.changepoint_range <= 0.0 || self.changepoint_range > 1.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if self.interval_width <= 0.0 || self.interval_width >= 1.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        Ok(())
    }
}

/// Default search grid over the seasonal hyperparameters
pub fn default_search_grid() -> ParameterGrid {
    ParameterGrid::new()
        .with_axis(CHANGEPOINT_PRIOR_SCALE, vec![0.001, 0.05, 0.08, 0.5])
        .with_axis(SEASONALITY_PRIOR_SCALE, vec![0.01, 1.0, 5.0, 10.0, 12.0])
        .with_axis(HOLIDAYS_PRIOR_SCALE, vec![0.01, 0.1, 1.0, 10.0])
        .with_axis(SEASONALITY_MODE, vec!["additive", "multiplicative"])
}

#[derive(Debug, Clone)]
pub struct SeasonalModel {
    name: String,
    config: SeasonalConfig,
    calendar: Option<HolidayCalendar>,
}

impl SeasonalModel {
    /// Validate the configuration and resolve its holiday calendar
    pub fn new(config: SeasonalConfig) -> Result<Self> {
        config.validate()?;
        let calendar = config
            .country_holidays
            .as_deref()
            .map(HolidayCalendar::for_country)
            .transpose()?;

        Ok(Self {
            name: format!(
                "Seasonal ({}, cps={}, sps={}, hps={})",
                config.seasonality_mode,
                config.changepoint_prior_scale,
                config.seasonality_prior_scale,
                config.holidays_prior_scale
            ),
            config,
            calendar,
        })
    }

    pub fn config(&self) -> &SeasonalConfig {
        &self.config
    }
}

/// Changepoint locations in scaled time: `count` points spread evenly over
/// the first `range` fraction of `n` daily observations, the origin excluded.
fn changepoint_grid(n: usize, count: usize, range: f64) -> Vec<f64> {
    let hist = ((n as f64) * range).floor() as usize;
    let count = count.min(hist.saturating_sub(1));
    if count == 0 || n < 2 {
        return Vec::new();
    }

    let last = (hist - 1) as f64;
    let span = (n - 1) as f64;
    (1..=count)
        .map(|j| (j as f64 * last / count as f64).round() / span)
        .collect()
}

/// Column layout shared by fitting and forecasting
#[derive(Debug, Clone)]
struct Design {
    start: NaiveDate,
    span_days: f64,
    changepoints: Vec<f64>,
    weekly: bool,
    yearly: bool,
    holidays: Vec<&'static str>,
    calendar: Option<HolidayCalendar>,
}

impl Design {
    fn n_trend(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn n_weekly(&self) -> usize {
        if self.weekly {
            2 * WEEKLY_ORDER
        } else {
            0
        }
    }

    fn n_seasonal(&self) -> usize {
        let yearly = if self.yearly { 2 * YEARLY_ORDER } else { 0 };
        self.n_weekly() + yearly
    }

    fn trend_rows(&self, days: &[f64]) -> Vec<Vec<f64>> {
        days.iter()
            .map(|d| {
                let t = d / self.span_days;
                let mut row = Vec::with_capacity(self.n_trend());
                row.push(1.0);
                row.push(t);
                row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
                row
            })
            .collect()
    }

    fn seasonal_rows(&self, days: &[f64]) -> Result<Vec<Vec<f64>>> {
        let mut rows = vec![Vec::with_capacity(self.n_seasonal()); days.len()];
        if self.weekly {
            for (row, block) in rows.iter_mut().zip(fourier_features(days, WEEKLY_PERIOD, WEEKLY_ORDER)?) {
                row.extend(block);
            }
        }
        if self.yearly {
            for (row, block) in rows.iter_mut().zip(fourier_features(days, YEARLY_PERIOD, YEARLY_ORDER)?) {
                row.extend(block);
            }
        }
        Ok(rows)
    }

    fn holiday_rows(&self, days: &[f64]) -> Vec<Vec<f64>> {
        days.iter()
            .map(|d| {
                let date = self.start + Duration::days(*d as i64);
                let today = self.calendar.as_ref().and_then(|c| c.holiday_on(date));
                self.holidays
                    .iter()
                    .map(|name| if Some(*name) == today { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }
}

/// Per-step component values on the scaled axis
struct Projection {
    days: Vec<f64>,
    trend: Vec<f64>,
    weekly: Vec<f64>,
    yearly: Vec<f64>,
    holiday: Vec<f64>,
}

impl Projection {
    fn seasonal(&self) -> Vec<f64> {
        self.weekly.iter().zip(&self.yearly).map(|(w, y)| w + y).collect()
    }
}

/// A fitted seasonal model. Coefficients are on the `max |y|` scale.
#[derive(Debug, Clone)]
pub struct TrainedSeasonalModel {
    name: String,
    design: Design,
    coefficients: Vec<f64>,
    mode: SeasonalityMode,
    observed: usize,
    y_scale: f64,
    sigma: f64,
    mean_abs_delta: f64,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

impl ForecastModel for SeasonalModel {
    type Trained = TrainedSeasonalModel;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        ensure_history(&self.name, self.min_history(), series.len())?;
        let n = series.len();

        let y_scale = series
            .values()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = series.values().iter().map(|v| v / y_scale).collect();
        let days: Vec<f64> = (0..n).map(|i| i as f64).collect();

        let mut holidays = Vec::new();
        if let Some(calendar) = &self.calendar {
            for holiday in calendar.holidays_between(series.start(), series.end()) {
                if !holidays.contains(&holiday.name) {
                    holidays.push(holiday.name);
                }
            }
        }

        let design = Design {
            start: series.start(),
            span_days: (n - 1) as f64,
            changepoints: changepoint_grid(n, self.config.n_changepoints, self.config.changepoint_range),
            weekly: n >= WEEKLY_MIN_DAYS,
            yearly: n >= YEARLY_MIN_DAYS,
            holidays,
            calendar: self.calendar.clone(),
        };
        let n_trend = design.n_trend();
        let n_seasonal = design.n_seasonal();
        let n_changepoints = design.changepoints.len();

        // pilot trend-only fit gives the noise level and the trend that
        // multiplicative terms scale with
        let trend_rows = design.trend_rows(&days);
        let mut pilot_penalties = vec![0.0; n_trend];
        for p in pilot_penalties.iter_mut().skip(2) {
            *p = PILOT_PENALTY;
        }
        let pilot = ridge_solve(&trend_rows, &y, &pilot_penalties)?;
        let pilot_trend: Vec<f64> = trend_rows.iter().map(|r| dot(r, &pilot)).collect();
        let pilot_residuals: Vec<f64> = y.iter().zip(&pilot_trend).map(|(a, b)| a - b).collect();
        let noise_var = root_mean_square(&pilot_residuals)?.powi(2).max(1e-8);

        let mut seasonal_rows = design.seasonal_rows(&days)?;
        if self.config.seasonality_mode == SeasonalityMode::Multiplicative {
            for (row, trend) in seasonal_rows.iter_mut().zip(&pilot_trend) {
                row.iter_mut().for_each(|x| *x *= trend);
            }
        }
        let holiday_rows = design.holiday_rows(&days);

        let rows: Vec<Vec<f64>> = trend_rows
            .into_iter()
            .zip(seasonal_rows)
            .zip(holiday_rows)
            .map(|((mut row, seasonal), holiday)| {
                row.extend(seasonal);
                row.extend(holiday);
                row
            })
            .collect();

        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(noise_var / self.config.changepoint_prior_scale.powi(2)).take(n_changepoints));
        penalties.extend(std::iter::repeat(noise_var / self.config.seasonality_prior_scale.powi(2)).take(n_seasonal));
        penalties.extend(std::iter::repeat(noise_var / self.config.holidays_prior_scale.powi(2)).take(design.holidays.len()));

        let coefficients = ridge_solve(&rows, &y, &penalties)?;
        let residuals: Vec<f64> = rows
            .iter()
            .zip(&y)
            .map(|(row, target)| target - dot(row, &coefficients))
            .collect();
        let sigma = root_mean_square(&residuals)?;

        let deltas = &coefficients[2..n_trend];
        let mean_abs_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };

        trace!(
            model = %self.name,
            changepoints = n_changepoints,
            seasonal_terms = n_seasonal,
            holidays = design.holidays.len(),
            sigma,
            "fitted seasonal model"
        );

        Ok(TrainedSeasonalModel {
            name: self.name.clone(),
            design,
            coefficients,
            mode: self.config.seasonality_mode,
            observed: n,
            y_scale,
            sigma,
            mean_abs_delta,
            interval_width: self.config.interval_width,
            uncertainty_samples: self.config.uncertainty_samples,
            seed: self.config.seed,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        3
    }
}

impl TrainedSeasonalModel {
    /// Simulated `[lower, upper]` quantiles per step, on the scaled axis
    fn simulate_bands(
        &self,
        trend: &[f64],
        seasonal: &[f64],
        holiday: &[f64],
    ) -> Result<Vec<(f64, f64)>> {
        let horizon = trend.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let dt = 1.0 / self.design.span_days;
        let change_prob = (self.design.changepoints.len() as f64 * dt).clamp(0.0, 1.0);

        let slope_change = if self.mean_abs_delta > 0.0 {
            Some(Exp::new(1.0 / self.mean_abs_delta).map_err(|e| ForecastError::Model(e.to_string()))?)
        } else {
            None
        };
        let noise = if self.sigma > 0.0 {
            Some(Normal::new(0.0, self.sigma).map_err(|e| ForecastError::Model(e.to_string()))?)
        } else {
            None
        };

        let mut draws = vec![Vec::with_capacity(self.uncertainty_samples); horizon];
        for _ in 0..self.uncertainty_samples {
            let mut extra_slope = 0.0;
            let mut extra_level = 0.0;
            for k in 0..horizon {
                extra_level += extra_slope * dt;
                if let Some(exp) = &slope_change {
                    if rng.gen_bool(change_prob) {
                        // difference of two exponentials is Laplace distributed
                        extra_slope += exp.sample(&mut rng) - exp.sample(&mut rng);
                    }
                }

                let path_trend = trend[k] + extra_level;
                let mut value = self.combine(path_trend, seasonal[k], holiday[k]);
                if let Some(normal) = &noise {
                    value += normal.sample(&mut rng);
                }
                draws[k].push(value);
            }
        }

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;
        draws
            .iter()
            .map(|samples| Ok((quantile(samples, lower_q)?, quantile(samples, upper_q)?)))
            .collect()
    }

    fn combine(&self, trend: f64, seasonal: f64, holiday: f64) -> f64 {
        match self.mode {
            SeasonalityMode::Additive => trend + seasonal + holiday,
            SeasonalityMode::Multiplicative => trend * (1.0 + seasonal) + holiday,
        }
    }
}

impl TrainedSeasonalModel {
    /// Evaluate each fitted block over the `horizon` days after the history
    fn project(&self, horizon: usize) -> Result<Projection> {
        ensure_horizon(horizon)?;

        let first = self.observed;
        let days: Vec<f64> = (first..first + horizon).map(|d| d as f64).collect();
        let (trend_beta, rest) = self.coefficients.split_at(self.design.n_trend());
        let (seasonal_beta, holiday_beta) = rest.split_at(self.design.n_seasonal());
        let (weekly_beta, yearly_beta) = seasonal_beta.split_at(self.design.n_weekly());

        let trend = self
            .design
            .trend_rows(&days)
            .iter()
            .map(|r| dot(r, trend_beta))
            .collect();

        let mut weekly = Vec::with_capacity(horizon);
        let mut yearly = Vec::with_capacity(horizon);
        for row in self.design.seasonal_rows(&days)? {
            let (weekly_row, yearly_row) = row.split_at(weekly_beta.len());
            weekly.push(dot(weekly_row, weekly_beta));
            yearly.push(dot(yearly_row, yearly_beta));
        }

        let holiday = self
            .design
            .holiday_rows(&days)
            .iter()
            .map(|r| dot(r, holiday_beta))
            .collect();

        Ok(Projection {
            days,
            trend,
            weekly,
            yearly,
            holiday,
        })
    }

    fn date_of(&self, day: f64) -> NaiveDate {
        self.design.start + Duration::days(day as i64)
    }

    /// Trend, weekly, yearly and holiday contributions for each of the next
    /// `horizon` days, in price units. Each row sums to the point forecast.
    pub fn components(&self, horizon: usize) -> Result<Vec<ComponentRow>> {
        let p = self.project(horizon)?;
        let scale = self.y_scale;

        Ok((0..horizon)
            .map(|k| {
                let (weekly, yearly) = match self.mode {
                    SeasonalityMode::Additive => (p.weekly[k], p.yearly[k]),
                    SeasonalityMode::Multiplicative => (p.trend[k] * p.weekly[k], p.trend[k] * p.yearly[k]),
                };
                ComponentRow {
                    date: self.date_of(p.days[k]),
                    trend: p.trend[k] * scale,
                    weekly: weekly * scale,
                    yearly: yearly * scale,
                    holidays: p.holiday[k] * scale,
                }
            })
            .collect())
    }
}

impl TrainedForecastModel for TrainedSeasonalModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let p = self.project(horizon)?;
        let seasonal = p.seasonal();

        let points: Vec<f64> = (0..horizon)
            .map(|k| self.combine(p.trend[k], seasonal[k], p.holiday[k]))
            .collect();
        let bands = if self.uncertainty_samples == 0 {
            points.iter().map(|v| (*v, *v)).collect()
        } else {
            self.simulate_bands(&p.trend, &seasonal, &p.holiday)?
        };

        let dates = p.days.iter().map(|d| self.date_of(*d)).collect();
        let values = points.iter().map(|v| v * self.y_scale).collect();
        let intervals = bands
            .iter()
            .map(|(lo, hi)| (lo * self.y_scale, hi * self.y_scale))
            .collect();

        ForecastResult::new(dates, values, intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
