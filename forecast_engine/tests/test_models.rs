use chrono::{Duration, NaiveDate};
use forecast_engine::models::seasonal::{SeasonalConfig, SeasonalModel, SeasonalityMode};
use forecast_engine::models::TrainedForecastModel;
use forecast_engine::{ForecastModel, ModelFamily, TimeSeries};
use rstest::rstest;

fn series(len: usize) -> TimeSeries {
    let values = (0..len)
        .map(|i| 500.0 + 1.2 * i as f64 + 6.0 * ((i % 7) as f64 - 3.0).abs())
        .collect();
    TimeSeries::new("MDL.NS", NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), values).unwrap()
}

#[rstest]
fn test_panel_forecasts_follow_series(
    #[values(
        ModelFamily::Naive,
        ModelFamily::SeasonalNaive,
        ModelFamily::Drift,
        ModelFamily::MovingAverage,
        ModelFamily::SimpleExponentialSmoothing,
        ModelFamily::Holt,
        ModelFamily::HoltWinters,
        ModelFamily::Theta,
        ModelFamily::AutoRegressive
    )]
    family: ModelFamily,
    #[values(1, 5, 30)] horizon: usize,
) {
    let data = series(90);
    let model = family.default_model().unwrap();
    let forecast = model.train(&data).unwrap().forecast(horizon).unwrap();

    assert_eq!(forecast.horizons(), horizon);
    assert_eq!(forecast.dates()[0], data.end() + Duration::days(1));
    assert!(forecast.dates().windows(2).all(|w| w[1] == w[0] + Duration::days(1)));
    assert!(forecast.values().iter().all(|v| v.is_finite()));
    assert!(forecast.intervals().iter().all(|(lo, hi)| lo <= hi));
}

#[rstest]
#[case(SeasonalityMode::Additive)]
#[case(SeasonalityMode::Multiplicative)]
fn test_seasonal_model_forecast(#[case] mode: SeasonalityMode) {
    let data = series(150);
    let config = SeasonalConfig {
        seasonality_mode: mode,
        country_holidays: Some("IND".to_string()),
        ..SeasonalConfig::default()
    };
    let model = SeasonalModel::new(config).unwrap();
    let forecast = model.train(&data).unwrap().forecast(14).unwrap();

    assert_eq!(forecast.horizons(), 14);
    assert_eq!(forecast.dates()[0], data.end() + Duration::days(1));
    for (value, (lo, hi)) in forecast.values().iter().zip(forecast.intervals()) {
        assert!(lo <= hi);
        assert!(value.is_finite());
    }
    // the trend keeps rising past the last observation
    assert!(forecast.values()[13] > data.values()[0]);
}

#[test]
fn test_too_short_for_family() {
    let data = series(10);
    let model = ModelFamily::HoltWinters.default_model().unwrap();
    assert!(model.train(&data).is_err());
}
