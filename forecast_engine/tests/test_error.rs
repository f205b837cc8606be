use chrono::NaiveDate;
use forecast_engine::error::{ForecastError, RequestContext};
use forecast_engine::Stage;
use forecast_math::MathError;
use std::error::Error;
use std::io;

fn context(stage: Stage) -> RequestContext {
    RequestContext {
        symbol: "HDFCBANK.NS".to_string(),
        start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        stage,
    }
}

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let math_error = MathError::InvalidInput("negative period".to_string());
    assert!(matches!(ForecastError::from(math_error), ForecastError::MathError(_)));

    let toml_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
    assert!(matches!(ForecastError::from(toml_error), ForecastError::Configuration(_)));
}

#[test]
fn test_request_context_in_message() {
    let error = ForecastError::SelectionFailure {
        stage: Stage::Tuning,
        reason: "no finite score".to_string(),
    }
    .in_request(context(Stage::Tuning));

    let message = error.to_string();
    assert!(message.contains("HDFCBANK.NS"));
    assert!(message.contains("2022-01-01 .. 2023-01-01"));
    assert!(message.contains("TUNING"));
    assert!(message.contains("no finite score"));
    assert!(error.source().is_some());
}

#[test]
fn test_context_is_attached_once() {
    let error = ForecastError::Model("singular design".to_string())
        .in_request(context(Stage::Searching))
        .in_request(context(Stage::Forecasting));

    assert_eq!(error.context().unwrap().stage, Stage::Searching);
    assert!(matches!(error.root(), ForecastError::Model(_)));
}
