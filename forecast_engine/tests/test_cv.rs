use chrono::NaiveDate;
use forecast_engine::cv::{CrossValidator, CvConfig, ExecutionMode, MetricAggregation};
use forecast_engine::models::{DriftModel, HoltLinear, NaiveModel};
use forecast_engine::{ForecastError, Stage, TimeSeries};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::Duration;

fn series(len: usize) -> TimeSeries {
    let values = (0..len)
        .map(|i| 80.0 + 0.25 * i as f64 + ((i * 7) % 11) as f64)
        .collect();
    TimeSeries::new("CV.NS", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values).unwrap()
}

#[rstest]
#[case(60, 30, 10, 7, 3)]
#[case(37, 30, 10, 7, 1)]
#[case(36, 30, 10, 7, 0)]
#[case(300, 200, 10, 7, 10)]
#[case(100, 14, 1, 1, 86)]
fn test_fold_count_formula(
    #[case] len: usize,
    #[case] initial: usize,
    #[case] period: usize,
    #[case] horizon: usize,
    #[case] expected: usize,
) {
    let config = CvConfig::new(initial, period, horizon).unwrap();
    assert_eq!(config.fold_count(len), expected);

    let validator = CrossValidator::new(config);
    match validator.folds(&series(len)) {
        Ok(folds) => assert_eq!(folds.len(), expected),
        Err(ForecastError::InsufficientHistory { required, .. }) => {
            assert_eq!(expected, 0);
            assert_eq!(required, initial + horizon);
        }
        Err(e) => panic!("unexpected error {e}"),
    }
}

#[test]
fn test_sixty_day_layout() {
    let validator = CrossValidator::new(CvConfig::new(30, 10, 7).unwrap());
    let folds = validator.folds(&series(60)).unwrap();

    let windows: Vec<(usize, usize)> = folds.iter().map(|f| (f.test_start, f.test_end)).collect();
    assert_eq!(windows, vec![(30, 37), (40, 47), (50, 57)]);
    assert!(folds.iter().all(|f| f.train_end == f.test_start));
}

#[test]
fn test_short_series_reports_stage() {
    let validator = CrossValidator::new(CvConfig::new(30, 10, 7).unwrap()).with_stage(Stage::Tuning);
    let err = validator.evaluate(&NaiveModel::new(), &series(20)).unwrap_err();

    assert!(matches!(
        err,
        ForecastError::InsufficientHistory {
            stage: Stage::Tuning,
            required: 37,
            actual: 20
        }
    ));
}

#[test]
fn test_latest_fold_versus_mean() {
    let config = CvConfig::new(30, 10, 7).unwrap();
    let data = series(60);

    let latest = CrossValidator::new(config).evaluate(&DriftModel::new(), &data).unwrap();
    let mean = CrossValidator::new(config)
        .with_aggregation(MetricAggregation::MeanAcrossFolds)
        .evaluate(&DriftModel::new(), &data)
        .unwrap();

    assert_eq!(latest.folds, mean.folds);
    assert_eq!(latest.metrics, latest.folds[2].metrics);
    let expected = latest.folds.iter().map(|f| f.metrics.mape).sum::<f64>() / 3.0;
    assert!((mean.score() - expected).abs() < 1e-12);
    assert_eq!(latest.predictions.len(), 21);
}

#[test]
fn test_parallel_matches_sequential() {
    let config = CvConfig::new(40, 5, 5).unwrap();
    let data = series(120);
    let model = HoltLinear::new(0.4, 0.1).unwrap();

    let sequential = CrossValidator::new(config)
        .with_aggregation(MetricAggregation::MeanAcrossFolds)
        .evaluate(&model, &data)
        .unwrap();
    let parallel = CrossValidator::new(config)
        .with_aggregation(MetricAggregation::MeanAcrossFolds)
        .with_execution(ExecutionMode::Parallel {
            workers: 4,
            fold_timeout: Duration::from_secs(30),
        })
        .evaluate(&model, &data)
        .unwrap();

    assert_eq!(sequential, parallel);
}
