use chrono::NaiveDate;
use forecast_engine::source::{CacheStats, CachedSource, CsvSource, PriceSource};
use forecast_engine::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Trading days only: weekends are missing and one close is blank
fn create_sample_data() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    writeln!(file, "Date,Open,High,Low,Close,Adj Close,Volume").unwrap();
    writeln!(file, "2024-01-04,10,11,9,10.5,10.4,100").unwrap();
    writeln!(file, "2024-01-05,10,11,9,10.7,10.6,100").unwrap();
    writeln!(file, "2024-01-08,10,11,9,10.9,,100").unwrap();
    writeln!(file, "2024-01-09,10,11,9,11.1,11.0,100").unwrap();
    writeln!(file, "2024-01-10,10,11,9,11.3,11.2,100").unwrap();

    file
}

#[test]
fn test_csv_weekends_are_forward_filled() {
    let file = create_sample_data();
    let source = CsvSource::new(file.path());

    let series = source.fetch("BEL.NS", date(2024, 1, 1), date(2024, 2, 1)).unwrap();

    assert_eq!(series.symbol(), "BEL.NS");
    assert_eq!(series.start(), date(2024, 1, 4));
    assert_eq!(series.end(), date(2024, 1, 10));
    assert_eq!(series.values(), &[10.4, 10.6, 10.6, 10.6, 10.6, 11.0, 11.2]);
}

#[test]
fn test_csv_end_is_exclusive() {
    let file = create_sample_data();
    let series = CsvSource::new(file.path())
        .fetch("BEL.NS", date(2024, 1, 1), date(2024, 1, 10))
        .unwrap();
    assert_eq!(series.end(), date(2024, 1, 9));
}

#[test]
fn test_missing_file_is_an_error() {
    let source = CsvSource::new("/definitely/not/here.csv");
    let err = source.fetch("X", date(2024, 1, 1), date(2024, 2, 1)).unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));
}

#[test]
fn test_reversed_range_is_a_configuration_error() {
    let file = create_sample_data();
    let err = CsvSource::new(file.path())
        .fetch("X", date(2024, 2, 1), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(err, ForecastError::Configuration(_)));
}

#[test]
fn test_cache_over_csv() {
    let file = create_sample_data();
    let cache = CachedSource::new(CsvSource::new(file.path()));

    let first = cache.fetch("BEL.NS", date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    let again = cache.fetch("BEL.NS", date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    assert_eq!(first, again);
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

    cache.fetch("BEL.NS", date(2024, 1, 5), date(2024, 2, 1)).unwrap();
    cache.fetch("BEL.NS", date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 3 });

    cache.invalidate();
    cache.fetch("BEL.NS", date(2024, 1, 1), date(2024, 2, 1)).unwrap();
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 4 });
    assert_eq!(cache.name(), "csv");
}
