//! Yahoo Finance chart API

use super::{check_range, unavailable, PriceSource};
use crate::data::{RawObservation, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::preprocess::SeriesPreprocessor;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) forecast_engine/0.1";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Decode a chart API body into raw daily observations inside `[start, end)`.
///
/// Adjusted close is used when present, otherwise close. Dates are taken in
/// the exchange's local time.
pub fn parse_chart(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    body: &str,
) -> Result<Vec<RawObservation>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| unavailable(symbol, start, end, format!("unreadable response: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(unavailable(
            symbol,
            start,
            end,
            format!("provider error [{}]: {}", err.code, err.description),
        ));
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| unavailable(symbol, start, end, "provider returned no result"))?;

    if data.timestamp.is_empty() {
        return Err(unavailable(symbol, start, end, "provider returned no rows"));
    }

    let prices: Vec<Option<f64>> = match data.indicators.adjclose {
        Some(adj) if adj.first().map_or(false, |a| !a.adjclose.is_empty()) => {
            adj.into_iter().next().map(|a| a.adjclose).unwrap_or_default()
        }
        _ => data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };
    if prices.len() != data.timestamp.len() {
        return Err(unavailable(
            symbol,
            start,
            end,
            format!(
                "{} timestamps but {} prices",
                data.timestamp.len(),
                prices.len()
            ),
        ));
    }

    let offset = data.meta.map_or(0, |m| m.gmtoffset);
    let mut rows = Vec::with_capacity(prices.len());
    for (ts, value) in data.timestamp.iter().zip(prices) {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| unavailable(symbol, start, end, format!("bad timestamp {}", ts)))?
            .date_naive();
        if date >= start && date < end {
            rows.push(RawObservation::new(date, value));
        }
    }

    if rows.is_empty() {
        return Err(unavailable(symbol, start, end, "no rows inside the requested range"));
    }
    Ok(rows)
}

/// Daily adjusted closes from Yahoo Finance over blocking HTTP
#[derive(Debug, Clone)]
pub struct YahooSource {
    client: reqwest::blocking::Client,
    base_url: String,
    preprocessor: SeriesPreprocessor,
}

impl YahooSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            preprocessor: SeriesPreprocessor::new(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: SeriesPreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    fn url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let epoch = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp());
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url.trim_end_matches('/'),
            symbol,
            epoch(start),
            epoch(end)
        )
    }
}

impl PriceSource for YahooSource {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        check_range(symbol, start, end)?;
        let url = self.url(symbol, start, end);
        debug!(%url, "requesting chart");

        let transport = |e: reqwest::Error| unavailable(symbol, start, end, e.to_string());
        let response = self.client.get(&url).send().map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;

        // the API reports unknown symbols as 404 with an error object
        let raw = match parse_chart(symbol, start, end, &body) {
            Ok(raw) => raw,
            Err(e) if status.is_success() => return Err(e),
            Err(ForecastError::DataUnavailable { reason, .. }) => {
                return Err(unavailable(
                    symbol,
                    start,
                    end,
                    format!("HTTP {}: {}", status, reason),
                ))
            }
            Err(e) => return Err(e),
        };

        let series = self.preprocessor.process(symbol, &raw)?;
        info!(symbol, rows = raw.len(), days = series.len(), "fetched prices");
        Ok(series)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // three sessions at 09:15 IST, the middle close missing
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "INFY.NS", "gmtoffset": 19800},
                "timestamp": [1704167100, 1704253500, 1704339900],
                "indicators": {
                    "quote": [{"close": [1500.0, null, 1520.0]}],
                    "adjclose": [{"adjclose": [1490.0, null, 1510.0]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_prefers_adjusted_close() {
        let rows = parse_chart("INFY.NS", date(2024, 1, 1), date(2024, 2, 1), BODY).unwrap();

        assert_eq!(
            rows,
            vec![
                RawObservation::new(date(2024, 1, 2), Some(1490.0)),
                RawObservation::new(date(2024, 1, 3), None),
                RawObservation::new(date(2024, 1, 4), Some(1510.0)),
            ]
        );
    }

    #[test]
    fn test_end_date_is_exclusive() {
        let rows = parse_chart("INFY.NS", date(2024, 1, 1), date(2024, 1, 4), BODY).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_provider_error_is_unavailable() {
        let body = r#"{"chart": {"result": null,
            "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("NOPE.NS", date(2024, 1, 1), date(2024, 2, 1), body).unwrap_err();

        match err {
            ForecastError::DataUnavailable { symbol, reason, .. } => {
                assert_eq!(symbol, "NOPE.NS");
                assert!(reason.contains("delisted"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_garbage_and_empty_bodies() {
        let start = date(2024, 1, 1);
        let end = date(2024, 2, 1);
        assert!(parse_chart("X", start, end, "<html>").is_err());

        let empty = r#"{"chart": {"result": [{"timestamp": [], "indicators": {"quote": []}}], "error": null}}"#;
        assert!(matches!(
            parse_chart("X", start, end, empty),
            Err(ForecastError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_url_layout() {
        let source = YahooSource::new().unwrap().with_base_url("http://localhost/chart/");
        let url = source.url("TCS.NS", date(2024, 1, 1), date(2024, 1, 2));
        assert_eq!(
            url,
            "http://localhost/chart/TCS.NS?period1=1704067200&period2=1704153600&interval=1d&events=history&includeAdjustedClose=true"
        );
    }

    #[test]
    #[ignore = "requires network access"]
    fn test_live_fetch() {
        let source = YahooSource::new().unwrap();
        let series = source
            .fetch("RELIANCE.NS", date(2023, 1, 1), date(2023, 3, 1))
            .unwrap();
        assert!(series.len() > 40);
    }
}
