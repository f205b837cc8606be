//! Offline price history from CSV files

use super::{check_range, unavailable, PriceSource};
use crate::data::{RawObservation, TimeSeries};
use crate::error::Result;
use crate::preprocess::SeriesPreprocessor;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Price columns in order of preference, matched case-insensitively
const PRICE_COLUMNS: [&str; 5] = ["adj close", "adj_close", "adjclose", "close", "price"];

/// Reads `date,<price>` rows from one CSV file.
///
/// When the file has a `symbol` column only matching rows are used;
/// otherwise every row is taken to belong to the requested symbol.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    preprocessor: SeriesPreprocessor,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            preprocessor: SeriesPreprocessor::new(),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: SeriesPreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawObservation>> {
        let file = File::open(&self.path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let find = |wanted: &str| names.iter().find(|n| n.trim().eq_ignore_ascii_case(wanted)).cloned();

        let date_col = names
            .iter()
            .find(|n| n.to_lowercase().contains("date"))
            .cloned()
            .ok_or_else(|| unavailable(symbol, start, end, "CSV has no date column"))?;
        let price_col = PRICE_COLUMNS
            .iter()
            .find_map(|c| find(*c))
            .ok_or_else(|| unavailable(symbol, start, end, "CSV has no close or price column"))?;

        let dates = df.column(&date_col)?.cast(&DataType::Utf8)?;
        let prices = df.column(&price_col)?.cast(&DataType::Float64)?;
        let symbols = match find("symbol") {
            Some(col) => Some(df.column(&col)?.cast(&DataType::Utf8)?),
            None => None,
        };
        let symbols = match &symbols {
            Some(s) => Some(s.utf8()?),
            None => None,
        };

        let mut rows = Vec::new();
        for (i, (date, price)) in dates.utf8()?.into_iter().zip(prices.f64()?).enumerate() {
            if let Some(symbols) = symbols {
                if symbols.get(i).map_or(true, |s| !s.eq_ignore_ascii_case(symbol)) {
                    continue;
                }
            }
            let Some(raw_date) = date else { continue };
            let date = parse_date(raw_date).ok_or_else(|| {
                unavailable(symbol, start, end, format!("unparseable date '{}' on row {}", raw_date, i + 1))
            })?;
            if date >= start && date < end {
                rows.push(RawObservation::new(date, price));
            }
        }

        if rows.is_empty() {
            return Err(unavailable(
                symbol,
                start,
                end,
                format!("{} has no rows inside the requested range", self.path.display()),
            ));
        }
        Ok(rows)
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl PriceSource for CsvSource {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        check_range(symbol, start, end)?;
        let raw = self.read_rows(symbol, start, end)?;
        let series = self.preprocessor.process(symbol, &raw)?;
        info!(symbol, path = %self.path.display(), days = series.len(), "loaded prices");
        Ok(series)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
