//! Writing reports to disk

use crate::error::Result;
use forecast_engine::data::forecast_frame;
use forecast_engine::{ForecastRow, PipelineReport};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// `date,forecast,lower,upper` with a header row
pub fn write_forecast_csv<P: AsRef<Path>>(rows: &[ForecastRow], path: P) -> Result<()> {
    let mut df = forecast_frame(rows)?;
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;

    info!(path = %path.as_ref().display(), rows = rows.len(), "forecast written");
    Ok(())
}

/// The whole report as pretty-printed JSON
pub fn write_report_json<P: AsRef<Path>>(report: &PipelineReport, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, report)?;

    info!(path = %path.as_ref().display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_forecast_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        let rows = vec![
            ForecastRow {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                forecast: 10.5,
                lower: 9.5,
                upper: 11.5,
            },
            ForecastRow {
                date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                forecast: 10.75,
                lower: 9.25,
                upper: 12.25,
            },
        ];

        write_forecast_csv(&rows, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();

        assert_eq!(lines[0], "date,forecast,lower,upper");
        assert_eq!(lines[1], "2024-05-01,10.5,9.5,11.5");
        assert_eq!(lines.len(), 3);
    }
}
