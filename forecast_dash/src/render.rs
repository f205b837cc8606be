//! Plain-text tables for the terminal

use forecast_engine::automl::{AutoMlReport, CandidateScore, TunedCandidate};
use forecast_engine::cv::CvReport;
use forecast_engine::metrics::ForecastMetrics;
use forecast_engine::pipeline::SeasonalReport;
use forecast_engine::search::SearchOutcome;
use forecast_engine::{ComponentRow, ForecastRow, PipelineReport, StrategyReport};
use std::fmt::Write;

/// Rows shown in the model comparison table
pub const COMPARISON_ROWS: usize = 3;

fn pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn rule(out: &mut String, width: usize) {
    let _ = writeln!(out, "{:-<width$}", "", width = width);
}

pub fn forecast_table(rows: &[ForecastRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>12} {:>12} {:>12}", "Date", "Forecast", "Lower", "Upper");
    rule(&mut out, 51);
    for row in rows {
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            row.date.to_string(),
            row.forecast,
            row.lower,
            row.upper
        );
    }
    out
}

/// Trend and seasonal parts of each forecast day; the columns add up to
/// the forecast
pub fn components_table(rows: &[ComponentRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>12} {:>10} {:>10} {:>10}",
        "Date", "Trend", "Weekly", "Yearly", "Holidays"
    );
    rule(&mut out, 58);
    for row in rows {
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>10.2} {:>10.2} {:>10.2}",
            row.date.to_string(),
            row.trend,
            row.weekly,
            row.yearly,
            row.holidays
        );
    }
    out
}

/// Sampled combinations best first; failed trials at the bottom
pub fn trials_table(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>4}  {:<10} {}", "Rank", "MAPE", "Parameters");
    rule(&mut out, 80);
    for (rank, trial) in outcome.ranked().into_iter().enumerate() {
        let score = match &trial.error {
            Some(_) => "failed".to_string(),
            None => pct(trial.score),
        };
        let _ = writeln!(out, "{:>4}  {:<10} {}", rank + 1, score, trial.params);
    }
    out
}

pub fn cv_table(report: &CvReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<12} {:>10} {:>10} {:>10} {:>10}",
        "Fold", "Cutoff", "MAPE", "MAE", "RMSE", "SMAPE"
    );
    rule(&mut out, 62);
    for fold in &report.folds {
        let m = &fold.metrics;
        let _ = writeln!(
            out,
            "{:>4}  {:<12} {:>10} {:>10.3} {:>10.3} {:>10}",
            fold.fold + 1,
            fold.cutoff.to_string(),
            pct(m.mape),
            m.mae,
            m.rmse,
            pct(m.smape)
        );
    }
    out
}

fn metrics_row(out: &mut String, label: &str, m: &ForecastMetrics) {
    let _ = writeln!(
        out,
        "{:<40} {:>10} {:>10.3} {:>10.3} {:>10}",
        label,
        pct(m.mape),
        m.mae,
        m.rmse,
        pct(m.smape)
    );
}

pub fn comparison_table(scores: &[CandidateScore], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:>10} {:>10} {:>10} {:>10}",
        "Model", "MAPE", "MAE", "RMSE", "SMAPE"
    );
    rule(&mut out, 84);
    for score in scores.iter().take(limit) {
        metrics_row(&mut out, &score.model, &score.metrics);
    }
    out
}

pub fn tuned_table(tuned: &[TunedCandidate]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>10} {:>10}  {}",
        "Family", "Default", "Tuned", "Parameters"
    );
    rule(&mut out, 80);
    for t in tuned {
        let _ = writeln!(
            out,
            "{:<24} {:>10} {:>10}  {}",
            t.family.label(),
            pct(t.baseline_score),
            pct(t.tuned_score),
            t.params
        );
    }
    out
}

fn seasonal_section(out: &mut String, report: &SeasonalReport) {
    let _ = writeln!(out, "\nHyperparameter search\n");
    out.push_str(&trials_table(&report.search));
    let _ = writeln!(out, "\nFinal model: {}", report.model);
    let _ = writeln!(out, "Mean percentage error: {}", report.mape);
    let _ = writeln!(out, "\nCross-validation\n");
    out.push_str(&cv_table(&report.cv));
    let _ = writeln!(out, "\nForecast components\n");
    out.push_str(&components_table(&report.components));
}

fn automl_section(out: &mut String, report: &AutoMlReport) {
    let _ = writeln!(out, "\nModel comparison\n");
    out.push_str(&comparison_table(&report.comparison, COMPARISON_ROWS));
    let _ = writeln!(out, "\nTuned models\n");
    out.push_str(&tuned_table(&report.tuned));
    let _ = writeln!(out, "\nBlend: {}", report.ensemble);
    let _ = writeln!(out, "Holdout: {}", report.holdout);
}

/// Everything a request produced, ending with the forecast table
pub fn report(report: &PipelineReport, company: Option<&str>) -> String {
    let mut out = String::new();
    let title = match company {
        Some(name) => format!("{} ({})", name, report.symbol),
        None => report.symbol.clone(),
    };
    let _ = writeln!(out, "{}  {} .. {}", title, report.start, report.end);

    match &report.outcome {
        StrategyReport::SeasonalSearch(r) => seasonal_section(&mut out, r),
        StrategyReport::AutomlEnsemble(r) => automl_section(&mut out, r),
    }

    let _ = writeln!(out, "\nForecast\n");
    out.push_str(&forecast_table(report.forecast()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forecast_table_layout() {
        let rows = vec![ForecastRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            forecast: 101.234,
            lower: 99.0,
            upper: 103.5,
        }];
        let table = forecast_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date"));
        assert_eq!(
            lines[2],
            "2024-05-01         101.23        99.00       103.50"
        );
    }

    #[test]
    fn test_components_table_layout() {
        let rows = vec![ComponentRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            trend: 100.5,
            weekly: -1.25,
            yearly: 0.0,
            holidays: 0.75,
        }];
        let table = components_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date"));
        assert!(lines[0].ends_with("Holidays"));
        assert_eq!(
            lines[2],
            "2024-05-01         100.50      -1.25       0.00       0.75"
        );
    }

    #[test]
    fn test_pct() {
        assert_eq!(pct(0.01234), "1.23%");
        assert_eq!(pct(f64::NAN), "n/a");
    }
}
