//! Built-in public holiday calendars keyed by country code

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, PartialEq)]
enum HolidayRule {
    Fixed { month: u32, day: u32 },
    NthWeekday { month: u32, weekday: Weekday, n: u8 },
    LastWeekday { month: u32, weekday: Weekday },
}

impl HolidayRule {
    fn date_in(&self, year: i32) -> Option<NaiveDate> {
        match *self {
            HolidayRule::Fixed { month, day } => NaiveDate::from_ymd_opt(year, month, day),
            HolidayRule::NthWeekday { month, weekday, n } => {
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
            }
            HolidayRule::LastWeekday { month, weekday } => {
                let next_month = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }?;
                let mut day = next_month - Duration::days(1);
                while day.weekday() != weekday {
                    day = day - Duration::days(1);
                }
                Some(day)
            }
        }
    }
}

/// A dated occurrence of a named holiday
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

/// Fixed-date and weekday-rule holidays for one country.
///
/// Lunar-calendar festivals are not modelled.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayCalendar {
    country: &'static str,
    rules: Vec<(&'static str, HolidayRule)>,
}

impl HolidayCalendar {
    /// Look up a calendar by ISO code (`IND`/`IN`, `US`/`USA`, `GB`/`UK`)
    pub fn for_country(code: &str) -> Result<Self> {
        use HolidayRule::*;

        let calendar = match code.trim().to_ascii_uppercase().as_str() {
            "IND" | "IN" => Self {
                country: "IND",
                rules: vec![
                    ("Republic Day", Fixed { month: 1, day: 26 }),
                    ("Ambedkar Jayanti", Fixed { month: 4, day: 14 }),
                    ("Maharashtra Day", Fixed { month: 5, day: 1 }),
                    ("Independence Day", Fixed { month: 8, day: 15 }),
                    ("Gandhi Jayanti", Fixed { month: 10, day: 2 }),
                    ("Christmas", Fixed { month: 12, day: 25 }),
                ],
            },
            "US" | "USA" => Self {
                country: "US",
                rules: vec![
                    ("New Year's Day", Fixed { month: 1, day: 1 }),
                    ("Martin Luther King Jr. Day", NthWeekday { month: 1, weekday: Weekday::Mon, n: 3 }),
                    ("Washington's Birthday", NthWeekday { month: 2, weekday: Weekday::Mon, n: 3 }),
                    ("Memorial Day", LastWeekday { month: 5, weekday: Weekday::Mon }),
                    ("Juneteenth", Fixed { month: 6, day: 19 }),
                    ("Independence Day", Fixed { month: 7, day: 4 }),
                    ("Labor Day", NthWeekday { month: 9, weekday: Weekday::Mon, n: 1 }),
                    ("Columbus Day", NthWeekday { month: 10, weekday: Weekday::Mon, n: 2 }),
                    ("Veterans Day", Fixed { month: 11, day: 11 }),
                    ("Thanksgiving", NthWeekday { month: 11, weekday: Weekday::Thu, n: 4 }),
                    ("Christmas Day", Fixed { month: 12, day: 25 }),
                ],
            },
            "GB" | "UK" => Self {
                country: "GB",
                rules: vec![
                    ("New Year's Day", Fixed { month: 1, day: 1 }),
                    ("Early May Bank Holiday", NthWeekday { month: 5, weekday: Weekday::Mon, n: 1 }),
                    ("Spring Bank Holiday", LastWeekday { month: 5, weekday: Weekday::Mon }),
                    ("Summer Bank Holiday", LastWeekday { month: 8, weekday: Weekday::Mon }),
                    ("Christmas Day", Fixed { month: 12, day: 25 }),
                    ("Boxing Day", Fixed { month: 12, day: 26 }),
                ],
            },
            other => {
                return Err(ForecastError::Configuration(format!(
                    "No holiday calendar for country code '{}'",
                    other
                )))
            }
        };

        Ok(calendar)
    }

    pub fn country(&self) -> &str {
        self.country
    }

    /// Name of the holiday falling on `date`, if any
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|(_, rule)| rule.date_in(date.year()) == Some(date))
            .map(|(name, _)| *name)
    }

    /// All holidays in `[start, end]`, ordered by date
    pub fn holidays_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Holiday> {
        let mut found = Vec::new();
        for year in start.year()..=end.year() {
            for (name, rule) in &self.rules {
                if let Some(date) = rule.date_in(year) {
                    if date >= start && date <= end {
                        found.push(Holiday { date, name: *name });
                    }
                }
            }
        }
        found.sort_by_key(|h| h.date);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("IND", date(2024, 1, 26), Some("Republic Day"))]
    #[case("in", date(2023, 8, 15), Some("Independence Day"))]
    #[case("US", date(2024, 11, 28), Some("Thanksgiving"))]
    #[case("US", date(2024, 5, 27), Some("Memorial Day"))]
    #[case("GB", date(2024, 8, 26), Some("Summer Bank Holiday"))]
    #[case("GB", date(2024, 8, 27), None)]
    fn test_holiday_on(#[case] code: &str, #[case] day: NaiveDate, #[case] expected: Option<&str>) {
        let calendar = HolidayCalendar::for_country(code).unwrap();
        assert_eq!(calendar.holiday_on(day), expected);
    }

    #[test]
    fn test_unknown_country_is_configuration_error() {
        assert!(matches!(
            HolidayCalendar::for_country("ATLANTIS"),
            Err(ForecastError::Configuration(_))
        ));
    }

    #[test]
    fn test_holidays_between_spans_years() {
        let calendar = HolidayCalendar::for_country("IND").unwrap();
        let holidays = calendar.holidays_between(date(2023, 10, 1), date(2024, 2, 1));

        let names: Vec<_> = holidays.iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["Gandhi Jayanti", "Christmas", "Republic Day"]);
        assert!(holidays.windows(2).all(|w| w[0].date <= w[1].date));
    }
}
