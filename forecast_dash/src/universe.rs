//! Index constituent list
//!
//! Symbols in the published list carry no exchange suffix; the loader adds
//! `.NS` so they can be passed straight to the price source.

use crate::error::{DashError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const EXCHANGE_SUFFIX: &str = ".NS";

#[derive(Debug, Deserialize)]
struct ConstituentRecord {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Company Name")]
    company: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    pub symbol: String,
    pub company: String,
}

/// Symbol to company name lookup, in list order
#[derive(Debug, Clone, Default)]
pub struct Universe {
    constituents: Vec<Constituent>,
    by_symbol: BTreeMap<String, usize>,
}

pub fn with_suffix(symbol: &str) -> String {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.ends_with(EXCHANGE_SUFFIX) {
        symbol
    } else {
        format!("{}{}", symbol, EXCHANGE_SUFFIX)
    }
}

impl Universe {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a CSV with `Symbol` and `Company Name` columns; other columns
    /// are ignored and repeated symbols keep their first entry
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut universe = Universe::default();

        for record in csv_reader.deserialize() {
            let record: ConstituentRecord = record?;
            if record.symbol.is_empty() {
                continue;
            }
            let symbol = with_suffix(&record.symbol);
            if universe.by_symbol.contains_key(&symbol) {
                continue;
            }
            universe
                .by_symbol
                .insert(symbol.clone(), universe.constituents.len());
            universe.constituents.push(Constituent {
                symbol,
                company: record.company,
            });
        }

        if universe.constituents.is_empty() {
            return Err(DashError::Universe("no constituents found".to_string()));
        }
        debug!(count = universe.len(), "loaded constituents");
        Ok(universe)
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// Company name for a symbol given with or without the suffix
    pub fn company(&self, symbol: &str) -> Option<&str> {
        self.by_symbol
            .get(&with_suffix(symbol))
            .map(|&i| self.constituents[i].company.as_str())
    }

    /// Constituents whose symbol or company name contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&Constituent> {
        let query = query.trim().to_lowercase();
        self.constituents
            .iter()
            .filter(|c| {
                c.symbol.to_lowercase().contains(&query) || c.company.to_lowercase().contains(&query)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const LIST: &str = "Company Name,Industry,Symbol,Series\n\
                        Infosys Ltd.,IT,INFY,EQ\n\
                        Wipro Ltd.,IT, WIPRO ,EQ\n\
                        Infosys Duplicate,IT,INFY,EQ\n\
                        Reliance Industries Ltd.,Energy,RELIANCE.NS,EQ\n";

    #[test]
    fn test_suffix_and_lookup() {
        let universe = Universe::from_reader(LIST.as_bytes()).unwrap();

        assert_eq!(universe.len(), 3);
        assert_eq!(universe.constituents()[0].symbol, "INFY.NS");
        assert_eq!(universe.company("wipro"), Some("Wipro Ltd."));
        assert_eq!(universe.company("INFY.NS"), Some("Infosys Ltd."));
        assert_eq!(universe.company("RELIANCE"), Some("Reliance Industries Ltd."));
        assert_eq!(universe.company("TCS"), None);
    }

    #[rstest]
    #[case("INFY", "INFY.NS")]
    #[case(" infy ", "INFY.NS")]
    #[case("INFY.NS", "INFY.NS")]
    #[case("m&m", "M&M.NS")]
    fn test_with_suffix(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(with_suffix(raw), expected);
    }

    #[test]
    fn test_search() {
        let universe = Universe::from_reader(LIST.as_bytes()).unwrap();
        let hits: Vec<&str> = universe.search("ltd").iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(hits, vec!["INFY.NS", "WIPRO.NS", "RELIANCE.NS"]);
        assert!(universe.search("bank").is_empty());
    }

    #[test]
    fn test_header_only_is_an_error() {
        let err = Universe::from_reader("Company Name,Symbol\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::Universe(_)));
    }

    #[test]
    fn test_missing_columns() {
        let err = Universe::from_reader("Name,Ticker\nA,B\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::Csv(_)));
    }
}
