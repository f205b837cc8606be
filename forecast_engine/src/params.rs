//! Hyperparameter values, combinations and discrete grids

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// One parameter combination, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Numeric value of `name`, or `default` when absent
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| {
                ForecastError::InvalidParameter(format!("{} must be numeric, got '{}'", name, v))
            }),
        }
    }

    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_usize().ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "{} must be a non-negative integer, got '{}'",
                    name, v
                ))
            }),
        }
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_str().ok_or_else(|| {
                ForecastError::InvalidParameter(format!("{} must be text, got '{}'", name, v))
            }),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("defaults");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Ordered list of (parameter name, candidate values)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis<V: Into<ParamValue>>(mut self, name: &str, values: Vec<V>) -> Self {
        self.axes
            .push((name.to_string(), values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn axes(&self) -> &[(String, Vec<ParamValue>)] {
        &self.axes
    }

    /// Every axis must be non-empty and uniquely named
    pub fn validate(&self) -> Result<()> {
        for (i, (name, values)) in self.axes.iter().enumerate() {
            if values.is_empty() {
                return Err(ForecastError::InvalidParameter(format!(
                    "Grid axis '{}' has no candidate values",
                    name
                )));
            }
            if self.axes[..i].iter().any(|(other, _)| other == name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Grid axis '{}' is declared twice",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Number of combinations in the full product. A grid without axes has
    /// exactly one (empty) combination.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// The combination at position `index` of the product, first axis
    /// varying slowest
    pub fn combination_at(&self, index: usize) -> Option<ParamSet> {
        if index >= self.size() {
            return None;
        }

        let mut set = ParamSet::new();
        let mut remainder = index;
        for (name, values) in self.axes.iter().rev() {
            let pick = remainder % values.len();
            remainder /= values.len();
            set.insert(name.clone(), values[pick].clone());
        }
        Some(set)
    }

    /// Full Cartesian product in enumeration order
    pub fn combinations(&self) -> Vec<ParamSet> {
        (0..self.size())
            .filter_map(|i| self.combination_at(i))
            .collect()
    }
}
