//! Last-query memoization in front of a price source

use super::PriceSource;
use crate::data::TimeSeries;
use crate::error::Result;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Remembers the most recent successful fetch. A request with the same
/// (symbol, start, end) is answered from memory; any other request replaces
/// the entry. Failed fetches are never stored.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    slot: Mutex<Option<(CacheKey, TimeSeries)>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S: PriceSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            slot: Mutex::new(None),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop the remembered series
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *slot = None;
    }
}

impl<S: PriceSource> PriceSource for CachedSource<S> {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            start,
            end,
        };

        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((cached_key, series)) = slot.as_ref() {
            if *cached_key == key {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "cache hit");
                return Ok(series.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(symbol, source = self.inner.name(), "cache miss");
        let series = self.inner.fetch(symbol, start, end)?;
        *slot = Some((key, series.clone()));
        Ok(series)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
