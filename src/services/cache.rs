use crate::error::Result;
use crate::models::{DateRange, PriceSeries, TickerSymbol};
use crate::services::source::PriceSource;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Cache key: (ticker, history window)
type CacheKey = (TickerSymbol, DateRange);

#[derive(Clone, Debug)]
struct CacheEntry {
    series: PriceSeries,
    cached_at: Instant,
}

/// Cache statistics exposed on /health
#[derive(Clone, Debug, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}

/// `PriceSource` wrapper that memoizes series per (ticker, range) for a TTL.
///
/// Errors and empty series are never cached. A zero TTL turns the cache off.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

pub type SharedSource<S> = Arc<CachedSource<S>>;

impl<S: PriceSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Serve from cache when fresh, otherwise fetch and store
    pub async fn get_or_fetch(&self, ticker: &TickerSymbol, range: DateRange) -> Result<PriceSeries> {
        if !self.is_enabled() {
            return self.inner.daily_closes(ticker, range).await;
        }

        let key = (ticker.clone(), range);
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.cached_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(ticker = %ticker, "Series cache hit");
                    return Ok(entry.series.clone());
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(ticker = %ticker, "Series cache miss");

        let series = self.inner.daily_closes(ticker, range).await?;
        if !series.is_empty() {
            let ttl = self.ttl;
            let mut entries = self.entries.write().await;
            entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);
            entries.insert(
                key,
                CacheEntry {
                    series: series.clone(),
                    cached_at: Instant::now(),
                },
            );
        }

        Ok(series)
    }

    /// Drop every cached range for a ticker; returns how many entries were removed
    pub async fn invalidate(&self, ticker: &TickerSymbol) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(cached_ticker, _), _| cached_ticker != ticker);
        let removed = before - entries.len();
        info!(ticker = %ticker, removed, "Invalidated series cache");
        removed
    }

    /// Drop everything; returns how many entries were removed
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        info!(removed, "Cleared series cache");
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

impl<S: PriceSource> PriceSource for CachedSource<S> {
    async fn daily_closes(&self, ticker: &TickerSymbol, range: DateRange) -> Result<PriceSeries> {
        self.get_or_fetch(ticker, range).await
    }
}
