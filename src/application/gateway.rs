//! Market-data gateway: provider access behind two cache layers.
//!
//! Layer one is the per-instance table cache, keyed by (symbol, interval,
//! period) for the gateway's lifetime. Layer two is the durable bar cache in
//! the store, consulted when `persist` is set and refreshed only once the
//! newest cached bar is older than the freshness tolerance. Requested periods
//! are silently clamped to the provider's per-interval lookback limits.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::bar::{Bar, Interval, Period};
use crate::domain::error::BotError;
use crate::domain::indicator;
use crate::domain::table::DataTable;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::StorePort;

/// Cached bars younger than this are served without a provider call.
pub const FRESHNESS_TOLERANCE_MINUTES: i64 = 10;

/// Lifetime of a latest-price lookup in the price cache.
pub const PRICE_CACHE_TTL_SECS: i64 = 60;

pub struct MarketDataGateway {
    provider: Arc<dyn MarketDataPort>,
    store: Option<Arc<dyn StorePort>>,
    freshness: Duration,
    tables: HashMap<(String, Interval, Period), Arc<DataTable>>,
    prices: HashMap<String, (f64, DateTime<Utc>)>,
}

impl MarketDataGateway {
    pub fn new(provider: Arc<dyn MarketDataPort>, store: Option<Arc<dyn StorePort>>) -> Self {
        MarketDataGateway {
            provider,
            store,
            freshness: Duration::minutes(FRESHNESS_TOLERANCE_MINUTES),
            tables: HashMap::new(),
            prices: HashMap::new(),
        }
    }

    pub fn with_freshness_minutes(mut self, minutes: i64) -> Self {
        self.freshness = Duration::minutes(minutes);
        self
    }

    /// Fetch an annotated table for `symbol` at the current instant.
    pub fn fetch(
        &mut self,
        symbol: &str,
        interval: Interval,
        period: Period,
        with_indicators: bool,
        persist: bool,
    ) -> Result<Arc<DataTable>, BotError> {
        self.fetch_at(Utc::now(), symbol, interval, period, with_indicators, persist)
    }

    pub fn fetch_at(
        &mut self,
        now: DateTime<Utc>,
        symbol: &str,
        interval: Interval,
        period: Period,
        with_indicators: bool,
        persist: bool,
    ) -> Result<Arc<DataTable>, BotError> {
        let period = period.clamp_for(interval);
        let key = (symbol.to_string(), interval, period);
        if let Some(table) = self.tables.get(&key) {
            return Ok(Arc::clone(table));
        }

        let bars = match (&self.store, persist) {
            (Some(store), true) => {
                Self::fetch_durable(self.provider.as_ref(), store.as_ref(), self.freshness, now, symbol, interval, period)?
            }
            _ => self.provider.fetch_bars(symbol, interval, period)?,
        };

        if bars.is_empty() {
            return Err(BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "provider returned no bars".to_string(),
            });
        }

        let mut table = DataTable::new(symbol, interval, bars);
        if with_indicators {
            indicator::annotate(&mut table);
        }
        let table = Arc::new(table);

        if let Some(close) = table.last_close() {
            self.prices.insert(symbol.to_string(), (close, now));
        }
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    fn fetch_durable(
        provider: &dyn MarketDataPort,
        store: &dyn StorePort,
        freshness: Duration,
        now: DateTime<Utc>,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, BotError> {
        if let Some(latest) = store.latest_bar_time(symbol)? {
            if now - latest <= freshness {
                let cached = store.cached_bars(symbol, period.start_from(now))?;
                if !cached.is_empty() {
                    return Ok(cached);
                }
            }
        }

        let bars = provider.fetch_bars(symbol, interval, period)?;
        store.upsert_bars(&bars)?;
        Ok(bars)
    }

    /// Latest price for `symbol`, preferring the instance cache when its
    /// settings match, then the TTL price cache, then a dedicated short
    /// fetch. The short fetch spans a few days so thin sessions still
    /// produce a bar.
    pub fn latest_price(
        &mut self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<f64, BotError> {
        self.latest_price_at(Utc::now(), symbol, interval, period)
    }

    pub fn latest_price_at(
        &mut self,
        now: DateTime<Utc>,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<f64, BotError> {
        let period = period.clamp_for(interval);
        if let Some(table) = self.tables.get(&(symbol.to_string(), interval, period)) {
            if let Some(close) = table.last_close() {
                return Ok(close);
            }
        }

        if let Some((price, at)) = self.prices.get(symbol) {
            if now - *at <= Duration::seconds(PRICE_CACHE_TTL_SECS) {
                return Ok(*price);
            }
        }

        let lookback = Period::Days(5).clamp_for(interval);
        let bars = self.provider.fetch_bars(symbol, interval, lookback)?;
        let price = bars
            .last()
            .map(|b| b.close)
            .ok_or_else(|| BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no recent bar for price lookup".to_string(),
            })?;
        self.prices.insert(symbol.to_string(), (price, now));
        Ok(price)
    }

    /// Drop both cache layers held by this instance.
    pub fn clear_cache(&mut self) {
        self.tables.clear();
        self.prices.clear();
    }
}
