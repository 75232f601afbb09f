#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use tradebot::adapters::sqlite_store::SqliteStore;
use tradebot::domain::bar::{Bar, Interval, Period};
use tradebot::domain::error::BotError;
use tradebot::ports::market_data_port::MarketDataPort;

/// In-memory market-data port with per-symbol fixtures, error injection and
/// a fetch counter for cache assertions.
pub struct MockMarketData {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        _period: Period,
    ) -> Result<Vec<Bar>, BotError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, timestamp: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars starting 2024-06-01, one per day.
pub fn daily_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, ts(1, 0) + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn fresh_store() -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().unwrap();
    store.initialize_schema().unwrap();
    Arc::new(store)
}
