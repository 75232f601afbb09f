//! CSV file market-data adapter.
//!
//! Serves bars from `<base_path>/<symbol>.csv` files with the columns
//! `timestamp,open,high,low,close,volume`, for offline runs and test
//! fixtures. Timestamps are RFC 3339, or plain dates taken as midnight UTC.
//! The interval is whatever granularity the file was exported at; only the
//! period filter is applied.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::path::PathBuf;

use crate::domain::bar::{Bar, Interval, Period};
use crate::domain::error::BotError;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvMarketData {
    base_path: PathBuf,
    now: Option<DateTime<Utc>>,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            now: None,
        }
    }

    /// Pin the clock the period filter resolves against.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| Utc.from_local_datetime(&d.and_hms_opt(0, 0, 0)?).single())
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str, symbol: &str) -> Result<f64, BotError> {
    record
        .get(index)
        .ok_or_else(|| BotError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("missing {name} column"),
        })?
        .trim()
        .parse()
        .map_err(|e| BotError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("invalid {name} value: {e}"),
        })
}

impl MarketDataPort for CsvMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, BotError> {
        let path = self.csv_path(symbol);
        let content = std::fs::read_to_string(&path).map_err(|e| BotError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let since = period.start_from(self.now.unwrap_or_else(Utc::now));

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {e}"),
            })?;

            let ts_str = record.get(0).ok_or_else(|| BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "missing timestamp column".into(),
            })?;
            let timestamp =
                parse_timestamp(ts_str.trim()).ok_or_else(|| BotError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("invalid timestamp: {ts_str}"),
                })?;

            if timestamp < since {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open", symbol)?,
                high: parse_field(&record, 2, "high", symbol)?,
                low: parse_field(&record, 3, "low", symbol)?,
                close: parse_field(&record, 4, "close", symbol)?,
                volume: parse_field(&record, 5, "volume", symbol)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
