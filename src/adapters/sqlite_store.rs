//! SQLite store adapter.
//!
//! Portfolios and holdings snapshots are stored as JSON documents; all other
//! fields are plain columns. Timestamps persist as RFC 3339 text. Connection
//! acquisition retries transient pool errors with exponential backoff before
//! surfacing a persistence error.

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::BTreeMap;

use crate::domain::bar::Bar;
use crate::domain::bot::{Bot, PortfolioWorth, RunLog};
use crate::domain::error::BotError;
use crate::domain::portfolio::Portfolio;
use crate::domain::trade::{Trade, TradeSide};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

const CONN_RETRY_ATTEMPTS: u32 = 3;
const CONN_RETRY_BASE_MS: u64 = 50;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BotError> {
        let db_path = config
            .get_string("sqlite", "path")
            .ok_or_else(|| BotError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| BotError::Persistence {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, BotError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| BotError::Persistence {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), BotError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bot (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                portfolio TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS trade (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bot_name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                timestamp TEXT NOT NULL,
                profit REAL
            );
            CREATE INDEX IF NOT EXISTS idx_trade_bot_symbol ON trade(bot_name, symbol);
            CREATE TABLE IF NOT EXISTS historic_bar (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (symbol, timestamp)
            );
            CREATE INDEX IF NOT EXISTS idx_historic_bar_symbol ON historic_bar(symbol);
            CREATE TABLE IF NOT EXISTS run_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bot_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                success INTEGER NOT NULL,
                result TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_run_log_bot ON run_log(bot_name);
            CREATE TABLE IF NOT EXISTS portfolio_worth (
                bot_name TEXT NOT NULL,
                date TEXT NOT NULL,
                worth REAL NOT NULL,
                holdings TEXT NOT NULL,
                PRIMARY KEY (bot_name, date)
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, BotError> {
        let mut delay = std::time::Duration::from_millis(CONN_RETRY_BASE_MS);
        let mut last_reason = String::new();
        for attempt in 0..CONN_RETRY_ATTEMPTS {
            match self.pool.get() {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    last_reason = e.to_string();
                    if attempt + 1 < CONN_RETRY_ATTEMPTS {
                        std::thread::sleep(delay);
                        delay *= 2;
                    }
                }
            }
        }
        Err(BotError::Persistence {
            reason: format!("connection failed after {CONN_RETRY_ATTEMPTS} attempts: {last_reason}"),
        })
    }
}

fn query_err(e: rusqlite::Error) -> BotError {
    BotError::Persistence {
        reason: e.to_string(),
    }
}

fn json_err(e: serde_json::Error) -> BotError {
    BotError::Persistence {
        reason: e.to_string(),
    }
}

fn encode_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn decode_time(s: &str) -> Result<DateTime<Utc>, BotError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BotError::Persistence {
            reason: format!("invalid timestamp {s}: {e}"),
        })
}

fn decode_date(s: &str) -> Result<NaiveDate, BotError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| BotError::Persistence {
        reason: format!("invalid date {s}: {e}"),
    })
}

fn row_to_bot(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

impl StorePort for SqliteStore {
    fn get_or_create_bot(&self, name: &str, now: DateTime<Utc>) -> Result<Bot, BotError> {
        let conn = self.conn()?;

        let existing = conn
            .query_row(
                "SELECT name, description, portfolio, created_at, updated_at
                 FROM bot WHERE name = ?1",
                params![name],
                row_to_bot,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(query_err(other)),
            })?;

        if let Some((name, description, portfolio_json, created_at, updated_at)) = existing {
            let portfolio: Portfolio =
                serde_json::from_str(&portfolio_json).map_err(json_err)?;
            return Ok(Bot {
                name,
                description,
                portfolio,
                created_at: decode_time(&created_at)?,
                updated_at: decode_time(&updated_at)?,
            });
        }

        let bot = Bot::new(name, now);
        let portfolio_json = serde_json::to_string(&bot.portfolio).map_err(json_err)?;
        conn.execute(
            "INSERT INTO bot (name, description, portfolio, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                bot.name,
                bot.description,
                portfolio_json,
                encode_time(bot.created_at),
                encode_time(bot.updated_at)
            ],
        )
        .map_err(query_err)?;
        Ok(bot)
    }

    fn commit_trade(&self, bot: &Bot, trade: &Trade) -> Result<(), BotError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let portfolio_json = serde_json::to_string(&bot.portfolio).map_err(json_err)?;
        tx.execute(
            "UPDATE bot SET portfolio = ?1, updated_at = ?2 WHERE name = ?3",
            params![portfolio_json, encode_time(bot.updated_at), bot.name],
        )
        .map_err(query_err)?;

        tx.execute(
            "INSERT INTO trade (bot_name, symbol, side, quantity, price, timestamp, profit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                trade.bot_name,
                trade.symbol,
                trade.side.as_str(),
                trade.quantity,
                trade.price,
                encode_time(trade.timestamp),
                trade.profit
            ],
        )
        .map_err(query_err)?;

        tx.commit().map_err(query_err)
    }

    fn trades_for(&self, bot_name: &str, symbol: &str) -> Result<Vec<Trade>, BotError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT bot_name, symbol, side, quantity, price, timestamp, profit
                 FROM trade WHERE bot_name = ?1 AND symbol = ?2 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![bot_name, symbol], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<f64>>(6)?,
                ))
            })
            .map_err(query_err)?;

        let mut trades = Vec::new();
        for row in rows {
            let (bot_name, symbol, side, quantity, price, timestamp, profit) =
                row.map_err(query_err)?;
            let side = TradeSide::parse(&side).ok_or_else(|| BotError::Persistence {
                reason: format!("unknown trade side {side}"),
            })?;
            trades.push(Trade {
                bot_name,
                symbol,
                side,
                quantity,
                price,
                timestamp: decode_time(&timestamp)?,
                profit,
            });
        }
        Ok(trades)
    }

    fn upsert_bars(&self, bars: &[Bar]) -> Result<usize, BotError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO historic_bar (symbol, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    encode_time(bar.timestamp),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(bars.len())
    }

    fn cached_bars(&self, symbol: &str, since: DateTime<Utc>) -> Result<Vec<Bar>, BotError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, timestamp, open, high, low, close, volume
                 FROM historic_bar WHERE symbol = ?1 AND timestamp >= ?2
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol, encode_time(since)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (symbol, timestamp, open, high, low, close, volume) = row.map_err(query_err)?;
            bars.push(Bar {
                symbol,
                timestamp: decode_time(&timestamp)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(bars)
    }

    fn latest_bar_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, BotError> {
        let conn = self.conn()?;
        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(timestamp) FROM historic_bar WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;

        match latest {
            Some(ts) => Ok(Some(decode_time(&ts)?)),
            None => Ok(None),
        }
    }

    fn append_run_log(&self, entry: &RunLog) -> Result<(), BotError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO run_log (bot_name, started_at, success, result)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.bot_name,
                encode_time(entry.started_at),
                entry.success as i64,
                entry.result
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn run_logs(&self, bot_name: &str) -> Result<Vec<RunLog>, BotError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT bot_name, started_at, success, result
                 FROM run_log WHERE bot_name = ?1 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![bot_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(query_err)?;

        let mut logs = Vec::new();
        for row in rows {
            let (bot_name, started_at, success, result) = row.map_err(query_err)?;
            logs.push(RunLog {
                bot_name,
                started_at: decode_time(&started_at)?,
                success: success != 0,
                result,
            });
        }
        Ok(logs)
    }

    fn record_worth(&self, worth: &PortfolioWorth) -> Result<(), BotError> {
        let conn = self.conn()?;
        let holdings_json = serde_json::to_string(&worth.holdings).map_err(json_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO portfolio_worth (bot_name, date, worth, holdings)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                worth.bot_name,
                worth.date.format("%Y-%m-%d").to_string(),
                worth.worth,
                holdings_json
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn worth_history(&self, bot_name: &str) -> Result<Vec<PortfolioWorth>, BotError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT bot_name, date, worth, holdings
                 FROM portfolio_worth WHERE bot_name = ?1 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![bot_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(query_err)?;

        let mut history = Vec::new();
        for row in rows {
            let (bot_name, date, worth, holdings_json) = row.map_err(query_err)?;
            let holdings: BTreeMap<String, f64> =
                serde_json::from_str(&holdings_json).map_err(json_err)?;
            history.push(PortfolioWorth {
                bot_name,
                date: decode_date(&date)?,
                worth,
                holdings,
            });
        }
        Ok(history)
    }
}
