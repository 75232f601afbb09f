//! Bot identity and the append-only records keyed by it.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use super::portfolio::{DEFAULT_STARTING_CASH, Portfolio};

/// A bot's persisted state. Identity is the unique name; the portfolio is
/// mutated exclusively through the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Bot {
    pub name: String,
    pub description: String,
    pub portfolio: Portfolio,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    /// A fresh bot seeded with the default starting cash.
    pub fn new(name: &str, now: DateTime<Utc>) -> Self {
        Bot {
            name: name.to_string(),
            description: String::new(),
            portfolio: Portfolio::new(DEFAULT_STARTING_CASH),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One row per orchestrator execution: the decision value on success, the
/// error text on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLog {
    pub bot_name: String,
    pub started_at: DateTime<Utc>,
    pub success: bool,
    pub result: String,
}

/// Daily valuation snapshot for a bot.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioWorth {
    pub bot_name: String,
    pub date: NaiveDate,
    pub worth: f64,
    pub holdings: BTreeMap<String, f64>,
}
