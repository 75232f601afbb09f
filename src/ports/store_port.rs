//! Persistence port trait.
//!
//! Every mutation is transactional: implementations commit on success and
//! roll back on error. `commit_trade` is deliberately one operation — the
//! updated portfolio and the trade row must never be observable separately.

use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::bot::{Bot, PortfolioWorth, RunLog};
use crate::domain::error::BotError;
use crate::domain::trade::Trade;

pub trait StorePort {
    /// Load the bot named `name`, creating and persisting a freshly seeded
    /// record when absent.
    fn get_or_create_bot(&self, name: &str, now: DateTime<Utc>) -> Result<Bot, BotError>;

    /// Persist the bot's updated portfolio and append the trade in a single
    /// transaction.
    fn commit_trade(&self, bot: &Bot, trade: &Trade) -> Result<(), BotError>;

    /// All trades of `bot_name` in `symbol`, oldest first.
    fn trades_for(&self, bot_name: &str, symbol: &str) -> Result<Vec<Trade>, BotError>;

    /// Upsert bars into the durable cache. Returns the number written.
    fn upsert_bars(&self, bars: &[Bar]) -> Result<usize, BotError>;

    /// Cached bars for `symbol` at or after `since`, oldest first.
    fn cached_bars(&self, symbol: &str, since: DateTime<Utc>) -> Result<Vec<Bar>, BotError>;

    /// Timestamp of the most recent cached bar for `symbol`.
    fn latest_bar_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, BotError>;

    fn append_run_log(&self, entry: &RunLog) -> Result<(), BotError>;

    /// Run logs for `bot_name`, oldest first.
    fn run_logs(&self, bot_name: &str) -> Result<Vec<RunLog>, BotError>;

    /// Upsert the valuation snapshot for its (bot, date) key.
    fn record_worth(&self, worth: &PortfolioWorth) -> Result<(), BotError>;

    /// Valuation history for `bot_name`, ordered by date.
    fn worth_history(&self, bot_name: &str) -> Result<Vec<PortfolioWorth>, BotError>;
}
