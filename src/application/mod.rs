pub mod gateway;
pub mod ledger;
pub mod rebalancer;
pub mod runner;
pub mod optimizer;
pub mod worth;

use crate::domain::bar::{Interval, Period};

/// A bot's runtime configuration: identity plus the data-fetch settings its
/// price lookups and runs use. Distinct from the persisted [`crate::domain::bot::Bot`]
/// record, which only carries state.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub name: String,
    pub symbol: String,
    pub interval: Interval,
    pub period: Period,
    /// How many trailing row signals the aggregator averages.
    pub last_n: usize,
}

impl BotConfig {
    pub fn new(name: &str, symbol: &str, interval: Interval, period: Period) -> Self {
        BotConfig {
            name: name.to_string(),
            symbol: symbol.to_string(),
            interval,
            period,
            last_n: crate::domain::signal::DEFAULT_LAST_N,
        }
    }
}
