//! Daily portfolio valuation pass.
//!
//! Values a bot's book at the latest prices and upserts one snapshot per
//! (bot, date). Holdings whose price cannot be resolved are skipped rather
//! than failing the whole valuation; other errors propagate.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::BotConfig;
use super::gateway::MarketDataGateway;
use crate::domain::bot::{Bot, PortfolioWorth};
use crate::domain::error::BotError;
use crate::domain::metrics::{WorthMetrics, worth_metrics};
use crate::ports::store_port::StorePort;

pub fn record_worth(
    gateway: &mut MarketDataGateway,
    store: &dyn StorePort,
    config: &BotConfig,
    bot: &Bot,
) -> Result<PortfolioWorth, BotError> {
    record_worth_at(Utc::now(), gateway, store, config, bot)
}

pub fn record_worth_at(
    now: DateTime<Utc>,
    gateway: &mut MarketDataGateway,
    store: &dyn StorePort,
    config: &BotConfig,
    bot: &Bot,
) -> Result<PortfolioWorth, BotError> {
    let mut prices = BTreeMap::new();
    for symbol in bot.portfolio.holdings().keys() {
        match gateway.latest_price_at(now, symbol, config.interval, config.period) {
            Ok(price) => {
                prices.insert(symbol.clone(), price);
            }
            Err(BotError::DataUnavailable { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    let worth = PortfolioWorth {
        bot_name: bot.name.clone(),
        date: now.date_naive(),
        worth: bot.portfolio.total_value(&prices),
        holdings: bot.portfolio.holdings().clone(),
    };
    store.record_worth(&worth)?;
    Ok(worth)
}

/// Performance metrics over a bot's recorded valuation history.
pub fn history_metrics(store: &dyn StorePort, bot_name: &str) -> Result<WorthMetrics, BotError> {
    let history = store.worth_history(bot_name)?;
    Ok(worth_metrics(&history))
}
