//! Rebalance engine: prices the book and executes a rebalance plan.
//!
//! Sells run before buys so their proceeds fund the purchases inside one
//! pass. Buy legs are capped at the cash actually available, so rounding in
//! the plan cannot trip the ledger's funds check.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::BotConfig;
use super::gateway::MarketDataGateway;
use super::ledger::{Amount, LedgerService};
use crate::domain::bot::Bot;
use crate::domain::error::BotError;
use crate::domain::portfolio::CASH_SYMBOL;
use crate::domain::rebalance::compute_plan;
use crate::domain::trade::Trade;

/// Conventional floor for one rebalance leg, matching the weekly
/// rebalancing bots' "only over 50 USD" setting.
pub const MIN_ASSET_VALUE_USD: f64 = 50.0;

/// Move `bot` toward `weights` (relative fractions per symbol, `USD` for
/// cash). Deltas below `min_trade_usd` are skipped. Returns the executed
/// trades, sells first.
pub fn rebalance(
    gateway: &mut MarketDataGateway,
    ledger: &LedgerService,
    config: &BotConfig,
    bot: &mut Bot,
    weights: &BTreeMap<String, f64>,
    min_trade_usd: f64,
) -> Result<Vec<Trade>, BotError> {
    rebalance_at(Utc::now(), gateway, ledger, config, bot, weights, min_trade_usd)
}

pub fn rebalance_at(
    now: DateTime<Utc>,
    gateway: &mut MarketDataGateway,
    ledger: &LedgerService,
    config: &BotConfig,
    bot: &mut Bot,
    weights: &BTreeMap<String, f64>,
    min_trade_usd: f64,
) -> Result<Vec<Trade>, BotError> {
    let mut symbols: BTreeSet<String> = weights
        .keys()
        .filter(|s| s.as_str() != CASH_SYMBOL)
        .cloned()
        .collect();
    symbols.extend(bot.portfolio.holdings().keys().cloned());

    let mut prices = BTreeMap::new();
    for symbol in &symbols {
        let price = gateway.latest_price_at(now, symbol, config.interval, config.period)?;
        prices.insert(symbol.clone(), price);
    }

    let plan = compute_plan(&bot.portfolio, &prices, weights, min_trade_usd);

    let mut trades = Vec::with_capacity(plan.sells.len() + plan.buys.len());
    for intent in &plan.sells {
        trades.push(ledger.sell_at(now, gateway, config, bot, &intent.symbol, Amount::Usd(intent.usd))?);
    }
    for intent in &plan.buys {
        let spend = intent.usd.min(bot.portfolio.cash());
        if spend < f64::EPSILON {
            continue;
        }
        trades.push(ledger.buy_at(now, gateway, config, bot, &intent.symbol, Amount::Usd(spend))?);
    }
    Ok(trades)
}
