//! Ledger service: the only writer of portfolio and trade state.
//!
//! Buys and sells mutate a working copy of the portfolio, commit it together
//! with the trade row in one store transaction, and only then swap the copy
//! into the live bot — a failed commit leaves the in-memory bot untouched.
//! Sell profit is realized against an average-cost basis over the bot's buy
//! history for the symbol.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::BotConfig;
use super::gateway::MarketDataGateway;
use crate::domain::bot::Bot;
use crate::domain::error::BotError;
use crate::domain::trade::{Trade, TradeSide, average_buy_cost};
use crate::ports::store_port::StorePort;

/// Cash amount for a trade: a fixed USD value or the whole position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Usd(f64),
    All,
}

pub struct LedgerService {
    store: Arc<dyn StorePort>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn StorePort>) -> Self {
        LedgerService { store }
    }

    /// Buy `symbol` for the given cash amount at the latest price.
    /// Non-positive amounts and amounts beyond available cash fail with
    /// `InsufficientFunds`.
    pub fn buy(
        &self,
        gateway: &mut MarketDataGateway,
        config: &BotConfig,
        bot: &mut Bot,
        symbol: &str,
        amount: Amount,
    ) -> Result<Trade, BotError> {
        self.buy_at(Utc::now(), gateway, config, bot, symbol, amount)
    }

    pub fn buy_at(
        &self,
        now: DateTime<Utc>,
        gateway: &mut MarketDataGateway,
        config: &BotConfig,
        bot: &mut Bot,
        symbol: &str,
        amount: Amount,
    ) -> Result<Trade, BotError> {
        let price = self.resolve_price(now, gateway, config, symbol)?;

        let spend = match amount {
            Amount::All => bot.portfolio.cash(),
            Amount::Usd(value) => value,
        };
        if spend <= 0.0 {
            return Err(BotError::InsufficientFunds {
                requested: spend,
                available: bot.portfolio.cash(),
            });
        }

        let mut portfolio = bot.portfolio.clone();
        portfolio.debit_cash(spend)?;
        let quantity = spend / price;
        portfolio.add_units(symbol, quantity);

        let trade = Trade {
            bot_name: bot.name.clone(),
            symbol: symbol.to_string(),
            side: TradeSide::Buy,
            quantity,
            price,
            timestamp: now,
            profit: None,
        };

        let mut updated = bot.clone();
        updated.portfolio = portfolio;
        updated.updated_at = now;
        self.store.commit_trade(&updated, &trade)?;
        *bot = updated;
        Ok(trade)
    }

    /// Sell `symbol` for the given cash amount at the latest price, capped at
    /// the held quantity (`Amount::All` sells exactly the holding). Fails
    /// with `NoHoldings` when nothing is held; non-positive amounts fail with
    /// `InsufficientFunds`.
    pub fn sell(
        &self,
        gateway: &mut MarketDataGateway,
        config: &BotConfig,
        bot: &mut Bot,
        symbol: &str,
        amount: Amount,
    ) -> Result<Trade, BotError> {
        self.sell_at(Utc::now(), gateway, config, bot, symbol, amount)
    }

    pub fn sell_at(
        &self,
        now: DateTime<Utc>,
        gateway: &mut MarketDataGateway,
        config: &BotConfig,
        bot: &mut Bot,
        symbol: &str,
        amount: Amount,
    ) -> Result<Trade, BotError> {
        let held = bot.portfolio.holding(symbol);
        if held <= 0.0 {
            return Err(BotError::NoHoldings {
                symbol: symbol.to_string(),
            });
        }

        let price = self.resolve_price(now, gateway, config, symbol)?;

        let quantity = match amount {
            Amount::All => held,
            Amount::Usd(value) => {
                if value <= 0.0 {
                    return Err(BotError::InsufficientFunds {
                        requested: value,
                        available: held * price,
                    });
                }
                (value / price).min(held)
            }
        };

        // basis over the full buy history; sells do not move it
        let trades = self.store.trades_for(&bot.name, symbol)?;
        let basis = average_buy_cost(&trades, symbol).unwrap_or(price);
        let proceeds = quantity * price;
        let profit = quantity * (price - basis);

        let mut portfolio = bot.portfolio.clone();
        portfolio.remove_units(symbol, quantity)?;
        portfolio.credit_cash(proceeds);

        let trade = Trade {
            bot_name: bot.name.clone(),
            symbol: symbol.to_string(),
            side: TradeSide::Sell,
            quantity,
            price,
            timestamp: now,
            profit: Some(profit),
        };

        let mut updated = bot.clone();
        updated.portfolio = portfolio;
        updated.updated_at = now;
        self.store.commit_trade(&updated, &trade)?;
        *bot = updated;
        Ok(trade)
    }

    fn resolve_price(
        &self,
        now: DateTime<Utc>,
        gateway: &mut MarketDataGateway,
        config: &BotConfig,
        symbol: &str,
    ) -> Result<f64, BotError> {
        let price = gateway.latest_price_at(now, symbol, config.interval, config.period)?;
        if price <= 0.0 {
            return Err(BotError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("non-positive price {price}"),
            });
        }
        Ok(price)
    }
}
