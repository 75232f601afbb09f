//! Run orchestrator: one end-to-end bot execution.
//!
//! The run walks Idle → Fetching → Deciding → Executing → Logged. Any error
//! in between moves to Failed, is recorded to the run log, and is then
//! re-raised — a run is never silently swallowed.
//!
//! Strategies plug in through one of two capabilities, selected at
//! construction: a per-row decision routed through the signal aggregator, or
//! a full custom iteration driven through [`BotContext`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::BotConfig;
use super::gateway::MarketDataGateway;
use super::ledger::{Amount, LedgerService};
use super::rebalancer;
use crate::domain::bar::{Interval, Period};
use crate::domain::bot::{Bot, RunLog};
use crate::domain::error::BotError;
use crate::domain::portfolio::Portfolio;
use crate::domain::signal::{self, Signal};
use crate::domain::strategy::RowStrategy;
use crate::domain::table::DataTable;
use crate::domain::trade::Trade;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::StorePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Fetching,
    Deciding,
    Executing,
    Logged,
    Failed,
}

/// A strategy that drives its whole iteration itself instead of answering
/// per row.
pub trait IterationStrategy {
    fn run(&self, ctx: &mut BotContext<'_>) -> Result<Signal, BotError>;
}

/// The capability a concrete strategy implements, chosen at construction.
pub enum StrategyUnit {
    PerRow(Box<dyn RowStrategy>),
    Custom(Box<dyn IterationStrategy>),
}

/// What a custom iteration may touch: the bot's portfolio (read-only), price
/// lookups, table fetches, and the trade primitives. Sessions and caches
/// stay internal.
pub struct BotContext<'a> {
    now: DateTime<Utc>,
    gateway: &'a mut MarketDataGateway,
    ledger: &'a LedgerService,
    config: &'a BotConfig,
    bot: &'a mut Bot,
}

impl<'a> BotContext<'a> {
    pub fn portfolio(&self) -> &Portfolio {
        &self.bot.portfolio
    }

    pub fn config(&self) -> &BotConfig {
        self.config
    }

    pub fn latest_price(&mut self, symbol: &str) -> Result<f64, BotError> {
        self.gateway
            .latest_price_at(self.now, symbol, self.config.interval, self.config.period)
    }

    pub fn fetch(
        &mut self,
        symbol: &str,
        interval: Interval,
        period: Period,
        with_indicators: bool,
        persist: bool,
    ) -> Result<Arc<DataTable>, BotError> {
        self.gateway
            .fetch_at(self.now, symbol, interval, period, with_indicators, persist)
    }

    pub fn buy(&mut self, symbol: &str, amount: Amount) -> Result<Trade, BotError> {
        self.ledger
            .buy_at(self.now, self.gateway, self.config, self.bot, symbol, amount)
    }

    pub fn sell(&mut self, symbol: &str, amount: Amount) -> Result<Trade, BotError> {
        self.ledger
            .sell_at(self.now, self.gateway, self.config, self.bot, symbol, amount)
    }

    pub fn rebalance(
        &mut self,
        weights: &BTreeMap<String, f64>,
        min_trade_usd: f64,
    ) -> Result<Vec<Trade>, BotError> {
        rebalancer::rebalance_at(
            self.now,
            self.gateway,
            self.ledger,
            self.config,
            self.bot,
            weights,
            min_trade_usd,
        )
    }
}

pub struct RunOrchestrator {
    gateway: MarketDataGateway,
    ledger: LedgerService,
    store: Arc<dyn StorePort>,
    config: BotConfig,
    state: RunState,
}

impl RunOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataPort>,
        store: Arc<dyn StorePort>,
        config: BotConfig,
    ) -> Self {
        RunOrchestrator {
            gateway: MarketDataGateway::new(provider, Some(Arc::clone(&store))),
            ledger: LedgerService::new(Arc::clone(&store)),
            store,
            config,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn gateway_mut(&mut self) -> &mut MarketDataGateway {
        &mut self.gateway
    }

    /// Execute one run at the current instant.
    pub fn run_once(&mut self, strategy: &StrategyUnit) -> Result<Signal, BotError> {
        self.run_once_at(Utc::now(), strategy)
    }

    pub fn run_once_at(
        &mut self,
        now: DateTime<Utc>,
        strategy: &StrategyUnit,
    ) -> Result<Signal, BotError> {
        let mut bot = self.store.get_or_create_bot(&self.config.name, now)?;

        let outcome = self.execute(now, &mut bot, strategy);
        let (success, result) = match &outcome {
            Ok(decision) => {
                self.state = RunState::Logged;
                (true, decision.to_string())
            }
            Err(err) => {
                self.state = RunState::Failed;
                (false, err.to_string())
            }
        };

        self.store.append_run_log(&RunLog {
            bot_name: self.config.name.clone(),
            started_at: now,
            success,
            result,
        })?;

        outcome
    }

    fn execute(
        &mut self,
        now: DateTime<Utc>,
        bot: &mut Bot,
        strategy: &StrategyUnit,
    ) -> Result<Signal, BotError> {
        self.state = RunState::Fetching;
        let decision = match strategy {
            StrategyUnit::PerRow(row_strategy) => {
                let table = self.gateway.fetch_at(
                    now,
                    &self.config.symbol,
                    self.config.interval,
                    self.config.period,
                    true,
                    true,
                )?;
                self.state = RunState::Deciding;
                signal::decide(&table, row_strategy.as_ref(), self.config.last_n)?
            }
            StrategyUnit::Custom(custom) => {
                self.state = RunState::Deciding;
                let mut ctx = BotContext {
                    now,
                    gateway: &mut self.gateway,
                    ledger: &self.ledger,
                    config: &self.config,
                    bot,
                };
                custom.run(&mut ctx)?
            }
        };

        self.state = RunState::Executing;
        let symbol = self.config.symbol.clone();
        match decision {
            Signal::Buy => {
                self.ledger
                    .buy_at(now, &mut self.gateway, &self.config, bot, &symbol, Amount::All)?;
            }
            Signal::Sell => {
                self.ledger
                    .sell_at(now, &mut self.gateway, &self.config, bot, &symbol, Amount::All)?;
            }
            Signal::Hold => {}
        }
        Ok(decision)
    }
}
