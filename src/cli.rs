//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_market_data::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::application::BotConfig;
use crate::application::gateway::MarketDataGateway;
use crate::application::optimizer::{HyperparameterOptimizer, ParamGrid, ParamSet};
use crate::application::runner::{RunOrchestrator, StrategyUnit};
use crate::application::worth;
use crate::domain::backtest::run_backtest;
use crate::domain::bar::{Interval, Period};
use crate::domain::error::BotError;
use crate::domain::signal::Signal;
use crate::domain::strategy::RowStrategy;
use crate::domain::table::Row;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "tradebot", about = "Trading bot engine: live runs, backtests, grid search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    InitSchema {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Execute one bot iteration: fetch, decide, trade, log
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Backtest the configured strategy over historical data
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Grid-search strategy parameters over one pre-fetched table
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Record today's portfolio valuation and show history metrics
    Worth {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the bot's portfolio and recent run logs
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::InitSchema { config } => run_init_schema(&config),
        Command::Run { config } => run_once(&config),
        Command::Backtest { config } => run_backtest_cmd(&config),
        Command::Optimize { config } => run_optimize(&config),
        Command::Worth { config } => run_worth(&config),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, BotError> {
    FileConfigAdapter::from_file(path).map_err(|e| BotError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_bot_config(adapter: &dyn ConfigPort) -> Result<BotConfig, BotError> {
    let name = adapter
        .get_string("bot", "name")
        .ok_or_else(|| BotError::ConfigMissing {
            section: "bot".into(),
            key: "name".into(),
        })?;
    let symbol = adapter
        .get_string("bot", "symbol")
        .ok_or_else(|| BotError::ConfigMissing {
            section: "bot".into(),
            key: "symbol".into(),
        })?;

    let interval_str = adapter
        .get_string("bot", "interval")
        .unwrap_or_else(|| "1d".to_string());
    let interval = Interval::parse(&interval_str).ok_or_else(|| BotError::ConfigInvalid {
        section: "bot".into(),
        key: "interval".into(),
        reason: format!("unrecognized interval {interval_str}"),
    })?;

    let period_str = adapter
        .get_string("bot", "period")
        .unwrap_or_else(|| "3mo".to_string());
    let period = Period::parse(&period_str).ok_or_else(|| BotError::ConfigInvalid {
        section: "bot".into(),
        key: "period".into(),
        reason: format!("unrecognized period {period_str}"),
    })?;

    let mut config = BotConfig::new(&name, &symbol, interval, period);
    config.last_n = adapter.get_int("bot", "last_n", 1).max(1) as usize;
    Ok(config)
}

fn build_provider(adapter: &dyn ConfigPort) -> Result<CsvMarketData, BotError> {
    let data_path = adapter
        .get_string("data", "path")
        .ok_or_else(|| BotError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    Ok(CsvMarketData::new(PathBuf::from(data_path)))
}

fn build_store(adapter: &dyn ConfigPort) -> Result<Arc<SqliteStore>, BotError> {
    let store = SqliteStore::from_config(adapter)?;
    store.initialize_schema()?;
    Ok(Arc::new(store))
}

/// Moving-average crossover over the annotated table: buy while the fast
/// average is above the slow one, sell while below.
pub struct SmaCross {
    pub fast: usize,
    pub slow: usize,
}

impl SmaCross {
    pub fn from_params(params: &ParamSet) -> Result<Self, BotError> {
        Ok(SmaCross {
            fast: params.require("fast")? as usize,
            slow: params.require("slow")? as usize,
        })
    }
}

impl RowStrategy for SmaCross {
    fn signal(&self, row: Row<'_>) -> Result<Signal, BotError> {
        let fast_name = format!("sma_{}", self.fast);
        let slow_name = format!("sma_{}", self.slow);
        let fast = row
            .indicator(&fast_name)
            .ok_or_else(|| BotError::Strategy {
                reason: format!("missing column {fast_name}"),
            })?;
        let slow = row
            .indicator(&slow_name)
            .ok_or_else(|| BotError::Strategy {
                reason: format!("missing column {slow_name}"),
            })?;

        Ok(if fast > slow {
            Signal::Buy
        } else if fast < slow {
            Signal::Sell
        } else {
            Signal::Hold
        })
    }
}

fn build_strategy(adapter: &dyn ConfigPort) -> SmaCross {
    SmaCross {
        fast: adapter.get_int("strategy", "fast", 10).max(1) as usize,
        slow: adapter.get_int("strategy", "slow", 50).max(1) as usize,
    }
}

fn run_init_schema(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    build_store(&adapter)?;
    eprintln!("schema initialized");
    Ok(())
}

fn run_once(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    let bot_config = build_bot_config(&adapter)?;
    let provider = Arc::new(build_provider(&adapter)?);
    let store = build_store(&adapter)?;

    eprintln!(
        "running {} on {} ({} / {})",
        bot_config.name, bot_config.symbol, bot_config.interval, bot_config.period
    );

    let strategy = StrategyUnit::PerRow(Box::new(build_strategy(&adapter)));
    let name = bot_config.name.clone();
    let mut orchestrator = RunOrchestrator::new(provider, store.clone(), bot_config);
    let decision = orchestrator.run_once(&strategy)?;

    let bot = store.get_or_create_bot(&name, chrono::Utc::now())?;
    println!("decision: {decision}");
    println!("cash: {:.2}", bot.portfolio.cash());
    for (symbol, quantity) in bot.portfolio.holdings() {
        println!("{symbol}: {quantity:.6}");
    }
    Ok(())
}

fn run_backtest_cmd(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    let bot_config = build_bot_config(&adapter)?;
    let provider = Arc::new(build_provider(&adapter)?);
    let store = build_store(&adapter)?;
    let initial_cash = adapter.get_double("backtest", "initial_cash", 10_000.0);

    let mut gateway = MarketDataGateway::new(provider, Some(store));
    eprintln!("fetching {} table...", bot_config.symbol);
    let table = gateway.fetch(
        &bot_config.symbol,
        bot_config.interval,
        bot_config.period,
        true,
        true,
    )?;
    eprintln!("replaying {} bars...", table.len());

    let strategy = build_strategy(&adapter);
    let metrics = run_backtest(&strategy, &table, initial_cash)?;

    println!("yearly return: {:.2}%", metrics.yearly_return * 100.0);
    println!("sharpe ratio:  {:.2}", metrics.sharpe_ratio);
    println!("max drawdown:  {:.2}%", metrics.max_drawdown * 100.0);
    println!("trades:        {}", metrics.nr_trades);
    Ok(())
}

fn run_optimize(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    let bot_config = build_bot_config(&adapter)?;
    let provider = Arc::new(build_provider(&adapter)?);
    let store = build_store(&adapter)?;
    let initial_cash = adapter.get_double("optimize", "initial_cash", 10_000.0);

    let fast = adapter.get_list("optimize", "fast");
    let slow = adapter.get_list("optimize", "slow");
    if fast.is_empty() || slow.is_empty() {
        return Err(BotError::ConfigMissing {
            section: "optimize".into(),
            key: "fast/slow".into(),
        });
    }
    let grid = ParamGrid::new().axis("fast", fast).axis("slow", slow);
    eprintln!("evaluating {} combinations...", grid.combination_count());

    let mut gateway = MarketDataGateway::new(provider, Some(store));
    let optimizer = HyperparameterOptimizer::new(initial_cash);
    let outcome = optimizer.optimize(
        &mut gateway,
        &bot_config.symbol,
        bot_config.interval,
        bot_config.period,
        &grid,
        |params| {
            Box::new(SmaCross {
                fast: params.get("fast").unwrap_or(10.0) as usize,
                slow: params.get("slow").unwrap_or(50.0) as usize,
            })
        },
    )?;

    for result in &outcome.all {
        println!(
            "{}: sharpe {:.2}, yearly {:.2}%, trades {}",
            result.params,
            result.metrics.sharpe_ratio,
            result.metrics.yearly_return * 100.0,
            result.metrics.nr_trades
        );
    }
    println!("best: {}", outcome.best.params);
    Ok(())
}

fn run_worth(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    let bot_config = build_bot_config(&adapter)?;
    let provider = Arc::new(build_provider(&adapter)?);
    let store = build_store(&adapter)?;

    let bot = store.get_or_create_bot(&bot_config.name, chrono::Utc::now())?;
    let mut gateway = MarketDataGateway::new(provider, Some(store.clone()));
    let snapshot = worth::record_worth(&mut gateway, store.as_ref(), &bot_config, &bot)?;
    println!("{} worth on {}: {:.2}", bot.name, snapshot.date, snapshot.worth);

    let metrics = worth::history_metrics(store.as_ref(), &bot_config.name)?;
    println!("total return:      {:.2}%", metrics.total_return * 100.0);
    println!("annualized return: {:.2}%", metrics.annualized_return * 100.0);
    println!("sharpe ratio:      {:.2}", metrics.sharpe_ratio);
    println!("max drawdown:      {:.2}%", metrics.max_drawdown * 100.0);
    Ok(())
}

fn run_info(config_path: &PathBuf) -> Result<(), BotError> {
    let adapter = load_config(config_path)?;
    let bot_config = build_bot_config(&adapter)?;
    let store = build_store(&adapter)?;

    let bot = store.get_or_create_bot(&bot_config.name, chrono::Utc::now())?;
    println!("bot: {}", bot.name);
    println!("cash: {:.2}", bot.portfolio.cash());
    for (symbol, quantity) in bot.portfolio.holdings() {
        println!("{symbol}: {quantity:.6}");
    }

    let logs = store.run_logs(&bot.name)?;
    println!("runs: {}", logs.len());
    for log in logs.iter().rev().take(5) {
        let status = if log.success { "ok" } else { "failed" };
        println!("  {} [{}] {}", log.started_at, status, log.result);
    }
    Ok(())
}
