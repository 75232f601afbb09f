//! Hyperparameter grid search over a shared pre-fetched table.
//!
//! The table is fetched exactly once (period clamped per the gateway's
//! interval rules, cached durably) and every parameter combination backtests
//! against an immutable reference to it, fanned out across the rayon pool.
//! Workers share nothing mutable; aggregation happens after all of them
//! finish. Best combination: highest Sharpe ratio, ties broken by higher
//! yearly return, then by grid order.

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::gateway::MarketDataGateway;
use crate::domain::backtest::run_backtest;
use crate::domain::bar::{Interval, Period};
use crate::domain::error::BotError;
use crate::domain::metrics::BacktestMetrics;
use crate::domain::strategy::RowStrategy;

/// One point of the grid: named parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet(BTreeMap<String, f64>);

impl ParamSet {
    pub fn empty() -> Self {
        ParamSet(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Like [`get`](Self::get) but missing parameters are a strategy error.
    pub fn require(&self, name: &str) -> Result<f64, BotError> {
        self.get(name).ok_or_else(|| BotError::Strategy {
            reason: format!("missing parameter {name}"),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl std::fmt::Display for ParamSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Axes of the search space. The Cartesian product of the axis values forms
/// the combinations; a grid with no axes has exactly one (empty) combination.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<f64>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        ParamGrid::default()
    }

    pub fn axis(mut self, name: &str, values: Vec<f64>) -> Self {
        self.axes.push((name.to_string(), values));
        self
    }

    pub fn combination_count(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// All combinations in grid order: the last axis varies fastest.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let total = self.combination_count();
        let mut out = Vec::with_capacity(total);
        for mut index in 0..total {
            let mut params = BTreeMap::new();
            for (name, values) in self.axes.iter().rev() {
                let pick = index % values.len();
                index /= values.len();
                params.insert(name.clone(), values[pick]);
            }
            out.push(ParamSet(params));
        }
        out
    }
}

/// Metrics of one evaluated combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboResult {
    pub params: ParamSet,
    pub metrics: BacktestMetrics,
}

/// The winner plus every per-combination result for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub best: ComboResult,
    pub all: Vec<ComboResult>,
}

pub struct HyperparameterOptimizer {
    initial_cash: f64,
}

impl HyperparameterOptimizer {
    pub fn new(initial_cash: f64) -> Self {
        HyperparameterOptimizer { initial_cash }
    }

    /// Evaluate the grid against one pre-fetched annotated table.
    /// `factory` builds a fresh strategy per combination; each worker owns
    /// its strategy and shadow portfolio, sharing only the read-only table.
    pub fn optimize<F>(
        &self,
        gateway: &mut MarketDataGateway,
        symbol: &str,
        interval: Interval,
        period: Period,
        grid: &ParamGrid,
        factory: F,
    ) -> Result<OptimizationOutcome, BotError>
    where
        F: Fn(&ParamSet) -> Box<dyn RowStrategy> + Sync,
    {
        let table = gateway.fetch(symbol, interval, period, true, true)?;
        let combinations = grid.combinations();
        if combinations.is_empty() {
            return Err(BotError::Strategy {
                reason: "parameter grid has an empty axis".to_string(),
            });
        }

        let initial_cash = self.initial_cash;
        let all: Vec<ComboResult> = combinations
            .into_par_iter()
            .map(|params| {
                let strategy = factory(&params);
                run_backtest(strategy.as_ref(), &table, initial_cash)
                    .map(|metrics| ComboResult { params, metrics })
            })
            .collect::<Result<_, BotError>>()?;

        let mut best = 0;
        for (i, candidate) in all.iter().enumerate().skip(1) {
            if beats(&candidate.metrics, &all[best].metrics) {
                best = i;
            }
        }

        Ok(OptimizationOutcome {
            best: all[best].clone(),
            all,
        })
    }
}

fn beats(candidate: &BacktestMetrics, incumbent: &BacktestMetrics) -> bool {
    if candidate.sharpe_ratio != incumbent.sharpe_ratio {
        return candidate.sharpe_ratio > incumbent.sharpe_ratio;
    }
    candidate.yearly_return > incumbent.yearly_return
}
