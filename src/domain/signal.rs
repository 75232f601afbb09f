//! Trade signals and decision aggregation.
//!
//! A strategy emits one signal per row; the aggregator reduces the last N
//! signals to a single actionable decision by the sign of their mean. Empty
//! or too-short tables never error: they decide Hold.

use super::error::BotError;
use super::strategy::RowStrategy;
use super::table::DataTable;

pub const DEFAULT_LAST_N: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Sell,
    Hold,
    Buy,
}

impl Signal {
    pub fn value(&self) -> i8 {
        match self {
            Signal::Sell => -1,
            Signal::Hold => 0,
            Signal::Buy => 1,
        }
    }

    /// Map a mean of signal values to a decision by sign; exactly zero holds.
    pub fn from_mean(mean: f64) -> Signal {
        if mean > 0.0 {
            Signal::Buy
        } else if mean < 0.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Run `strategy` over every row and decide from the mean of the last
/// `last_n` signals. A table shorter than `last_n` averages whatever rows
/// exist; an empty table holds.
pub fn decide(
    table: &DataTable,
    strategy: &dyn RowStrategy,
    last_n: usize,
) -> Result<Signal, BotError> {
    if table.is_empty() {
        return Ok(Signal::Hold);
    }

    let mut signals = Vec::with_capacity(table.len());
    for row in table.rows() {
        signals.push(strategy.signal(row)?.value() as f64);
    }

    let n = last_n.max(1).min(signals.len());
    let tail = &signals[signals.len() - n..];
    let mean = tail.iter().sum::<f64>() / n as f64;
    Ok(Signal::from_mean(mean))
}
