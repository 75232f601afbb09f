//! Trade records.
//!
//! Trades are append-only: one row per executed buy or sell, never updated.
//! Sell rows carry the realized profit against an average-cost basis; buy
//! rows carry no profit.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<TradeSide> {
        match s {
            "buy" => Some(TradeSide::Buy),
            "sell" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub bot_name: String,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Realized profit for sells; `None` for buys.
    pub profit: Option<f64>,
}

/// Average unit cost across every buy of `symbol` in `trades`. Sells do not
/// move the basis. `None` when no buys are recorded.
pub fn average_buy_cost(trades: &[Trade], symbol: &str) -> Option<f64> {
    let mut total_cost = 0.0;
    let mut total_qty = 0.0;
    for trade in trades {
        if trade.symbol == symbol && trade.side == TradeSide::Buy {
            total_cost += trade.quantity * trade.price;
            total_qty += trade.quantity;
        }
    }
    if total_qty > 0.0 {
        Some(total_cost / total_qty)
    } else {
        None
    }
}
