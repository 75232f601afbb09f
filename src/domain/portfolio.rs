//! Portfolio state: cash plus held units per symbol.
//!
//! The cash entry is the literal `USD` key in the persisted document; in
//! memory it is a dedicated field so the non-negativity invariant can be
//! enforced on every mutation path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::BotError;

pub const CASH_SYMBOL: &str = "USD";
pub const DEFAULT_STARTING_CASH: f64 = 10_000.0;

/// Residual quantities below this are treated as zero and dropped.
const DUST: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct Portfolio {
    cash: f64,
    holdings: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Portfolio {
            cash,
            holdings: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Held units of `symbol`, zero when absent.
    pub fn holding(&self, symbol: &str) -> f64 {
        self.holdings.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn holdings(&self) -> &BTreeMap<String, f64> {
        &self.holdings
    }

    pub fn credit_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    /// Withdraw `amount` from cash. Fails when the balance cannot cover it.
    pub fn debit_cash(&mut self, amount: f64) -> Result<(), BotError> {
        if amount > self.cash + DUST {
            return Err(BotError::InsufficientFunds {
                requested: amount,
                available: self.cash,
            });
        }
        self.cash = (self.cash - amount).max(0.0);
        Ok(())
    }

    pub fn add_units(&mut self, symbol: &str, quantity: f64) {
        if quantity <= 0.0 {
            return;
        }
        *self.holdings.entry(symbol.to_string()).or_insert(0.0) += quantity;
    }

    /// Remove up to `quantity` units of `symbol`; quantities beyond the held
    /// amount are capped. Holdings that reach zero are dropped from the map.
    /// Fails when nothing is held.
    pub fn remove_units(&mut self, symbol: &str, quantity: f64) -> Result<f64, BotError> {
        let held = self.holding(symbol);
        if held <= DUST {
            return Err(BotError::NoHoldings {
                symbol: symbol.to_string(),
            });
        }
        let removed = quantity.min(held);
        let remaining = held - removed;
        if remaining <= DUST {
            self.holdings.remove(symbol);
        } else {
            self.holdings.insert(symbol.to_string(), remaining);
        }
        Ok(removed)
    }

    /// Cash plus the market value of every holding with a known price.
    pub fn total_value(&self, prices: &BTreeMap<String, f64>) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .iter()
            .filter_map(|(symbol, qty)| prices.get(symbol).map(|price| qty * price))
            .sum();
        self.cash + holdings_value
    }
}

impl From<Portfolio> for BTreeMap<String, f64> {
    fn from(portfolio: Portfolio) -> Self {
        let mut map = portfolio.holdings;
        map.insert(CASH_SYMBOL.to_string(), portfolio.cash);
        map
    }
}

impl From<BTreeMap<String, f64>> for Portfolio {
    fn from(mut map: BTreeMap<String, f64>) -> Self {
        let cash = map.remove(CASH_SYMBOL).unwrap_or(0.0);
        map.retain(|_, qty| *qty > DUST);
        Portfolio {
            cash,
            holdings: map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_portfolio_is_all_cash() {
        let p = Portfolio::new(10_000.0);
        assert!((p.cash() - 10_000.0).abs() < f64::EPSILON);
        assert!(p.holdings().is_empty());
    }

    #[test]
    fn debit_within_balance() {
        let mut p = Portfolio::new(1000.0);
        p.debit_cash(400.0).unwrap();
        assert!((p.cash() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let mut p = Portfolio::new(1000.0);
        let err = p.debit_cash(1000.01).unwrap_err();
        match err {
            BotError::InsufficientFunds {
                requested,
                available,
            } => {
                assert!((requested - 1000.01).abs() < 1e-9);
                assert!((available - 1000.0).abs() < 1e-9);
            }
            other => panic!("expected InsufficientFunds, got: {other}"),
        }
        // balance untouched on failure
        assert!((p.cash() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn add_and_remove_units() {
        let mut p = Portfolio::new(0.0);
        p.add_units("QQQ", 10.0);
        assert!((p.holding("QQQ") - 10.0).abs() < 1e-9);

        let removed = p.remove_units("QQQ", 4.0).unwrap();
        assert!((removed - 4.0).abs() < 1e-9);
        assert!((p.holding("QQQ") - 6.0).abs() < 1e-9);
    }

    #[test]
    fn remove_caps_at_held_quantity() {
        let mut p = Portfolio::new(0.0);
        p.add_units("QQQ", 3.0);
        let removed = p.remove_units("QQQ", 100.0).unwrap();
        assert!((removed - 3.0).abs() < 1e-9);
        assert!(!p.holdings().contains_key("QQQ"));
    }

    #[test]
    fn remove_without_holding_fails() {
        let mut p = Portfolio::new(1000.0);
        match p.remove_units("QQQ", 1.0) {
            Err(BotError::NoHoldings { symbol }) => assert_eq!(symbol, "QQQ"),
            other => panic!("expected NoHoldings, got: {other:?}"),
        }
    }

    #[test]
    fn zero_residual_is_dropped() {
        let mut p = Portfolio::new(0.0);
        p.add_units("QQQ", 5.0);
        p.remove_units("QQQ", 5.0).unwrap();
        assert!(p.holdings().is_empty());
    }

    #[test]
    fn total_value_skips_unpriced_holdings() {
        let mut p = Portfolio::new(100.0);
        p.add_units("QQQ", 2.0);
        p.add_units("GLD", 1.0);

        let mut prices = BTreeMap::new();
        prices.insert("QQQ".to_string(), 50.0);

        assert!((p.total_value(&prices) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_to_flat_document() {
        let mut p = Portfolio::new(9000.0);
        p.add_units("QQQ", 10.0);

        let json = serde_json::to_string(&p).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["USD"], 9000.0);
        assert_eq!(parsed["QQQ"], 10.0);

        let back: Portfolio = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    proptest! {
        // Any sequence of credits, covered debits, buys-in-units and sells
        // keeps cash and every holding non-negative.
        #[test]
        fn mutations_never_go_negative(ops in proptest::collection::vec((0u8..4, 0.0f64..5000.0), 0..60)) {
            let mut p = Portfolio::new(10_000.0);
            for (op, amount) in ops {
                match op {
                    0 => p.credit_cash(amount),
                    1 => { let _ = p.debit_cash(amount); }
                    2 => p.add_units("QQQ", amount / 100.0),
                    _ => { let _ = p.remove_units("QQQ", amount / 100.0); }
                }
                prop_assert!(p.cash() >= 0.0);
                for qty in p.holdings().values() {
                    prop_assert!(*qty > 0.0);
                }
            }
        }
    }
}
