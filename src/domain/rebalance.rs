//! Rebalance planning: per-symbol USD deltas toward target weights.
//!
//! Weights are relative and normalized by their sum; the cash key
//! participates in normalization but is never traded directly. Execution
//! (sells first, then buys) is the rebalance engine's job.

use std::collections::{BTreeMap, BTreeSet};

use super::portfolio::{CASH_SYMBOL, Portfolio};

/// One intended trade leg, in cash terms.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub symbol: String,
    pub usd: f64,
}

/// The sell legs are executed before the buy legs so proceeds can fund them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RebalancePlan {
    pub sells: Vec<TradeIntent>,
    pub buys: Vec<TradeIntent>,
}

impl RebalancePlan {
    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }
}

/// Compute the deltas that move `portfolio` to `weights` at `prices`.
///
/// Symbols held but absent from the weights are sold down to zero. Deltas
/// smaller in magnitude than `min_trade_usd` are skipped, as are symbols
/// without a price. A weight sum of zero or less yields an empty plan.
pub fn compute_plan(
    portfolio: &Portfolio,
    prices: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
    min_trade_usd: f64,
) -> RebalancePlan {
    let weight_sum: f64 = weights.values().sum();
    if weight_sum <= 0.0 {
        return RebalancePlan::default();
    }

    let total = portfolio.total_value(prices);

    let mut symbols: BTreeSet<&str> = weights
        .keys()
        .map(|s| s.as_str())
        .filter(|s| *s != CASH_SYMBOL)
        .collect();
    symbols.extend(portfolio.holdings().keys().map(|s| s.as_str()));

    let mut plan = RebalancePlan::default();
    for symbol in symbols {
        let Some(&price) = prices.get(symbol) else {
            continue;
        };
        let weight = weights.get(symbol).copied().unwrap_or(0.0);
        let target = total * weight / weight_sum;
        let current = portfolio.holding(symbol) * price;
        let delta = target - current;

        if delta.abs() < min_trade_usd || delta.abs() < f64::EPSILON {
            continue;
        }
        if delta < 0.0 {
            plan.sells.push(TradeIntent {
                symbol: symbol.to_string(),
                usd: -delta,
            });
        } else {
            plan.buys.push(TradeIntent {
                symbol: symbol.to_string(),
                usd: delta,
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(s, p)| (s.to_string(), *p))
            .collect()
    }

    fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        prices(entries)
    }

    #[test]
    fn all_cash_portfolio_buys_to_targets() {
        let p = Portfolio::new(10_000.0);
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0), ("GLD", 50.0)]),
            &weights(&[("QQQ", 0.6), ("GLD", 0.4)]),
            0.0,
        );
        assert!(plan.sells.is_empty());
        assert_eq!(plan.buys.len(), 2);
        let qqq = plan.buys.iter().find(|t| t.symbol == "QQQ").unwrap();
        let gld = plan.buys.iter().find(|t| t.symbol == "GLD").unwrap();
        assert!((qqq.usd - 6000.0).abs() < 1e-9);
        assert!((gld.usd - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn weights_are_normalized_by_their_sum() {
        let p = Portfolio::new(10_000.0);
        // 3:1 weights, not summing to 1
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0), ("GLD", 50.0)]),
            &weights(&[("QQQ", 3.0), ("GLD", 1.0)]),
            0.0,
        );
        let qqq = plan.buys.iter().find(|t| t.symbol == "QQQ").unwrap();
        assert!((qqq.usd - 7500.0).abs() < 1e-9);
    }

    #[test]
    fn cash_weight_reserves_value() {
        let p = Portfolio::new(10_000.0);
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0)]),
            &weights(&[("QQQ", 0.5), ("USD", 0.5)]),
            0.0,
        );
        assert_eq!(plan.buys.len(), 1);
        assert!((plan.buys[0].usd - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn held_symbol_missing_from_weights_is_sold() {
        let mut p = Portfolio::new(1000.0);
        p.add_units("TSLA", 10.0);
        let plan = compute_plan(
            &p,
            &prices(&[("TSLA", 200.0), ("QQQ", 100.0)]),
            &weights(&[("QQQ", 1.0)]),
            0.0,
        );
        assert_eq!(plan.sells.len(), 1);
        assert_eq!(plan.sells[0].symbol, "TSLA");
        assert!((plan.sells[0].usd - 2000.0).abs() < 1e-9);
        // buy gets the whole book: 1000 cash + 2000 proceeds
        assert!((plan.buys[0].usd - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn min_trade_threshold_skips_churn() {
        let mut p = Portfolio::new(30.0);
        p.add_units("QQQ", 100.0);
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0)]),
            &weights(&[("QQQ", 1.0)]),
            50.0,
        );
        // delta is 30 USD, below the threshold
        assert!(plan.is_empty());
    }

    #[test]
    fn zero_weight_sum_is_noop() {
        let p = Portfolio::new(10_000.0);
        let plan = compute_plan(&p, &prices(&[("QQQ", 100.0)]), &weights(&[]), 0.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn unpriced_symbol_is_skipped() {
        let p = Portfolio::new(10_000.0);
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0)]),
            &weights(&[("QQQ", 0.5), ("UNKNOWN", 0.5)]),
            0.0,
        );
        assert_eq!(plan.buys.len(), 1);
        assert_eq!(plan.buys[0].symbol, "QQQ");
    }

    #[test]
    fn balanced_portfolio_needs_no_trades() {
        let mut p = Portfolio::new(0.0);
        p.add_units("QQQ", 60.0);
        p.add_units("GLD", 80.0);
        let plan = compute_plan(
            &p,
            &prices(&[("QQQ", 100.0), ("GLD", 50.0)]),
            &weights(&[("QQQ", 0.6), ("GLD", 0.4)]),
            0.0,
        );
        assert!(plan.is_empty());
    }
}
