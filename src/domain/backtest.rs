//! Backtest replay against an in-memory shadow portfolio.
//!
//! The replay never touches persisted state: it walks the table row by row,
//! executes full-cash buys and full-holding sells at the row's close
//! (frictionless, no slippage or fees), and reduces the equity curve to
//! [`BacktestMetrics`].

use super::error::BotError;
use super::metrics::{self, BacktestMetrics};
use super::signal::Signal;
use super::strategy::RowStrategy;
use super::table::DataTable;

/// Single-symbol shadow of a live portfolio: cash and held units only.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowPortfolio {
    pub cash: f64,
    pub units: f64,
}

impl ShadowPortfolio {
    pub fn new(cash: f64) -> Self {
        ShadowPortfolio { cash, units: 0.0 }
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.units * price
    }
}

/// Replay `table` through `strategy`. Empty or single-row tables yield zero
/// metrics; strategy errors propagate.
pub fn run_backtest(
    strategy: &dyn RowStrategy,
    table: &DataTable,
    initial_cash: f64,
) -> Result<BacktestMetrics, BotError> {
    if table.len() < 2 {
        return Ok(BacktestMetrics::zero());
    }

    let mut shadow = ShadowPortfolio::new(initial_cash);
    let mut equity = Vec::with_capacity(table.len());
    let mut nr_trades = 0usize;

    for row in table.rows() {
        let price = row.close();
        let decision = Signal::from_mean(strategy.signal(row)?.value() as f64);

        match decision {
            Signal::Buy if shadow.cash > 0.0 && price > 0.0 => {
                shadow.units += shadow.cash / price;
                shadow.cash = 0.0;
                nr_trades += 1;
            }
            Signal::Sell if shadow.units > 0.0 => {
                shadow.cash += shadow.units * price;
                shadow.units = 0.0;
                nr_trades += 1;
            }
            _ => {}
        }

        equity.push(shadow.equity(price));
    }

    let first = table.bar(0).map(|b| b.timestamp);
    let last = table.bar(table.len() - 1).map(|b| b.timestamp);
    let span_days = match (first, last) {
        (Some(first), Some(last)) => (last - first).num_seconds() as f64 / 86_400.0,
        _ => 0.0,
    };

    let final_equity = equity.last().copied().unwrap_or(initial_cash);

    Ok(BacktestMetrics {
        yearly_return: metrics::annualized_return(initial_cash, final_equity, span_days),
        sharpe_ratio: metrics::sharpe_ratio(&equity, table.interval().bars_per_year()),
        max_drawdown: metrics::max_drawdown(&equity),
        nr_trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::{Bar, Interval};
    use crate::domain::strategy::RowFn;
    use crate::domain::table::Row;
    use chrono::{TimeZone, Utc};

    fn make_table(closes: &[f64]) -> DataTable {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "QQQ".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect();
        DataTable::new("QQQ", Interval::Day(1), bars)
    }

    fn hold() -> RowFn<impl Fn(Row<'_>) -> Result<Signal, BotError>> {
        RowFn(|_| Ok(Signal::Hold))
    }

    #[test]
    fn empty_table_yields_zero_metrics() {
        let table = make_table(&[]);
        let metrics = run_backtest(&hold(), &table, 10_000.0).unwrap();
        assert_eq!(metrics, BacktestMetrics::zero());
    }

    #[test]
    fn single_row_table_yields_zero_metrics() {
        let table = make_table(&[100.0]);
        let metrics = run_backtest(&hold(), &table, 10_000.0).unwrap();
        assert_eq!(metrics, BacktestMetrics::zero());
    }

    #[test]
    fn hold_strategy_never_trades() {
        let table = make_table(&[100.0, 110.0, 120.0]);
        let metrics = run_backtest(&hold(), &table, 10_000.0).unwrap();
        assert_eq!(metrics.nr_trades, 0);
        assert!((metrics.yearly_return - 0.0).abs() < f64::EPSILON);
        assert!((metrics.max_drawdown - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_and_hold_captures_rally() {
        let table = make_table(&[100.0, 110.0, 121.0]);
        // buy on the first row, hold after
        let strategy = RowFn(|row: Row<'_>| {
            Ok(if row.index() == 0 {
                Signal::Buy
            } else {
                Signal::Hold
            })
        });
        let metrics = run_backtest(&strategy, &table, 10_000.0).unwrap();
        assert_eq!(metrics.nr_trades, 1);
        // 21% over 2 days, annualized: strongly positive
        assert!(metrics.yearly_return > 1.0);
        assert!((metrics.max_drawdown - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn round_trip_trade_counts_both_legs() {
        let table = make_table(&[100.0, 100.0, 120.0, 120.0]);
        let strategy = RowFn(|row: Row<'_>| {
            Ok(match row.index() {
                0 => Signal::Buy,
                2 => Signal::Sell,
                _ => Signal::Hold,
            })
        });
        let metrics = run_backtest(&strategy, &table, 1_000.0).unwrap();
        assert_eq!(metrics.nr_trades, 2);
        assert!(metrics.yearly_return > 0.0);
    }

    #[test]
    fn buy_without_cash_does_not_count_as_trade() {
        let table = make_table(&[100.0, 100.0, 100.0]);
        let strategy = RowFn(|_| Ok(Signal::Buy));
        let metrics = run_backtest(&strategy, &table, 1_000.0).unwrap();
        // only the first buy executes; the rest have no cash to spend
        assert_eq!(metrics.nr_trades, 1);
    }

    #[test]
    fn sell_without_holdings_does_not_count_as_trade() {
        let table = make_table(&[100.0, 100.0]);
        let strategy = RowFn(|_| Ok(Signal::Sell));
        let metrics = run_backtest(&strategy, &table, 1_000.0).unwrap();
        assert_eq!(metrics.nr_trades, 0);
    }

    #[test]
    fn drawdown_reflects_equity_trough() {
        let table = make_table(&[100.0, 110.0, 88.0, 99.0]);
        let strategy = RowFn(|row: Row<'_>| {
            Ok(if row.index() == 0 {
                Signal::Buy
            } else {
                Signal::Hold
            })
        });
        let metrics = run_backtest(&strategy, &table, 10_000.0).unwrap();
        assert!((metrics.max_drawdown - 0.2).abs() < 1e-9);
    }

    #[test]
    fn strategy_error_propagates() {
        let table = make_table(&[100.0, 101.0]);
        let strategy = RowFn(|_| {
            Err(BotError::Strategy {
                reason: "bad indicator".into(),
            })
        });
        assert!(run_backtest(&strategy, &table, 10_000.0).is_err());
    }
}
