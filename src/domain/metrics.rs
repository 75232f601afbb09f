//! Performance metrics over equity and valuation series.

use super::bot::PortfolioWorth;

const DAYS_PER_YEAR: f64 = 365.25;
const DAILY_PERIODS_PER_YEAR: f64 = 252.0;

/// Result of one backtest replay.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestMetrics {
    /// Annualized compound growth of final vs initial equity.
    pub yearly_return: f64,
    /// Mean per-bar return over its standard deviation, annualized.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline of the equity curve, as a fraction.
    pub max_drawdown: f64,
    /// Number of executed trades.
    pub nr_trades: usize,
}

impl BacktestMetrics {
    pub fn zero() -> Self {
        BacktestMetrics {
            yearly_return: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            nr_trades: 0,
        }
    }
}

/// Largest fractional peak-to-trough decline of `equity`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.is_empty() {
        return 0.0;
    }

    let mut peak = equity[0];
    let mut max_dd = 0.0_f64;
    for &point in equity {
        if point > peak {
            peak = point;
        } else if peak > 0.0 {
            let dd = (peak - point) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Sharpe ratio of the per-period returns of `equity`, annualized by
/// `periods_per_year`. Population standard deviation; zero when the curve is
/// too short or flat.
pub fn sharpe_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean / stddev) * periods_per_year.sqrt()
    } else {
        0.0
    }
}

/// Compound annual growth from `initial` to `final_value` over `span_days`.
pub fn annualized_return(initial: f64, final_value: f64, span_days: f64) -> f64 {
    if initial <= 0.0 || final_value <= 0.0 || span_days <= 0.0 {
        return 0.0;
    }
    (final_value / initial).powf(DAYS_PER_YEAR / span_days) - 1.0
}

/// Performance summary over a bot's daily valuation history.
#[derive(Debug, Clone, PartialEq)]
pub struct WorthMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl WorthMetrics {
    pub fn zero() -> Self {
        WorthMetrics {
            total_return: 0.0,
            annualized_return: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
        }
    }
}

/// Metrics over a worth history ordered by date. Fewer than two snapshots
/// yield zeros.
pub fn worth_metrics(history: &[PortfolioWorth]) -> WorthMetrics {
    if history.len() < 2 {
        return WorthMetrics::zero();
    }

    let worths: Vec<f64> = history.iter().map(|w| w.worth).collect();
    let first = worths[0];
    let last = worths[worths.len() - 1];
    let span_days = (history[history.len() - 1].date - history[0].date).num_days() as f64;

    let total_return = if first > 0.0 { last / first - 1.0 } else { 0.0 };

    WorthMetrics {
        total_return,
        annualized_return: annualized_return(first, last, span_days),
        sharpe_ratio: sharpe_ratio(&worths, DAILY_PERIODS_PER_YEAR),
        max_drawdown: max_drawdown(&worths),
    }
}
