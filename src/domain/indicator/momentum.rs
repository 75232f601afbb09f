//! Momentum-family indicators: RSI, ROC, stochastic, Williams %R, CCI.
//!
//! RSI uses Wilder's smoothing for average gain/loss:
//! - first average: simple mean over the first `window` changes
//! - subsequent: avg = (prev_avg * (window-1) + current) / window

use super::{closes, sma};
use crate::domain::bar::Bar;

pub fn rsi(bars: &[Bar], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if window == 0 || bars.len() <= window {
        return out;
    }

    let closes = closes(bars);
    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = gains[..window].iter().sum::<f64>() / window as f64;
    let mut avg_loss = losses[..window].iter().sum::<f64>() / window as f64;
    out[window] = rsi_value(avg_gain, avg_loss);

    for i in (window + 1)..closes.len() {
        let idx = i - 1;
        avg_gain = (avg_gain * (window - 1) as f64 + gains[idx]) / window as f64;
        avg_loss = (avg_loss * (window - 1) as f64 + losses[idx]) / window as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Rate of change over `window` bars, in percent.
pub fn roc(bars: &[Bar], window: usize) -> Vec<f64> {
    let closes = closes(bars);
    let mut out = vec![f64::NAN; bars.len()];
    for i in window..bars.len() {
        let base = closes[i - window];
        if base != 0.0 {
            out[i] = (closes[i] / base - 1.0) * 100.0;
        }
    }
    out
}

/// Absolute price change over `window` bars.
pub fn momentum(bars: &[Bar], window: usize) -> Vec<f64> {
    let closes = closes(bars);
    let mut out = vec![f64::NAN; bars.len()];
    for i in window..bars.len() {
        out[i] = closes[i] - closes[i - window];
    }
    out
}

/// Stochastic oscillator: %K over `window`, %D as a 3-bar SMA of %K.
pub fn stochastic(bars: &[Bar], window: usize) -> (Vec<f64>, Vec<f64>) {
    let mut k = vec![f64::NAN; bars.len()];
    if window == 0 {
        return (k.clone(), k);
    }
    for i in (window.saturating_sub(1))..bars.len() {
        let slice = &bars[i + 1 - window..=i];
        let hh = slice.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let ll = slice.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        k[i] = if hh > ll {
            100.0 * (bars[i].close - ll) / (hh - ll)
        } else {
            50.0
        };
    }
    let d = sma(&k, 3);
    (k, d)
}

/// Williams %R: the stochastic %K reflected into [-100, 0].
pub fn williams_r(bars: &[Bar], window: usize) -> Vec<f64> {
    let (k, _) = stochastic(bars, window);
    k.iter().map(|v| v - 100.0).collect()
}

/// Commodity channel index over the typical price.
pub fn cci(bars: &[Bar], window: usize) -> Vec<f64> {
    let tp: Vec<f64> = bars.iter().map(|b| b.typical_price()).collect();
    super::rolling(&tp, window, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let mean_dev = w.iter().map(|v| (v - mean).abs()).sum::<f64>() / w.len() as f64;
        if mean_dev == 0.0 {
            0.0
        } else {
            (w[w.len() - 1] - mean) / (0.015 * mean_dev)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests::make_bars;

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let out = rsi(&bars, 14);
        assert!(out[13].is_nan());
        assert!((out[14] - 100.0).abs() < 1e-9);
        assert!((out[19] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_balanced_alternation_is_near_50() {
        let closes: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let bars = make_bars(&closes);
        let out = rsi(&bars, 14);
        assert!((out[29] - 50.0).abs() < 10.0);
    }

    #[test]
    fn roc_and_momentum() {
        let bars = make_bars(&[100.0, 102.0, 110.0]);
        let roc_out = roc(&bars, 2);
        assert!(roc_out[1].is_nan());
        assert!((roc_out[2] - 10.0).abs() < 1e-9);

        let mom_out = momentum(&bars, 2);
        assert!((mom_out[2] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_bounds() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 7) as f64).collect();
        let bars = make_bars(&closes);
        let (k, d) = stochastic(&bars, 14);
        for i in 16..30 {
            assert!((0.0..=100.0).contains(&k[i]));
            assert!((0.0..=100.0).contains(&d[i]));
        }
    }

    #[test]
    fn williams_r_is_reflected_stochastic() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let (k, _) = stochastic(&bars, 14);
        let wr = williams_r(&bars, 14);
        assert!((wr[19] - (k[19] - 100.0)).abs() < 1e-9);
        assert!(wr[19] <= 0.0);
    }

    #[test]
    fn cci_flat_series_is_zero() {
        let bars = make_bars(&[100.0; 25]);
        let out = cci(&bars, 20);
        assert!((out[24]).abs() < 1e-9);
    }
}
