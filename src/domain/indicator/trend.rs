//! Trend-family indicators: moving averages, MACD, TRIX, DPO.

use super::{closes, ema, sma};
use crate::domain::bar::Bar;

pub fn sma_close(bars: &[Bar], window: usize) -> Vec<f64> {
    sma(&closes(bars), window)
}

pub fn ema_close(bars: &[Bar], window: usize) -> Vec<f64> {
    ema(&closes(bars), window)
}

/// Linearly weighted moving average, most recent bar weighted highest.
pub fn wma_close(bars: &[Bar], window: usize) -> Vec<f64> {
    super::rolling(&closes(bars), window, |w| {
        let denom = (w.len() * (w.len() + 1)) as f64 / 2.0;
        w.iter()
            .enumerate()
            .map(|(i, v)| (i as f64 + 1.0) * v)
            .sum::<f64>()
            / denom
    })
}

/// MACD line, signal line and histogram.
pub fn macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let closes = closes(bars);
    let fast_ema = ema(&closes, fast);
    let slow_ema = ema(&closes, slow);

    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram: Vec<f64> = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();

    (line, signal_line, histogram)
}

/// Rate of change of a triple-smoothed EMA, in percent.
pub fn trix(bars: &[Bar], window: usize) -> Vec<f64> {
    let e1 = ema(&closes(bars), window);
    let e2 = ema(&e1, window);
    let e3 = ema(&e2, window);

    let mut out = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let prev = e3[i - 1];
        if prev.is_nan() || e3[i].is_nan() || prev == 0.0 {
            continue;
        }
        out[i] = (e3[i] / prev - 1.0) * 100.0;
    }
    out
}

/// Detrended price oscillator: close minus a displaced moving average.
pub fn dpo(bars: &[Bar], window: usize) -> Vec<f64> {
    let closes = closes(bars);
    let ma = sma(&closes, window);
    let shift = window / 2 + 1;

    let mut out = vec![f64::NAN; bars.len()];
    for i in shift..bars.len() {
        if !ma[i - shift].is_nan() {
            out[i] = closes[i] - ma[i - shift];
        }
    }
    out
}
