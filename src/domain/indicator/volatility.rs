//! Volatility-family indicators: rolling stddev, Bollinger, ATR, channels.

use super::{closes, ema, rolling, sma};
use crate::domain::bar::Bar;

/// Rolling population standard deviation of closes.
pub fn rolling_stddev(bars: &[Bar], window: usize) -> Vec<f64> {
    rolling(&closes(bars), window, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / w.len() as f64;
        variance.sqrt()
    })
}

pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub mid: Vec<f64>,
    pub lower: Vec<f64>,
    pub width: Vec<f64>,
}

pub fn bollinger(bars: &[Bar], window: usize, k: f64) -> BollingerBands {
    let mid = sma(&closes(bars), window);
    let stddev = rolling_stddev(bars, window);

    let upper: Vec<f64> = mid.iter().zip(&stddev).map(|(m, s)| m + k * s).collect();
    let lower: Vec<f64> = mid.iter().zip(&stddev).map(|(m, s)| m - k * s).collect();
    let width: Vec<f64> = upper
        .iter()
        .zip(&lower)
        .zip(&mid)
        .map(|((u, l), m)| if *m != 0.0 { (u - l) / m } else { f64::NAN })
        .collect();

    BollingerBands {
        upper,
        mid,
        lower,
        width,
    }
}

/// Average true range with Wilder's smoothing: seeded with the simple mean of
/// the first `window` true ranges, then
/// atr = (prev_atr * (window-1) + tr) / window.
pub fn atr(bars: &[Bar], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if window == 0 || bars.len() < window {
        return out;
    }

    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            tr.push(bar.high - bar.low);
        } else {
            tr.push(bar.true_range(bars[i - 1].close));
        }
    }

    let mut prev = tr[..window].iter().sum::<f64>() / window as f64;
    out[window - 1] = prev;
    for i in window..bars.len() {
        prev = (prev * (window - 1) as f64 + tr[i]) / window as f64;
        out[i] = prev;
    }
    out
}

pub struct DonchianChannel {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub mid: Vec<f64>,
}

pub fn donchian(bars: &[Bar], window: usize) -> DonchianChannel {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let upper = rolling(&highs, window, |w| w.iter().copied().fold(f64::MIN, f64::max));
    let lower = rolling(&lows, window, |w| w.iter().copied().fold(f64::MAX, f64::min));
    let mid: Vec<f64> = upper
        .iter()
        .zip(&lower)
        .map(|(u, l)| (u + l) / 2.0)
        .collect();

    DonchianChannel { upper, lower, mid }
}

/// Keltner channel: EMA of closes shifted by twice the ATR.
pub fn keltner(bars: &[Bar], window: usize) -> (Vec<f64>, Vec<f64>) {
    let mid = ema(&closes(bars), window);
    let atr = atr(bars, window);

    let upper: Vec<f64> = mid.iter().zip(&atr).map(|(m, a)| m + 2.0 * a).collect();
    let lower: Vec<f64> = mid.iter().zip(&atr).map(|(m, a)| m - 2.0 * a).collect();
    (upper, lower)
}
