//! Volume-family indicators: OBV, A/D line, CMF, VWAP.

use super::{rolling, sma};
use crate::domain::bar::Bar;

/// On-balance volume, cumulative from zero.
pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut acc = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            if bar.close > bars[i - 1].close {
                acc += bar.volume;
            } else if bar.close < bars[i - 1].close {
                acc -= bar.volume;
            }
        }
        out.push(acc);
    }
    out
}

fn close_location_value(bar: &Bar) -> f64 {
    let range = bar.high - bar.low;
    if range == 0.0 {
        0.0
    } else {
        ((bar.close - bar.low) - (bar.high - bar.close)) / range
    }
}

/// Accumulation/distribution line, cumulative from zero.
pub fn ad_line(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut acc = 0.0;
    for bar in bars {
        acc += close_location_value(bar) * bar.volume;
        out.push(acc);
    }
    out
}

/// Chaikin money flow: money-flow volume over raw volume within the window.
pub fn cmf(bars: &[Bar], window: usize) -> Vec<f64> {
    let mfv: Vec<f64> = bars
        .iter()
        .map(|b| close_location_value(b) * b.volume)
        .collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let mfv_sum = rolling(&mfv, window, |w| w.iter().sum());
    let vol_sum = rolling(&volumes, window, |w| w.iter().sum());

    mfv_sum
        .iter()
        .zip(&vol_sum)
        .map(|(m, v)| if *v != 0.0 { m / v } else { 0.0 })
        .collect()
}

/// Volume-weighted average price, cumulative over the table.
pub fn vwap(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut pv = 0.0;
    let mut vol = 0.0;
    for bar in bars {
        pv += bar.typical_price() * bar.volume;
        vol += bar.volume;
        out.push(if vol != 0.0 { pv / vol } else { f64::NAN });
    }
    out
}

pub fn volume_sma(bars: &[Bar], window: usize) -> Vec<f64> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    sma(&volumes, window)
}

/// Rate of change of volume over `window` bars, in percent.
pub fn volume_roc(bars: &[Bar], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    for i in window..bars.len() {
        let base = bars[i - window].volume;
        if base != 0.0 {
            out[i] = (bars[i].volume / base - 1.0) * 100.0;
        }
    }
    out
}
