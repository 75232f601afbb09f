//! Technical indicator computation over OHLCV series.
//!
//! Kernels return a series aligned with the input bars, with `NaN` during the
//! indicator's warm-up window. [`annotate`] evaluates every family across its
//! window sets, gap-fills each column forward then backward so no `NaN`
//! survives, and attaches the columns to the table.

pub mod trend;
pub mod momentum;
pub mod volatility;
pub mod volume;

use super::table::DataTable;

const WINDOWS: [usize; 10] = [5, 10, 14, 20, 30, 50, 60, 100, 150, 200];
const BOLLINGER_WINDOWS: [usize; 4] = [10, 20, 50, 100];
const ATR_WINDOWS: [usize; 4] = [7, 14, 21, 28];
const STOCHASTIC_WINDOWS: [usize; 3] = [5, 14, 21];
const CHANNEL_WINDOWS: [usize; 3] = [10, 20, 50];
const CCI_WINDOWS: [usize; 3] = [14, 20, 50];
const TRIX_WINDOWS: [usize; 2] = [15, 30];
const VOLUME_WINDOWS: [usize; 3] = [5, 10, 20];

/// Compute the full indicator set and attach it to `table`. Every resulting
/// column is dense: warm-up gaps are forward-filled, then the leading edge is
/// back-filled from the first computed value.
pub fn annotate(table: &mut DataTable) {
    let bars = table.bars().to_vec();
    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();

    for w in WINDOWS {
        columns.push((format!("sma_{w}"), trend::sma_close(&bars, w)));
        columns.push((format!("ema_{w}"), trend::ema_close(&bars, w)));
        columns.push((format!("wma_{w}"), trend::wma_close(&bars, w)));
        columns.push((format!("std_{w}"), volatility::rolling_stddev(&bars, w)));
        columns.push((format!("roc_{w}"), momentum::roc(&bars, w)));
        columns.push((format!("mom_{w}"), momentum::momentum(&bars, w)));
        columns.push((format!("rsi_{w}"), momentum::rsi(&bars, w)));
    }

    let (macd, signal, hist) = trend::macd(&bars, 12, 26, 9);
    columns.push(("macd".into(), macd));
    columns.push(("macd_signal".into(), signal));
    columns.push(("macd_hist".into(), hist));
    for w in TRIX_WINDOWS {
        columns.push((format!("trix_{w}"), trend::trix(&bars, w)));
    }
    for w in CHANNEL_WINDOWS {
        columns.push((format!("dpo_{w}"), trend::dpo(&bars, w)));
    }

    for w in STOCHASTIC_WINDOWS {
        let (k, d) = momentum::stochastic(&bars, w);
        columns.push((format!("stoch_k_{w}"), k));
        columns.push((format!("stoch_d_{w}"), d));
        columns.push((format!("willr_{w}"), momentum::williams_r(&bars, w)));
    }
    for w in CCI_WINDOWS {
        columns.push((format!("cci_{w}"), momentum::cci(&bars, w)));
    }

    for w in BOLLINGER_WINDOWS {
        let bb = volatility::bollinger(&bars, w, 2.0);
        columns.push((format!("bb_upper_{w}"), bb.upper));
        columns.push((format!("bb_mid_{w}"), bb.mid));
        columns.push((format!("bb_lower_{w}"), bb.lower));
        columns.push((format!("bb_width_{w}"), bb.width));
    }
    for w in ATR_WINDOWS {
        columns.push((format!("atr_{w}"), volatility::atr(&bars, w)));
    }
    for w in CHANNEL_WINDOWS {
        let dc = volatility::donchian(&bars, w);
        columns.push((format!("dc_upper_{w}"), dc.upper));
        columns.push((format!("dc_lower_{w}"), dc.lower));
        columns.push((format!("dc_mid_{w}"), dc.mid));
        let (kc_upper, kc_lower) = volatility::keltner(&bars, w);
        columns.push((format!("kc_upper_{w}"), kc_upper));
        columns.push((format!("kc_lower_{w}"), kc_lower));
    }

    columns.push(("obv".into(), volume::obv(&bars)));
    columns.push(("ad".into(), volume::ad_line(&bars)));
    columns.push(("vwap".into(), volume::vwap(&bars)));
    for w in CHANNEL_WINDOWS {
        columns.push((format!("cmf_{w}"), volume::cmf(&bars, w)));
    }
    for w in VOLUME_WINDOWS {
        columns.push((format!("vol_sma_{w}"), volume::volume_sma(&bars, w)));
        columns.push((format!("vol_roc_{w}"), volume::volume_roc(&bars, w)));
    }

    for (name, mut values) in columns {
        fill_gaps(&mut values);
        table.insert_column(&name, values);
    }
}

/// Forward-fill `NaN` gaps, then backward-fill whatever remains at the front.
/// A series with no finite value at all becomes all zeros.
pub fn fill_gaps(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
    let first = values.iter().copied().find(|v| !v.is_nan());
    let fill = first.unwrap_or(0.0);
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = fill;
        } else {
            break;
        }
    }
}

/// Apply `f` over each full window of `values`, skipping leading `NaN`s so
/// kernels compose (e.g. an EMA of an EMA). Output is `NaN` until the first
/// full window.
pub(crate) fn rolling<F: Fn(&[f64]) -> f64>(values: &[f64], window: usize, f: F) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let start = values
        .iter()
        .position(|v| !v.is_nan())
        .unwrap_or(values.len());
    if window == 0 || values.len() - start < window {
        return out;
    }
    for i in (start + window - 1)..values.len() {
        out[i] = f(&values[i + 1 - window..=i]);
    }
    out
}

pub(crate) fn sma(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// EMA seeded with the SMA of the first full window.
pub(crate) fn ema(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let start = values
        .iter()
        .position(|v| !v.is_nan())
        .unwrap_or(values.len());
    if window == 0 || values.len() - start < window {
        return out;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let seed_end = start + window;
    let mut prev = values[start..seed_end].iter().sum::<f64>() / window as f64;
    out[seed_end - 1] = prev;
    for i in seed_end..values.len() {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

pub(crate) fn closes(bars: &[super::bar::Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::{Bar, Interval};
    use chrono::{TimeZone, Utc};

    pub(crate) fn make_bars(closes: &[f64]) -> Vec<Bar> {
        closes
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
                volume: 1000.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn fill_gaps_forward_then_backward() {
        let mut values = vec![f64::NAN, f64::NAN, 3.0, f64::NAN, 5.0];
        fill_gaps(&mut values);
        assert_eq!(values, vec![3.0, 3.0, 3.0, 3.0, 5.0]);
    }

    #[test]
    fn fill_gaps_all_nan_becomes_zero() {
        let mut values = vec![f64::NAN, f64::NAN];
        fill_gaps(&mut values);
        assert_eq!(values, vec![0.0, 0.0]);
    }

    #[test]
    fn sma_warmup_and_values() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let out = sma(&values, 2);
        assert!(out[0].is_nan());
        assert!((out[1] - 1.5).abs() < 1e-9);
        assert!((out[3] - 3.5).abs() < 1e-9);
    }

    #[test]
    fn ema_seeded_with_sma() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let out = ema(&values, 3);
        assert!(out[1].is_nan());
        assert!((out[2] - 2.0).abs() < 1e-9);
        // alpha = 0.5: 0.5*4 + 0.5*2 = 3
        assert!((out[3] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn rolling_skips_leading_nan() {
        let values = [f64::NAN, f64::NAN, 1.0, 2.0, 3.0];
        let out = sma(&values, 2);
        assert!(out[2].is_nan());
        assert!((out[3] - 1.5).abs() < 1e-9);
        assert!((out[4] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn annotate_produces_dense_columns() {
        let bars = make_bars(&(1..=60).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let mut table = DataTable::new("QQQ", Interval::Day(1), bars);
        annotate(&mut table);

        assert!(table.column_count() > 100);
        for name in table.column_names() {
            let column = table.column(name).unwrap();
            assert!(
                column.iter().all(|v| v.is_finite()),
                "column {name} has non-finite values"
            );
        }
        // first row fully populated even for long-window indicators
        assert!(table.row(0).unwrap().indicator("sma_200").is_some());
    }

    #[test]
    fn annotate_empty_table_is_noop() {
        let mut table = DataTable::new("QQQ", Interval::Day(1), vec![]);
        annotate(&mut table);
        assert!(table.column_count() > 100);
        assert!(table.is_empty());
    }
}
