//! OHLCV bar representation and fetch granularity types.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// One price bar as returned by the market-data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

const SESSIONS_PER_YEAR: f64 = 252.0;
const SESSION_HOURS: f64 = 6.5;

/// Bar granularity, in the provider's notation (`1m`, `1h`, `1d`, `1wk`, `1mo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Min(u32),
    Hour(u32),
    Day(u32),
    Week(u32),
    Month(u32),
}

impl Interval {
    pub fn parse(s: &str) -> Option<Interval> {
        let s = s.trim();
        let (digits, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit())?);
        let n: u32 = digits.parse().ok().filter(|&n| n > 0)?;
        match unit {
            "m" => Some(Interval::Min(n)),
            "h" => Some(Interval::Hour(n)),
            "d" => Some(Interval::Day(n)),
            "wk" => Some(Interval::Week(n)),
            "mo" => Some(Interval::Month(n)),
            _ => None,
        }
    }

    /// Number of bars in one year at this granularity, assuming 252 trading
    /// sessions of 6.5 hours. Used to annualize per-bar return series.
    pub fn bars_per_year(&self) -> f64 {
        match *self {
            Interval::Min(n) => SESSIONS_PER_YEAR * SESSION_HOURS * 60.0 / n as f64,
            Interval::Hour(n) => SESSIONS_PER_YEAR * SESSION_HOURS / n as f64,
            Interval::Day(n) => SESSIONS_PER_YEAR / n as f64,
            Interval::Week(n) => 52.0 / n as f64,
            Interval::Month(n) => 12.0 / n as f64,
        }
    }

    /// Maximum lookback the upstream provider serves at this granularity.
    /// Requests beyond it are clamped, never rejected.
    pub fn max_lookback(&self) -> Period {
        match self {
            Interval::Min(_) => Period::Days(7),
            Interval::Hour(_) => Period::Days(60),
            _ => Period::Years(1),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Min(n) => write!(f, "{n}m"),
            Interval::Hour(n) => write!(f, "{n}h"),
            Interval::Day(n) => write!(f, "{n}d"),
            Interval::Week(n) => write!(f, "{n}wk"),
            Interval::Month(n) => write!(f, "{n}mo"),
        }
    }
}

/// Lookback window for a fetch, in the provider's notation
/// (`7d`, `4wk`, `3mo`, `1y`, `ytd`, `max`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    Ytd,
    Max,
}

impl Period {
    pub fn parse(s: &str) -> Option<Period> {
        let s = s.trim();
        match s {
            "ytd" => return Some(Period::Ytd),
            "max" => return Some(Period::Max),
            _ => {}
        }
        let (digits, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit())?);
        let n: u32 = digits.parse().ok().filter(|&n| n > 0)?;
        match unit {
            "d" => Some(Period::Days(n)),
            "wk" => Some(Period::Weeks(n)),
            "mo" => Some(Period::Months(n)),
            "y" => Some(Period::Years(n)),
            _ => None,
        }
    }

    /// Upper bound on the window length in days, used for clamping. `Ytd` is
    /// treated as a full year since its true length depends on the calendar.
    fn approx_days(&self) -> f64 {
        match *self {
            Period::Days(n) => n as f64,
            Period::Weeks(n) => n as f64 * 7.0,
            Period::Months(n) => n as f64 * 30.44,
            Period::Years(n) => n as f64 * 365.25,
            Period::Ytd => 365.25,
            Period::Max => f64::INFINITY,
        }
    }

    /// Clamp this period to the provider's lookback limit for `interval`.
    pub fn clamp_for(self, interval: Interval) -> Period {
        let limit = interval.max_lookback();
        if self.approx_days() > limit.approx_days() {
            limit
        } else {
            self
        }
    }

    /// Resolve the window to a concrete UTC start instant.
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Period::Days(n) => now - Duration::days(n as i64),
            Period::Weeks(n) => now - Duration::weeks(n as i64),
            Period::Months(n) => now - chrono::Months::new(n),
            Period::Years(n) => now - chrono::Months::new(n * 12),
            Period::Ytd => Utc
                .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(now),
            Period::Max => Utc.timestamp_opt(0, 0).single().unwrap_or(now),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Weeks(n) => write!(f, "{n}wk"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
            Period::Ytd => write!(f, "ytd"),
            Period::Max => write!(f, "max"),
        }
    }
}
