//! Market-data provider port trait.

use crate::domain::bar::{Bar, Interval, Period};
use crate::domain::error::BotError;

/// Pure query capability over an external OHLCV source. Implementations
/// return bars ordered by timestamp covering at most the requested lookback.
pub trait MarketDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, BotError>;
}
