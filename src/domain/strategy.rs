//! The per-row strategy seam.
//!
//! A [`RowStrategy`] is the pure half of the strategy boundary: one annotated
//! row in, one signal out. The full custom-iteration override lives with the
//! orchestrator, which owns the context such strategies need.

use super::error::BotError;
use super::signal::Signal;
use super::table::Row;

pub trait RowStrategy {
    fn signal(&self, row: Row<'_>) -> Result<Signal, BotError>;
}

/// Closure adapter, mostly for tests and small inline strategies.
pub struct RowFn<F>(pub F)
where
    F: Fn(Row<'_>) -> Result<Signal, BotError>;

impl<F> RowStrategy for RowFn<F>
where
    F: Fn(Row<'_>) -> Result<Signal, BotError>,
{
    fn signal(&self, row: Row<'_>) -> Result<Signal, BotError> {
        (self.0)(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::{Bar, Interval};
    use crate::domain::table::DataTable;
    use chrono::{TimeZone, Utc};

    #[test]
    fn row_fn_adapts_closures() {
        let bars = vec![Bar {
            symbol: "QQQ".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1000.0,
        }];
        let table = DataTable::new("QQQ", Interval::Day(1), bars);

        let strategy = RowFn(|row: Row<'_>| {
            Ok(if row.close() >= 100.0 {
                Signal::Buy
            } else {
                Signal::Hold
            })
        });
        let boxed: Box<dyn RowStrategy> = Box::new(strategy);
        assert_eq!(boxed.signal(table.row(0).unwrap()).unwrap(), Signal::Buy);
    }
}
