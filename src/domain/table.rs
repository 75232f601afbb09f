//! Annotated market-data table: ordered bars plus named indicator columns.
//!
//! Columns are stored column-major and stay aligned with the bar sequence;
//! strategies read through the borrowed [`Row`] view and never mutate the
//! table.

use std::collections::BTreeMap;

use super::bar::{Bar, Interval};

#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl DataTable {
    /// Build a table from raw bars, ordered by timestamp.
    pub fn new(symbol: &str, interval: Interval, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        DataTable {
            symbol: symbol.to_string(),
            interval,
            bars,
            columns: BTreeMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        if index < self.bars.len() {
            Some(Row { table: self, index })
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.bars.len()).map(|index| Row { table: self, index })
    }

    /// Latest close, if the table has any rows.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Attach a named column. The series must be aligned with the bars.
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) {
        assert_eq!(values.len(), self.bars.len(), "column {name} misaligned");
        self.columns.insert(name.to_string(), values);
    }

    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.get(index)).copied()
    }
}

/// Borrowed view of one annotated row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a DataTable,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn symbol(&self) -> &'a str {
        &self.table.bars[self.index].symbol
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.table.bars[self.index].timestamp
    }

    pub fn open(&self) -> f64 {
        self.table.bars[self.index].open
    }

    pub fn high(&self) -> f64 {
        self.table.bars[self.index].high
    }

    pub fn low(&self) -> f64 {
        self.table.bars[self.index].low
    }

    pub fn close(&self) -> f64 {
        self.table.bars[self.index].close
    }

    pub fn volume(&self) -> f64 {
        self.table.bars[self.index].volume
    }

    /// Named indicator value at this row.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.table.value(name, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
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
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn bars_are_sorted_by_timestamp() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars.reverse();
        let table = DataTable::new("QQQ", Interval::Day(1), bars);
        let closes: Vec<f64> = table.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn row_view_reads_bar_fields() {
        let table = DataTable::new("QQQ", Interval::Day(1), make_bars(&[100.0, 101.0]));
        let row = table.row(1).unwrap();
        assert_eq!(row.symbol(), "QQQ");
        assert!((row.close() - 101.0).abs() < f64::EPSILON);
        assert!((row.high() - 102.0).abs() < f64::EPSILON);
        assert!(table.row(2).is_none());
    }

    #[test]
    fn columns_round_trip() {
        let mut table = DataTable::new("QQQ", Interval::Day(1), make_bars(&[1.0, 2.0, 3.0]));
        table.insert_column("sma_2", vec![1.0, 1.5, 2.5]);

        assert_eq!(table.column_count(), 1);
        assert_eq!(table.column("sma_2").unwrap(), &[1.0, 1.5, 2.5]);
        assert!((table.row(2).unwrap().indicator("sma_2").unwrap() - 2.5).abs() < 1e-9);
        assert!(table.row(0).unwrap().indicator("missing").is_none());
    }

    #[test]
    fn last_close() {
        let table = DataTable::new("QQQ", Interval::Day(1), make_bars(&[1.0, 2.0, 9.0]));
        assert!((table.last_close().unwrap() - 9.0).abs() < f64::EPSILON);
        let empty = DataTable::new("QQQ", Interval::Day(1), vec![]);
        assert!(empty.last_close().is_none());
    }
}
