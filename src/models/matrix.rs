use crate::constants::COLUMN_LABEL_SEPARATOR;
use crate::models::TickerSymbol;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Year × Month table of percentage returns for one ticker.
///
/// A key is present for every observed (year, month); the value is `None` when
/// the month has no prior month to compare against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyReturnMatrix {
    rows: BTreeMap<i32, BTreeMap<u32, Option<f64>>>,
}

impl MonthlyReturnMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed month. Inserting the same key twice keeps the last value.
    pub fn insert(&mut self, year: i32, month: u32, value: Option<f64>) {
        debug_assert!((1..=12).contains(&month), "month out of range: {}", month);
        self.rows.entry(year).or_default().insert(month, value);
    }

    /// Return for (year, month), if observed and computable
    pub fn get(&self, year: i32, month: u32) -> Option<f64> {
        self.rows.get(&year).and_then(|row| row.get(&month)).copied().flatten()
    }

    /// Row years in ascending order
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.keys().copied()
    }

    /// Union of observed months across all rows, ascending
    pub fn months(&self) -> BTreeSet<u32> {
        self.rows.values().flat_map(|row| row.keys().copied()).collect()
    }

    /// Number of year rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only the most recent `n` year rows
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.rows.len().saturating_sub(n);
        Self {
            rows: self
                .rows
                .iter()
                .skip(skip)
                .map(|(year, row)| (*year, row.clone()))
                .collect(),
        }
    }
}

/// Column of the combined matrix: one (month, ticker) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnKey {
    pub month: u32,
    pub ticker: TickerSymbol,
}

impl ColumnKey {
    pub fn new(month: u32, ticker: TickerSymbol) -> Self {
        Self { month, ticker }
    }

    /// Display label, e.g. `9_GGAL.BA`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.month, COLUMN_LABEL_SEPARATOR, self.ticker)
    }
}

/// Display string for one numeric cell (`-3,40`), with the value it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedCell {
    text: String,
    value: f64,
}

impl FormattedCell {
    pub(crate) fn new(text: String, value: f64) -> Self {
        Self { text, value }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for FormattedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Ticker that contributed nothing to the combined matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTicker {
    pub ticker: TickerSymbol,
    pub reason: String,
}

/// Outer join (by year) of per-ticker matrices, with formatted cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedMatrix {
    columns: Vec<ColumnKey>,
    rows: BTreeMap<i32, Vec<Option<FormattedCell>>>,
    skipped: Vec<SkippedTicker>,
}

impl CombinedMatrix {
    pub(crate) fn new(
        columns: Vec<ColumnKey>,
        rows: BTreeMap<i32, Vec<Option<FormattedCell>>>,
        skipped: Vec<SkippedTicker>,
    ) -> Self {
        debug_assert!(rows.values().all(|row| row.len() == columns.len()));
        Self { columns, rows, skipped }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.columns.iter().map(ColumnKey::label).collect()
    }

    /// Row years in ascending order
    pub fn years(&self) -> Vec<i32> {
        self.rows.keys().copied().collect()
    }

    /// Year index rendered without thousands separators
    pub fn year_labels(&self) -> Vec<String> {
        self.rows.keys().map(|year| year.to_string()).collect()
    }

    /// Rows in ascending year order
    pub fn rows(&self) -> impl Iterator<Item = (i32, &[Option<FormattedCell>])> + '_ {
        self.rows.iter().map(|(year, row)| (*year, row.as_slice()))
    }

    pub fn cell(&self, year: i32, column: &ColumnKey) -> Option<&FormattedCell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&year)?.get(idx)?.as_ref()
    }

    pub fn skipped(&self) -> &[SkippedTicker] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(s: &str) -> TickerSymbol {
        TickerSymbol::new(s).unwrap()
    }

    #[test]
    fn test_matrix_insert_and_get() {
        let mut matrix = MonthlyReturnMatrix::new();
        matrix.insert(2020, 1, None);
        matrix.insert(2020, 2, Some(10.0));

        assert_eq!(matrix.get(2020, 1), None);
        assert_eq!(matrix.get(2020, 2), Some(10.0));
        assert_eq!(matrix.get(2021, 2), None);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.months().into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_tail_keeps_most_recent_years() {
        let mut matrix = MonthlyReturnMatrix::new();
        for year in 1990..2000 {
            matrix.insert(year, 6, Some(1.0));
        }

        let tail = matrix.tail(3);
        assert_eq!(tail.years().collect::<Vec<_>>(), vec![1997, 1998, 1999]);

        let all = matrix.tail(100);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_column_label() {
        let key = ColumnKey::new(9, ticker("GGAL.BA"));
        assert_eq!(key.label(), "9_GGAL.BA");
        assert_eq!(key.to_string(), "9_GGAL.BA");
    }

    #[test]
    fn test_combined_cell_lookup() {
        let columns = vec![ColumnKey::new(1, ticker("A")), ColumnKey::new(1, ticker("B"))];
        let mut rows = BTreeMap::new();
        rows.insert(
            2021,
            vec![Some(FormattedCell::new("1,00".to_string(), 1.0)), None],
        );
        let combined = CombinedMatrix::new(columns.clone(), rows, Vec::new());

        assert_eq!(combined.cell(2021, &columns[0]).map(|c| c.text()), Some("1,00"));
        assert!(combined.cell(2021, &columns[1]).is_none());
        assert!(combined.cell(2020, &columns[0]).is_none());
        assert_eq!(combined.year_labels(), vec!["2021".to_string()]);
        assert_eq!(combined.column_labels(), vec!["1_A".to_string(), "1_B".to_string()]);
    }
}
