use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Optional set of calendar months (1-12) to keep in the combined matrix.
///
/// `MonthFilter::all()` keeps every month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MonthFilter(Option<BTreeSet<u32>>);

impl MonthFilter {
    /// Keep every month
    pub fn all() -> Self {
        Self(None)
    }

    /// Keep only the given months
    pub fn only<I: IntoIterator<Item = u32>>(months: I) -> Result<Self> {
        let mut set = BTreeSet::new();
        for month in months {
            if !(1..=12).contains(&month) {
                return Err(AppError::MalformedMonthFilter(format!(
                    "{} is not a month (expected 1-12)",
                    month
                )));
            }
            set.insert(month);
        }
        Ok(Self(Some(set)))
    }

    /// Parse month tokens as sent by the web form or the CLI.
    ///
    /// Each token may itself be a comma-separated list (`"9,10"`); blank tokens are skipped.
    /// No tokens at all means "all months".
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut months = Vec::new();
        for token in tokens {
            for part in token.as_ref().split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let month = part.parse::<u32>().map_err(|_| {
                    AppError::MalformedMonthFilter(format!("'{}' is not an integer month", part))
                })?;
                months.push(month);
            }
        }

        if months.is_empty() {
            return Ok(Self::all());
        }

        Self::only(months)
    }

    pub fn contains(&self, month: u32) -> bool {
        match &self.0 {
            Some(set) => set.contains(&month),
            None => (1..=12).contains(&month),
        }
    }

    pub fn is_all(&self) -> bool {
        self.0.is_none()
    }

    /// Selected months in ascending order (all twelve when unfiltered)
    pub fn months(&self) -> Vec<u32> {
        match &self.0 {
            Some(set) => set.iter().copied().collect(),
            None => (1..=12).collect(),
        }
    }
}
