use crate::error::{AppError, Result};
use crate::models::{
    ColumnKey, CombinedMatrix, DateRange, FormattedCell, MonthFilter, MonthlyReturnMatrix,
    SkippedTicker, TickerSymbol,
};
use crate::services::format::format_cell;
use crate::services::returns::ReturnsExtractor;
use crate::services::source::PriceSource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

/// Options for building a combined matrix
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// History window fetched per ticker
    pub range: DateRange,

    /// Rows kept per ticker (most recent years)
    pub row_window: usize,

    /// Months to keep
    pub months: MonthFilter,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            row_window: crate::constants::ROW_WINDOW,
            months: MonthFilter::all(),
        }
    }
}

/// Fetch every ticker and join their return matrices side by side.
///
/// Tickers are fetched one after another. A ticker the source does not know
/// (or that has no data) is skipped and reported in `CombinedMatrix::skipped`;
/// any other source error aborts the whole run.
#[instrument(skip(source, tickers), fields(tickers = tickers.len()))]
pub async fn create_combined_matrix<S: PriceSource>(
    source: &S,
    tickers: &[TickerSymbol],
    options: &CombineOptions,
) -> Result<CombinedMatrix> {
    if tickers.is_empty() {
        return Err(AppError::InvalidInput("At least one ticker is required".to_string()));
    }

    let mut matrices: Vec<(TickerSymbol, MonthlyReturnMatrix)> = Vec::with_capacity(tickers.len());
    let mut skipped: Vec<SkippedTicker> = Vec::new();

    for ticker in tickers {
        if matrices.iter().any(|(t, _)| t == ticker) || skipped.iter().any(|s| &s.ticker == ticker) {
            warn!(ticker = %ticker, "Duplicate ticker ignored");
            continue;
        }

        match ReturnsExtractor::get_monthly_returns(source, ticker, options.range).await {
            Ok(matrix) if matrix.is_empty() => {
                warn!(ticker = %ticker, "No monthly data, skipping ticker");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: "no data in range".to_string(),
                });
            }
            Ok(matrix) => {
                matrices.push((ticker.clone(), matrix.tail(options.row_window)));
            }
            Err(e) if e.is_empty_contribution() => {
                warn!(ticker = %ticker, error = %e, "Skipping ticker");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let combined = combine(&matrices, &options.months, skipped);
    info!(
        columns = combined.columns().len(),
        years = combined.years().len(),
        skipped = combined.skipped().len(),
        "Combined matrix ready"
    );
    Ok(combined)
}

/// Outer-join already truncated matrices on year and format their cells
pub fn combine(
    matrices: &[(TickerSymbol, MonthlyReturnMatrix)],
    months: &MonthFilter,
    skipped: Vec<SkippedTicker>,
) -> CombinedMatrix {
    let all_months: BTreeSet<u32> = matrices
        .iter()
        .flat_map(|(_, matrix)| matrix.months())
        .collect();

    // Tickers outer, months inner
    let mut columns: Vec<ColumnKey> = Vec::new();
    for (ticker, _) in matrices {
        for month in all_months.iter().filter(|m| months.contains(**m)) {
            columns.push(ColumnKey::new(*month, ticker.clone()));
        }
    }

    let years: BTreeSet<i32> = matrices
        .iter()
        .flat_map(|(_, matrix)| matrix.years())
        .collect();

    let rows: BTreeMap<i32, Vec<Option<FormattedCell>>> = years
        .into_iter()
        .map(|year| {
            let row = columns
                .iter()
                .map(|column| {
                    matrices
                        .iter()
                        .find(|(ticker, _)| *ticker == column.ticker)
                        .and_then(|(_, matrix)| matrix.get(year, column.month))
                        .map(format_cell)
                })
                .collect();
            (year, row)
        })
        .collect();

    CombinedMatrix::new(columns, rows, skipped)
}
