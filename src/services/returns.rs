use crate::error::Result;
use crate::models::{DateRange, MonthlyReturnMatrix, PriceSeries, TickerSymbol};
use crate::services::source::PriceSource;
use chrono::Datelike;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Calendar month bucket: (year, month)
type MonthKey = (i32, u32);

/// Builds Year × Month return matrices from daily price history
pub struct ReturnsExtractor;

impl ReturnsExtractor {
    /// Fetch a ticker's history and pivot its month-over-month returns.
    ///
    /// Errors from the source are returned as-is; callers decide whether
    /// `InvalidTicker`/`NoData` should degrade to an empty contribution.
    #[instrument(skip(source, ticker), fields(ticker = %ticker))]
    pub async fn get_monthly_returns<S: PriceSource>(
        source: &S,
        ticker: &TickerSymbol,
        range: DateRange,
    ) -> Result<MonthlyReturnMatrix> {
        let series = source.daily_closes(ticker, range).await?;
        debug!(points = series.len(), "Fetched daily series");

        let matrix = Self::monthly_returns(&series);
        debug!(years = matrix.len(), "Pivoted monthly returns");
        Ok(matrix)
    }

    /// Month-end resample, percentage change and pivot of a daily series.
    ///
    /// Every calendar month between the first and last observation gets a cell.
    /// A month without trades carries the previous close forward, so it shows a
    /// 0% change and the next traded month is measured against that carried close.
    pub fn monthly_returns(series: &PriceSeries) -> MonthlyReturnMatrix {
        let month_ends = Self::resample_month_end(series);
        let mut matrix = MonthlyReturnMatrix::new();

        let (Some(&first), Some(&last)) = (month_ends.keys().next(), month_ends.keys().next_back())
        else {
            return matrix;
        };

        let mut key = first;
        let mut carried: Option<f64> = None;
        while key <= last {
            let close = month_ends.get(&key).copied().or(carried);
            let change = match (close, carried) {
                (Some(close), Some(prev)) => Some(calculate_percent_change(close, prev)),
                _ => None,
            };
            matrix.insert(key.0, key.1, change);

            carried = close;
            key = next_month(key);
        }

        matrix
    }

    /// Last available close of every calendar month
    fn resample_month_end(series: &PriceSeries) -> BTreeMap<MonthKey, f64> {
        let mut buckets: BTreeMap<MonthKey, f64> = BTreeMap::new();

        // Series is sorted by date, so the last write per bucket is the month-end close
        for point in series.points() {
            buckets.insert((point.date.year(), point.date.month()), point.adj_close);
        }

        buckets
    }
}

fn next_month((year, month): MonthKey) -> MonthKey {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Percentage change from `previous` to `current`
fn calculate_percent_change(current: f64, previous: f64) -> f64 {
    (current / previous - 1.0) * 100.0
}
