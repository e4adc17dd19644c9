use crate::error::Result;
use crate::models::{DateRange, PriceSeries, TickerSymbol};
use std::future::Future;

/// Provider of daily adjusted-close history.
///
/// Implementations return `AppError::InvalidTicker` or `AppError::NoData` when a
/// symbol has nothing to offer; any other error is treated as a transport failure.
pub trait PriceSource: Send + Sync {
    fn daily_closes(
        &self,
        ticker: &TickerSymbol,
        range: DateRange,
    ) -> impl Future<Output = Result<PriceSeries>> + Send;
}

impl<S: PriceSource> PriceSource for std::sync::Arc<S> {
    fn daily_closes(
        &self,
        ticker: &TickerSymbol,
        range: DateRange,
    ) -> impl Future<Output = Result<PriceSeries>> + Send {
        (**self).daily_closes(ticker, range)
    }
}
