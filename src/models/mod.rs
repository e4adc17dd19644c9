mod app_config;
mod matrix;
mod month_filter;
mod price;
mod ticker;

pub use app_config::{AppConfig, DateRange};
pub use matrix::{ColumnKey, CombinedMatrix, FormattedCell, MonthlyReturnMatrix, SkippedTicker};
pub use month_filter::MonthFilter;
pub use price::{PricePoint, PriceSeries};
pub use ticker::TickerSymbol;
