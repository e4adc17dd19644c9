//! Pipeline constants
//!
//! Defaults for the history window, matrix shape and the web form.

/// First day of the default history window (inclusive)
pub const HISTORY_START: &str = "2004-01-01";

/// Last day of the default history window (exclusive)
pub const HISTORY_END: &str = "2024-08-25";

/// Rows kept per ticker after the pivot (most recent years)
pub const ROW_WINDOW: usize = 30;

/// Separator used in column labels: `{month}_{ticker}`
pub const COLUMN_LABEL_SEPARATOR: char = '_';

/// Tickers pre-filled in the web form
pub const DEFAULT_TICKERS: &str = "GGAL.BA,YPFD.BA,PAMP.BA";

/// Months pre-selected in the web form
pub const DEFAULT_MONTHS: &[u32] = &[9];

/// Return (in percent) at or above which cell text switches to white.
///
/// Background channels are clamped at ±100%, so from here on the cell is pure green.
pub const WHITE_TEXT_THRESHOLD: f64 = 100.5;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 9876;

/// Yahoo Finance chart API host
pub const YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Default series cache TTL
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default request timeout for the data source
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default retry budget per ticker fetch
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;

/// Spanish month names used for the form and table headers
pub const MONTH_NAMES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];
