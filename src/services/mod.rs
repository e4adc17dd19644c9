pub mod cache;
pub mod colorizer;
pub mod combiner;
pub mod format;
pub mod returns;
pub mod source;
pub mod yahoo;

pub use cache::{CacheStats, CachedSource, SharedSource};
pub use colorizer::{color_map, Background, CellStyle, TextColor};
pub use combiner::{combine, create_combined_matrix, CombineOptions};
pub use format::{format_cell, format_value, parse_value};
pub use returns::ReturnsExtractor;
pub use source::PriceSource;
pub use yahoo::YahooClient;
