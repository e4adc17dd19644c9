use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Ticker symbol as understood by the data source (e.g. `AAPL`, `GGAL.BA`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Create a symbol from user input; surrounding whitespace is trimmed.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput("Ticker symbol cannot be empty".to_string()));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(AppError::InvalidInput(format!(
                "Ticker symbol '{}' contains whitespace or a comma",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated ticker list.
    ///
    /// Blank entries are ignored and duplicates collapse to their first occurrence,
    /// so the returned order is the order of first appearance.
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        let mut tickers: Vec<Self> = Vec::new();
        for part in input.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            let ticker = Self::new(part)?;
            if tickers.contains(&ticker) {
                warn!(ticker = %ticker, "Duplicate ticker ignored");
                continue;
            }
            tickers.push(ticker);
        }

        if tickers.is_empty() {
            return Err(AppError::InvalidInput("At least one ticker is required".to_string()));
        }

        Ok(tickers)
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims() {
        let ticker = TickerSymbol::new("  GGAL.BA ").unwrap();
        assert_eq!(ticker.as_str(), "GGAL.BA");
    }

    #[test]
    fn test_new_rejects_empty_and_whitespace() {
        assert!(TickerSymbol::new("   ").is_err());
        assert!(TickerSymbol::new("A B").is_err());
    }

    #[test]
    fn test_underscore_is_allowed() {
        // Column keys are structured, so the label separator is not reserved
        assert_eq!(TickerSymbol::new("BRK_B").unwrap().as_str(), "BRK_B");
    }

    #[test]
    fn test_parse_list() {
        let tickers = TickerSymbol::parse_list("GGAL.BA, YPFD.BA,,PAMP.BA ,GGAL.BA").unwrap();
        let names: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["GGAL.BA", "YPFD.BA", "PAMP.BA"]);
    }

    #[test]
    fn test_parse_list_empty() {
        assert!(matches!(
            TickerSymbol::parse_list(" , ,"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serialize_transparent() {
        let json = serde_json::to_string(&TickerSymbol::new("XYZ").unwrap()).unwrap();
        assert_eq!(json, r#""XYZ""#);
    }
}
