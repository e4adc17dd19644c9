use crate::error::{AppError, Result};
use crate::models::{AppConfig, DateRange, PricePoint, PriceSeries, TickerSymbol};
use crate::services::source::PriceSource;
use chrono::{DateTime, NaiveTime};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Longest pause between two attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC, in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Client for the Yahoo Finance v8 chart API
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl YahooClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.yahoo_base_url,
            timeout_secs = config.http_timeout.as_secs(),
            max_retries = config.max_retries,
            "Created YahooClient"
        );

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Chart URL for a ticker over a half-open date range
    fn chart_url(&self, ticker: &TickerSymbol, range: DateRange) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("base_url '{}' cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker.as_str()]);

        let period1 = range.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = range.end.and_time(NaiveTime::MIN).and_utc().timestamp();

        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div,split")
            .append_pair("includeAdjustedClose", "true");

        Ok(url)
    }

    /// GET with exponential backoff on network errors, 429 and 5xx
    async fn fetch_body(&self, ticker: &TickerSymbol, url: Url) -> Result<String> {
        let mut last_error: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>())
                    .min(MAX_BACKOFF);
                info!(
                    "Yahoo retry backoff for {}: attempt {}/{} - reason: {}, waiting {:.1}s before retry",
                    ticker,
                    attempt + 1,
                    self.max_retries + 1,
                    last_error.as_deref().unwrap_or("unknown error"),
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            debug!(attempt = attempt + 1, url = %url, "Requesting chart");

            let response = match self.client.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(format!("Network error: {}", e));
                    continue;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = Some(format!("Response body error: {}", e));
                    continue;
                }
            };

            if status.is_success() || status == StatusCode::NOT_FOUND {
                // Unknown symbols come back as 404 with a chart.error payload
                return Ok(body);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = Some("Too Many Requests (429) - rate limited".to_string());
                continue;
            }

            if status.is_server_error() {
                last_error = Some(format!("Server error ({})", status.as_u16()));
                continue;
            }

            // Other client errors are request problems, not worth retrying
            return Err(AppError::Network(format!(
                "Yahoo returned {} for {}",
                status, ticker
            )));
        }

        Err(AppError::Network(format!(
            "Max retries exceeded for {}: {}",
            ticker,
            last_error.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

impl PriceSource for YahooClient {
    #[instrument(skip(self, ticker), fields(ticker = %ticker))]
    async fn daily_closes(&self, ticker: &TickerSymbol, range: DateRange) -> Result<PriceSeries> {
        let url = self.chart_url(ticker, range)?;
        let body = self.fetch_body(ticker, url).await?;
        let series = parse_chart_response(ticker, &body, range)?;
        info!(points = series.len(), "Fetched daily closes");
        Ok(series)
    }
}

/// Decode a chart API payload into a daily adjusted-close series.
///
/// Falls back to the raw close when no adjusted close is published. Null
/// prices (halts, holidays) are dropped.
fn parse_chart_response(ticker: &TickerSymbol, body: &str, range: DateRange) -> Result<PriceSeries> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Parse(format!("Failed to parse chart for {}: {}", ticker, e)))?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Err(AppError::InvalidTicker(ticker.to_string()));
        }
        return Err(AppError::Network(format!(
            "Yahoo error for {}: {} ({})",
            ticker,
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AppError::InvalidTicker(ticker.to_string()))?;

    if result.timestamp.is_empty() {
        return Err(AppError::NoData(ticker.to_string()));
    }

    let prices: Vec<Option<f64>> = match result.indicators.adjclose.into_iter().next() {
        Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
        _ => {
            warn!(ticker = %ticker, "No adjusted close published, using raw close");
            result
                .indicators
                .quote
                .into_iter()
                .next()
                .map(|q| q.close)
                .unwrap_or_default()
        }
    };

    if prices.len() != result.timestamp.len() {
        return Err(AppError::Parse(format!(
            "Chart for {} has {} timestamps but {} prices",
            ticker,
            result.timestamp.len(),
            prices.len()
        )));
    }

    let offset = result.meta.gmtoffset;
    let points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(prices)
        .filter_map(|(ts, price)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            let price = price?;
            range.contains(date).then(|| PricePoint::new(date, price))
        })
        .collect();

    let series = PriceSeries::new(points);
    if series.is_empty() {
        return Err(AppError::NoData(ticker.to_string()));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ticker(s: &str) -> TickerSymbol {
        TickerSymbol::new(s).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-01-02 and 2024-01-03 at 14:30 UTC, 2024-01-04 (null price)
    const CHART_OK: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "XYZ", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{ "close": [101.0, 102.0, null] }],
                    "adjclose": [{ "adjclose": [100.5, 101.5, null] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_uses_adjusted_close() {
        let series = parse_chart_response(&ticker("XYZ"), CHART_OK, DateRange::default()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0], PricePoint::new(day(2024, 1, 2), 100.5));
        assert_eq!(series.points()[1], PricePoint::new(day(2024, 1, 3), 101.5));
    }

    #[test]
    fn test_parse_falls_back_to_close() {
        let body = CHART_OK.replace(r#""adjclose": [{ "adjclose": [100.5, 101.5, null] }]"#, r#""adjclose": []"#);
        let series = parse_chart_response(&ticker("XYZ"), &body, DateRange::default()).unwrap();

        assert_eq!(series.points()[0].adj_close, 101.0);
    }

    #[test]
    fn test_parse_applies_exchange_offset() {
        // 2024-01-02 02:00 UTC is still Jan 1 in New York
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},
            "timestamp":[1704160800],
            "indicators":{"quote":[{"close":[10.0]}],"adjclose":[{"adjclose":[10.0]}]}}],"error":null}}"#;
        let series = parse_chart_response(&ticker("XYZ"), body, DateRange::default()).unwrap();

        assert_eq!(series.first_date(), Some(day(2024, 1, 1)));
    }

    #[test]
    fn test_parse_not_found_is_invalid_ticker() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let result = parse_chart_response(&ticker("NOPE"), body, DateRange::default());

        assert!(matches!(result, Err(AppError::InvalidTicker(t)) if t == "NOPE"));
    }

    #[test]
    fn test_parse_empty_timestamps_is_no_data() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let result = parse_chart_response(&ticker("XYZ"), body, DateRange::default());

        assert!(matches!(result, Err(AppError::NoData(_))));
    }

    #[test]
    fn test_parse_out_of_range_points_dropped() {
        let range = DateRange::new(day(2024, 1, 3), day(2024, 2, 1)).unwrap();
        let series = parse_chart_response(&ticker("XYZ"), CHART_OK, range).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.first_date(), Some(day(2024, 1, 3)));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let result = parse_chart_response(&ticker("XYZ"), "<html>", DateRange::default());
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_chart_url() {
        let config = AppConfig {
            yahoo_base_url: "http://localhost:3000".to_string(),
            ..AppConfig::default()
        };
        let client = YahooClient::new(&config).unwrap();
        let url = client.chart_url(&ticker("GGAL.BA"), DateRange::default()).unwrap();

        assert_eq!(url.path(), "/v8/finance/chart/GGAL.BA");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("period1".to_string(), "1072915200".to_string())));
        assert!(query.contains(&("period2".to_string(), "1724544000".to_string())));
        assert!(query.contains(&("interval".to_string(), "1d".to_string())));
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        let client = YahooClient::new(&AppConfig::default()).unwrap();
        let url = client.chart_url(&ticker("BRK/B"), DateRange::default()).unwrap();

        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB");
    }
}
