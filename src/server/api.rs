use crate::error::{AppError, Result};
use crate::models::{CombinedMatrix, MonthFilter, SkippedTicker, TickerSymbol};
use crate::server::AppState;
use crate::services::cache::CacheStats;
use crate::services::colorizer::{color_map, CellStyle};
use crate::services::combiner::{create_combined_matrix, CombineOptions};
use crate::services::PriceSource;
use axum::{
    extract::{Path, State},
    response::Json,
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Query parameters shared by `/` and `/matrix`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatrixQuery {
    /// Comma-separated tickers: tickers=GGAL.BA,YPFD.BA
    pub tickers: Option<String>,

    /// Months to keep, repeated or comma-separated: months=9&months=10
    #[serde(default)]
    pub months: Vec<String>,
}

impl MatrixQuery {
    /// Validate into tickers and a month filter
    pub fn parse(&self) -> Result<(Vec<TickerSymbol>, MonthFilter)> {
        let raw = self
            .tickers
            .as_deref()
            .ok_or_else(|| AppError::InvalidInput("Missing 'tickers' parameter".to_string()))?;
        let tickers = TickerSymbol::parse_list(raw)?;
        let months = MonthFilter::parse(&self.months)?;
        Ok((tickers, months))
    }
}

/// One column header
#[derive(Debug, Serialize)]
pub struct ColumnResponse {
    pub label: String,
    pub month: u32,
    pub ticker: String,
}

/// One formatted cell with its style
#[derive(Debug, Serialize)]
pub struct CellResponse {
    pub text: String,
    pub value: f64,
    pub style: CellStyle,
    pub css: String,
}

/// One year row; absent cells are `null`
#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub year: String,
    pub cells: Vec<Option<CellResponse>>,
}

/// Combined matrix as served by `/matrix` and printed by the CLI
#[derive(Debug, Serialize)]
pub struct MatrixResponse {
    pub columns: Vec<ColumnResponse>,
    pub rows: Vec<RowResponse>,
    pub skipped: Vec<SkippedTicker>,
}

impl From<&CombinedMatrix> for MatrixResponse {
    fn from(matrix: &CombinedMatrix) -> Self {
        let columns = matrix
            .columns()
            .iter()
            .map(|column| ColumnResponse {
                label: column.label(),
                month: column.month,
                ticker: column.ticker.to_string(),
            })
            .collect();

        let rows = matrix
            .rows()
            .map(|(year, cells)| RowResponse {
                year: year.to_string(),
                cells: cells
                    .iter()
                    .map(|cell| {
                        cell.as_ref().map(|cell| {
                            let style = color_map(cell.text())
                                .unwrap_or_else(|_| CellStyle::for_value(cell.value()));
                            CellResponse {
                                text: cell.text().to_string(),
                                value: cell.value(),
                                css: style.css(),
                                style,
                            }
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            columns,
            rows,
            skipped: matrix.skipped().to_vec(),
        }
    }
}

/// Run the pipeline with the server's configuration
pub(crate) async fn build_matrix<S: PriceSource>(
    state: &AppState<S>,
    tickers: &[TickerSymbol],
    months: MonthFilter,
) -> Result<CombinedMatrix> {
    let options = CombineOptions {
        range: state.config.history,
        row_window: state.config.row_window,
        months,
    };
    create_combined_matrix(state.source.as_ref(), tickers, &options).await
}

/// GET /matrix - Combined matrix as JSON
///
/// Examples:
/// - /matrix?tickers=GGAL.BA,YPFD.BA (all months)
/// - /matrix?tickers=GGAL.BA&months=9&months=10
/// - /matrix?tickers=AAPL,MSFT&months=1,2,3
#[instrument(skip(state))]
pub async fn matrix_handler<S: PriceSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<MatrixQuery>,
) -> Result<Json<MatrixResponse>> {
    debug!("Received matrix request with params: {:?}", params);

    let (tickers, months) = params.parse()?;
    let matrix = build_matrix(&state, &tickers, months).await?;

    Ok(Json(MatrixResponse::from(&matrix)))
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub history_start: String,
    pub history_end: String,
    pub cache: CacheStats,
}

/// GET /health - Uptime and cache statistics
pub async fn health_handler<S: PriceSource>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        history_start: state.config.history.start.format("%Y-%m-%d").to_string(),
        history_end: state.config.history.end.format("%Y-%m-%d").to_string(),
        cache: state.source.stats().await,
    })
}

/// Cache invalidation result
#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub removed: usize,
}

/// DELETE /cache - Drop every cached series
pub async fn clear_cache_handler<S: PriceSource>(
    State(state): State<AppState<S>>,
) -> Json<CacheClearResponse> {
    let removed = state.source.clear().await;
    info!(removed, "Cache cleared via API");
    Json(CacheClearResponse { removed })
}

/// DELETE /cache/{ticker} - Drop every cached range of one ticker
pub async fn invalidate_ticker_handler<S: PriceSource>(
    State(state): State<AppState<S>>,
    Path(ticker): Path<String>,
) -> Result<Json<CacheClearResponse>> {
    let ticker = TickerSymbol::new(&ticker)?;
    let removed = state.source.invalidate(&ticker).await;
    Ok(Json(CacheClearResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppConfig;
    use crate::services::source::fake::FakeSource;
    use crate::services::CachedSource;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::time::Duration;

    fn state() -> AppState<FakeSource> {
        let source = FakeSource::new()
            .with_monthly("A", 2019, 1, &[100.0, 110.0, 99.0, 99.0, 120.0, 130.0, 125.0, 126.0, 127.0, 133.35])
            .with_monthly("B", 2019, 1, &[50.0, 45.0, 45.0, 46.0, 47.0, 48.0, 49.0, 50.0, 51.0, 25.5]);
        AppState::new(CachedSource::new(source, Duration::from_secs(60)), AppConfig::default())
    }

    fn query(tickers: Option<&str>, months: &[&str]) -> Query<MatrixQuery> {
        Query(MatrixQuery {
            tickers: tickers.map(str::to_string),
            months: months.iter().map(|m| m.to_string()).collect(),
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_matrix_handler_filters_months() {
        let response = matrix_handler(State(state()), query(Some("A,B"), &["10"]))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let labels: Vec<&str> = json["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["10_A", "10_B"]);

        let row = &json["rows"][0];
        assert_eq!(row["year"], "2019");
        assert_eq!(row["cells"][0]["text"], "5,00");
        assert_eq!(row["cells"][1]["text"], "-50,00");
        assert_eq!(
            row["cells"][1]["css"],
            "background-color: rgba(255, 127, 127, 1); color: black"
        );
    }

    #[tokio::test]
    async fn test_matrix_handler_first_month_is_null() {
        let response = matrix_handler(State(state()), query(Some("A"), &["1"]))
            .await
            .into_response();
        let json = body_json(response).await;

        assert!(json["rows"][0]["cells"][0].is_null());
    }

    #[tokio::test]
    async fn test_matrix_handler_reports_skipped() {
        let response = matrix_handler(State(state()), query(Some("A,ZZZ"), &["2"]))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["skipped"][0]["ticker"], "ZZZ");
    }

    #[tokio::test]
    async fn test_matrix_handler_bad_month_is_400() {
        let response = matrix_handler(State(state()), query(Some("A"), &["september"]))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Malformed month filter"));
    }

    #[tokio::test]
    async fn test_matrix_handler_missing_tickers_is_400() {
        let response = matrix_handler(State(state()), query(None, &[])).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_cache() {
        let state = state();
        let _ = matrix_handler(State(state.clone()), query(Some("A"), &[])).await;
        let _ = matrix_handler(State(state.clone()), query(Some("A"), &[])).await;

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.history_start, "2004-01-01");
        assert_eq!(health.cache.entries, 1);
        assert_eq!(health.cache.hits, 1);
    }

    #[tokio::test]
    async fn test_cache_invalidation_handlers() {
        let state = state();
        let _ = matrix_handler(State(state.clone()), query(Some("A,B"), &[])).await;

        let Json(result) = invalidate_ticker_handler(State(state.clone()), Path("A".to_string()))
            .await
            .unwrap();
        assert_eq!(result.removed, 1);

        let Json(result) = clear_cache_handler(State(state)).await;
        assert_eq!(result.removed, 1);
    }
}
