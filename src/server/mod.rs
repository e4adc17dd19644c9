pub mod api;
pub mod page;

use crate::error::AppError;
use crate::models::AppConfig;
use crate::services::{CachedSource, PriceSource, SharedSource};
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

/// Application state shared across all handlers
pub struct AppState<S> {
    pub source: SharedSource<S>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl<S> AppState<S> {
    pub fn new(source: CachedSource<S>, config: AppConfig) -> Self {
        Self {
            source: Arc::new(source),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

// Manual impl: the source itself does not need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            config: self.config.clone(),
            started_at: self.started_at,
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::MalformedMonthFilter(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTicker(_) | AppError::NoData(_) => StatusCode::NOT_FOUND,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Io(_) | AppError::Parse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router with every route
pub fn router<S: PriceSource + 'static>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:5173"), // Vite dev server
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(page::index_handler::<S>))
        .route("/matrix", get(api::matrix_handler::<S>))
        .route("/health", get(api::health_handler::<S>))
        .route("/cache", delete(api::clear_cache_handler::<S>))
        .route("/cache/{ticker}", delete(api::invalidate_ticker_handler::<S>))
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve<S: PriceSource + 'static>(
    state: AppState<S>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting monthly-variations server");

    tracing::info!("Registering routes:");
    tracing::info!("  GET /?tickers=GGAL.BA,YPFD.BA&months=9 (web UI)");
    tracing::info!("  GET /matrix?tickers=GGAL.BA&months=9&months=10 (JSON)");
    tracing::info!("  GET /health");
    tracing::info!("  DELETE /cache");
    tracing::info!("  DELETE /cache/{{ticker}}");

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
