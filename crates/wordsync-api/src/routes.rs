use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequestParts, State};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wordsync_core::db::{DeviceRepository, SqliteDeviceRepository};
use wordsync_core::export::{self, DeletedWord, ExportWord};
use wordsync_core::models::DeviceSummary;
use wordsync_core::util::timestamp_now;
use wordsync_core::{Database, SyncOrchestrator, SyncReport, SyncRequest};

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    orchestrator: SyncOrchestrator,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Arc<Database>) -> Self {
        Self {
            orchestrator: SyncOrchestrator::new(db),
            config,
        }
    }

    /// Run a query on a fresh reader connection, off the async runtime.
    async fn read<T, F>(&self, query: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> wordsync_core::Result<T> + Send + 'static,
    {
        let db = Arc::clone(self.orchestrator.database());
        let value = tokio::task::spawn_blocking(move || {
            let conn = db.reader()?;
            query(&conn)
        })
        .await??;
        Ok(value)
    }
}

pub fn app_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    let api_routes = Router::new()
        .route("/sync", post(sync_words))
        .route("/download", get(download))
        .route("/download_all", get(download_all))
        .route("/deleted_words", get(deleted_words))
        .route("/devices", get(devices))
        .route("/last_sync", get(last_sync))
        .route("/status", get(status))
        .route("/test", get(test_connection));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// Address of the syncing device: first `X-Forwarded-For` hop, else the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self(forwarded.or(peer)))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Serialize)]
struct TestResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    version: &'static str,
}

async fn test_connection() -> Json<TestResponse> {
    Json(TestResponse {
        status: "success",
        message: "Wordsync server is running",
        timestamp: timestamp_now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    status: &'static str,
    message: String,
    #[serde(flatten)]
    report: SyncReport,
}

async fn sync_words(
    State(state): State<AppState>,
    ClientAddr(client_ip): ClientAddr,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let Json(mut request) = payload?;
    request.client_ip = client_ip;
    let device_id = request.device_id.clone();
    let items = request.words.len();

    let orchestrator = state.orchestrator.clone();
    let report = tokio::task::spawn_blocking(move || orchestrator.sync(request)).await??;

    tracing::info!(
        endpoint = "sync",
        device_id,
        items,
        synced = report.synced,
        failed = report.failures.len(),
        "Processed sync batch"
    );
    Ok(Json(SyncResponse {
        status: "success",
        message: report.message(),
        report,
    }))
}

async fn download(State(state): State<AppState>) -> Result<Json<Vec<ExportWord>>, AppError> {
    let words = state.read(export::active_words).await?;
    tracing::info!(endpoint = "download", count = words.len(), "Served active words");
    Ok(Json(words))
}

#[derive(Debug, Serialize)]
struct DownloadAllResponse {
    status: &'static str,
    count: usize,
    words: Vec<ExportWord>,
}

async fn download_all(State(state): State<AppState>) -> Result<Json<DownloadAllResponse>, AppError> {
    let words = state.read(export::active_words).await?;
    Ok(Json(DownloadAllResponse {
        status: "success",
        count: words.len(),
        words,
    }))
}

async fn deleted_words(State(state): State<AppState>) -> Result<Json<Vec<DeletedWord>>, AppError> {
    let words = state.read(export::deleted_words).await?;
    Ok(Json(words))
}

#[derive(Debug, Serialize)]
struct DevicesResponse {
    status: &'static str,
    total_devices: usize,
    devices: Vec<DeviceSummary>,
}

async fn devices(State(state): State<AppState>) -> Result<Json<DevicesResponse>, AppError> {
    let devices = state
        .read(|conn| SqliteDeviceRepository::new(conn).list())
        .await?;
    Ok(Json(DevicesResponse {
        status: "success",
        total_devices: devices.len(),
        devices,
    }))
}

#[derive(Debug, Serialize)]
struct LastSyncResponse {
    last_sync: String,
}

async fn last_sync(State(state): State<AppState>) -> Result<Json<LastSyncResponse>, AppError> {
    let last = state
        .read(|conn| SqliteDeviceRepository::new(conn).last_sync())
        .await?;
    Ok(Json(LastSyncResponse {
        last_sync: last.unwrap_or_else(|| "Never".to_string()),
    }))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    total_words: u64,
    device_count: u64,
    last_sync: Option<String>,
    server_time: String,
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let store = state.read(export::store_status).await?;
    Ok(Json(StatusResponse {
        status: "online",
        total_words: store.total_words,
        device_count: store.device_count,
        last_sync: store.last_sync,
        server_time: timestamp_now(),
    }))
}
