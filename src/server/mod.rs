//! HTTP gateway
//!
//! Thin axum layer over the orchestrator. Pipeline work blocks, so every job
//! runs on tokio's blocking pool.

use crate::error::{Result, StemshiftError};
use crate::pipeline::Orchestrator;
use crate::store::TrackCache;
use crate::types::TrackId;
use axum::{
    body::Body,
    extract::{Path as UrlPath, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<TrackCache>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, cache_ttl: Duration) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            cache: Arc::new(TrackCache::new(cache_ttl)),
        }
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }
}

#[derive(Debug, Deserialize)]
pub struct SeparateStemsRequest {
    pub youtube_url: String,
    pub timestretch_ratio: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownbeatQuery {
    pub track_id: Option<String>,
}

/// Error response: `{"error": message}` with a status derived from the error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StemshiftError> for ApiError {
    fn from(err: StemshiftError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else if err.is_acquisition_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Routes with permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/separate-stems", post(separate_stems))
        .route("/audio/*path", get(audio))
        .route("/get-downbeat", get(get_downbeat))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let output_root = state.orchestrator.output_root().to_path_buf();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, output_root = %output_root.display(), "stemshift HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// =============================================================================
// GET /health
// =============================================================================

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// =============================================================================
// POST /separate-stems
// =============================================================================

async fn separate_stems(
    State(st): State<AppState>,
    Json(req): Json<SeparateStemsRequest>,
) -> std::result::Result<Json<Vec<String>>, ApiError> {
    info!(url = %req.youtube_url, ratio = req.timestretch_ratio, "separate-stems");

    let orchestrator = st.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        orchestrator.process_url(&req.youtube_url, req.timestretch_ratio)
    })
    .await
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("pipeline task failed: {}", e)))??;

    st.cache.purge_expired();
    st.cache.insert(outcome.track_id.clone(), outcome.analysis());
    debug!(track = %outcome.track_id, cached = st.cache.len(), "cached downbeats");

    let root = st.orchestrator.output_root();
    let stems = outcome
        .stems
        .iter()
        .map(|stem| relative_to(root, &stem.path))
        .collect();

    Ok(Json(stems))
}

/// `path` relative to `root` with forward slashes, or as-is when outside it
fn relative_to(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// GET /audio/*path
// =============================================================================

/// Stream a file under the output root

async fn audio(
    State(st): State<AppState>,
    UrlPath(requested): UrlPath<String>,
) -> std::result::Result<Response, ApiError> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, format!("audio file not found: {}", requested));

    let relative = safe_relative_path(&requested).ok_or_else(not_found)?;
    let full = st.orchestrator.output_root().join(&relative);

    let size = match tokio::fs::metadata(&full).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return Err(not_found()),
    };

    let file = tokio::fs::File::open(&full).await.map_err(StemshiftError::from)?;

    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// Normal components only: no root, no `..`
fn safe_relative_path(raw: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(raw.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

// =============================================================================
// GET /get-downbeat
// =============================================================================

async fn get_downbeat(
    State(st): State<AppState>,
    Query(query): Query<DownbeatQuery>,
) -> std::result::Result<Json<Vec<f64>>, ApiError> {
    if let Some(id) = query.track_id {
        let id = TrackId::new(id);
        return st
            .cache
            .get(&id)
            .map(|data| Json(data.beats))
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("no beat data cached for track {}", id)));
    }

    let store = st.orchestrator.store().clone();
    let data = tokio::task::spawn_blocking(move || store.read())
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("read task failed: {}", e)))??;

    Ok(Json(data.beats))
}

// =============================================================================
// CORS
// =============================================================================

async fn cors(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        allow_all(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    allow_all(response.headers_mut());
    response
}

fn allow_all(headers: &mut HeaderMap) {
    let any = HeaderValue::from_static("*");
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
}
