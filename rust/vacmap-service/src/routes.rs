use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use vacmap_core::codec::{ErrorCode, MapError, MapPackage, PathPackage};
use vacmap_core::{MapCache, RefreshOutcome};

use crate::errors::AppError;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MapCache>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub from: usize,
}

#[derive(Debug, Serialize)]
pub struct Healthz { pub status: &'static str }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsOverview {
    pub active_map_available: bool,
    pub archived: Vec<String>,
    pub latest: Option<String>,
    pub error: MapError,
}

#[derive(Debug, Serialize)]
pub struct RefreshReport {
    pub active: RefreshOutcome,
    pub discovered: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/version", get(version))
        .route("/maps", get(list_maps))
        .route("/maps/active", get(active_map))
        .route("/maps/active/path", get(active_path))
        .route("/maps/latest", get(latest_map))
        .route("/maps/latest/path", get(latest_path))
        .route("/maps/archived/:name", get(archived_map))
        .route("/maps/archived/:name/path", get(archived_path))
        .route("/admin/refresh", post(refresh))
        .with_state(state)
}

/// Runs a cache call on the blocking pool; every cache operation touches the filesystem.
async fn with_cache<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&MapCache) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(&state.cache);
    tokio::task::spawn_blocking(move || f(&cache))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("cache task failed")))
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(Healthz { status: "ok" }))
}

async fn version() -> impl IntoResponse {
    let svc_version = env!("CARGO_PKG_VERSION");
    let core_version = vacmap_core::version();
    (StatusCode::OK, Json(json!({"service_version": svc_version, "core_version": core_version})))
}

async fn list_maps(State(state): State<AppState>) -> Result<Json<MapsOverview>, AppError> {
    let overview = with_cache(&state, |c| {
        c.update_active_map();
        c.update_archived();
        MapsOverview {
            active_map_available: c.has_active_map(),
            archived: c.get_archived_names(),
            latest: c.latest_archived_name(),
            error: MapError::none(),
        }
    })
    .await?;
    Ok(Json(overview))
}

async fn active_map(State(state): State<AppState>) -> Result<Json<Arc<MapPackage>>, AppError> {
    let pkg = with_cache(&state, |c| {
        c.update_active_map();
        c.get_active_map()
    })
    .await?;
    match pkg {
        Some(p) => {
            debug!(pixels = p.pixel_count(), "serving active map");
            Ok(Json(p))
        }
        None => Err(AppError::Map(ErrorCode::MapNotAvailable, "no active map".into())),
    }
}

async fn active_path(State(state): State<AppState>, Query(q): Query<PathQuery>) -> Result<Json<PathPackage>, AppError> {
    let from = q.from;
    with_cache(&state, move |c| c.get_active_path_from(from))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Path(ErrorCode::MapNotAvailable, "no active map".into()))
}

async fn latest_map(State(state): State<AppState>) -> Result<Json<MapPackage>, AppError> {
    with_cache(&state, |c| c.get_latest_archived_map())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Map(ErrorCode::MapNotAvailable, "no archived map".into()))
}

async fn latest_path(State(state): State<AppState>) -> Result<Json<PathPackage>, AppError> {
    with_cache(&state, |c| c.get_latest_archived_path())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Path(ErrorCode::MapNotAvailable, "no archived map".into()))
}

async fn archived_map(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<MapPackage>, AppError> {
    let key = name.clone();
    with_cache(&state, move |c| c.get_archived_map(&key))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Map(ErrorCode::MapNotFound, name))
}

async fn archived_path(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<PathPackage>, AppError> {
    let key = name.clone();
    with_cache(&state, move |c| c.get_archived_path(&key))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Path(ErrorCode::MapNotFound, name))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, AppError> {
    let report = with_cache(&state, |c| RefreshReport { active: c.update_active_map(), discovered: c.update_archived() }).await?;
    info!(active = ?report.active, discovered = report.discovered, "refresh requested");
    Ok(Json(report))
}
