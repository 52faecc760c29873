pub mod submit;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use fartmap_common::{BoundingBox, Event};
use fartmap_stats::{ClusterParams, TimeWindow};

use crate::auth::{AdminKey, ApiKey};
use crate::error::ApiError;
use crate::AppState;

/// Largest clustering radius a caller may ask for, in degrees.
pub const MAX_THRESHOLD_DEG: f64 = 1.0;

/// Smallest clustering radius a caller may ask for (~0.1 m).
pub const MIN_THRESHOLD_DEG: f64 = 1e-6;

// --- Query structs ---

#[derive(Deserialize)]
pub struct WindowQuery {
    window: Option<TimeWindow>,
}

#[derive(Deserialize)]
pub struct HotZoneQuery {
    window: Option<TimeWindow>,
    bbox: Option<String>,
    threshold: Option<f64>,
    min_size: Option<usize>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    window: Option<TimeWindow>,
    device_id: Option<String>,
}

// --- Handlers ---

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    Query(params): Query<WindowQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let window = params.window.unwrap_or_default();
    let events = state.log.list().await?;
    let now = Utc::now();
    Ok(Json(window.filter(&events, now).cloned().collect()))
}

pub async fn clear_events(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    _admin: AdminKey,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = state.log.clear().await?;
    info!(cleared, "Admin cleared all events");
    Ok(Json(serde_json::json!({ "ok": true, "cleared": cleared })))
}

pub async fn hot_zones(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    Query(params): Query<HotZoneQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = params.window.unwrap_or(TimeWindow::Day);
    let viewport = params
        .bbox
        .as_deref()
        .map(str::parse::<BoundingBox>)
        .transpose()?;
    let cluster = cluster_params(&state.cluster, params.threshold, params.min_size)?;

    let events = state.log.list().await?;
    let zones = fartmap_stats::recent_hot_zones(
        &events,
        window,
        Utc::now(),
        viewport.as_ref(),
        &cluster,
    );
    Ok(Json(zones))
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    Query(params): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = params.window.unwrap_or_default();
    let events = state.log.list().await?;
    let board = fartmap_stats::leaderboard(
        &events,
        window,
        Utc::now(),
        params.device_id.as_deref(),
    );
    Ok(Json(board))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    Path(device_id): Path<String>,
    Query(params): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = params.window.unwrap_or_default();
    let events = state.log.list().await?;
    let stats = fartmap_stats::profile(&events, &device_id, window, Utc::now());
    Ok(Json(stats))
}

// --- Helpers ---

/// Apply per-request overrides on top of the configured clustering.
fn cluster_params(
    defaults: &ClusterParams,
    threshold: Option<f64>,
    min_size: Option<usize>,
) -> Result<ClusterParams, ApiError> {
    let threshold = match threshold {
        Some(t) if t.is_finite() && t > 0.0 => t.clamp(MIN_THRESHOLD_DEG, MAX_THRESHOLD_DEG),
        Some(t) => {
            return Err(ApiError::BadRequest(format!(
                "threshold must be a positive number of degrees, got {t}"
            )))
        }
        None => defaults.threshold,
    };
    Ok(ClusterParams {
        threshold,
        min_cluster_size: min_size.unwrap_or(defaults.min_cluster_size).max(1),
    })
}
