use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;

use fartmap_common::EventSubmission;

use crate::auth::ApiKey;
use crate::error::ApiError;
use crate::AppState;

/// Record one event. Bad coordinates are rejected before anything touches
/// the store.
pub async fn submit_event(
    State(state): State<Arc<AppState>>,
    _key: ApiKey,
    payload: Result<Json<EventSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(submission) = payload
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid event body: {}", rejection.body_text())))?;

    let event = submission.validate(Utc::now())?;
    let recorded = state.log.append(&event).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "ok": true,
            "event": recorded,
        })),
    ))
}
