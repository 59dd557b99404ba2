use axum::extract::{Path as UrlPath, Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::engine::viewport;
use crate::error::AppError;
use crate::state::AppState;
use crate::types::geo::BoundingRegion;
use crate::types::path::StopMarker;
use crate::types::tracking::{RidingSession, TrackingState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/entities/:entity_id/tracking", get(entity_tracking))
        .route("/api/observers/:observer_id/session", get(observer_session))
        .route("/api/observers/:observer_id", delete(reset_observer))
        .route("/api/stops", get(stops))
}

#[derive(Serialize)]
struct TrackingResponse {
    entity_id: String,
    path_id: String,
    tracking: TrackingState,
}

async fn entity_tracking(
    State(state): State<AppState>,
    UrlPath(entity_id): UrlPath<String>,
) -> Result<Json<TrackingResponse>, AppError> {
    let path_id = state
        .assigned_path_id(&entity_id)
        .ok_or_else(|| AppError::NotFound(format!("no assignment for {entity_id}")))?;
    let tracking = state
        .tracking_state(&entity_id)
        .ok_or_else(|| AppError::NotFound(format!("no tracking state for {entity_id}")))?;

    Ok(Json(TrackingResponse {
        entity_id,
        path_id,
        tracking,
    }))
}

#[derive(Serialize)]
struct SessionResponse {
    riding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<RidingSession>,
}

async fn observer_session(
    State(state): State<AppState>,
    UrlPath(observer_id): UrlPath<String>,
) -> Json<SessionResponse> {
    let session = state.riding_session(&observer_id);
    Json(SessionResponse {
        riding: session.is_some(),
        session,
    })
}

async fn reset_observer(
    State(state): State<AppState>,
    UrlPath(observer_id): UrlPath<String>,
) -> Json<serde_json::Value> {
    state.reset_observer(&observer_id);
    Json(serde_json::json!({ "observer_id": observer_id, "reset": true }))
}

#[derive(Deserialize)]
struct StopsQuery {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
    highlight: Option<String>,
    limit: Option<usize>,
}

async fn stops(
    State(state): State<AppState>,
    Query(query): Query<StopsQuery>,
) -> Result<Json<Vec<StopMarker>>, AppError> {
    if query.min_lat > query.max_lat || query.min_lon > query.max_lon {
        return Err(AppError::BadRequest("inverted bounding region".to_string()));
    }

    let region = BoundingRegion {
        min_lat: query.min_lat,
        min_lon: query.min_lon,
        max_lat: query.max_lat,
        max_lon: query.max_lon,
    };

    let markers = viewport::cull(
        &state.stop_markers(),
        region,
        query.highlight.as_deref(),
        query.limit.unwrap_or(state.config().marker_limit),
        state.config().marker_padding_deg,
    );
    Ok(Json(markers))
}
