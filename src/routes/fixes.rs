use axum::extract::{Path as UrlPath, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{AppState, FixOutcome};
use crate::types::geo::Point;
use crate::types::tracking::{Fix, RidingSession};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/fixes", post(ingest_fix))
        .route("/api/observers/:observer_id/location", post(observer_location))
}

#[derive(Deserialize)]
struct FixRequest {
    entity_id: String,
    lat: f64,
    lon: f64,
    /// Defaults to receipt time when the feed does not stamp fixes.
    observed_at: Option<DateTime<Utc>>,
}

async fn ingest_fix(
    State(state): State<AppState>,
    Json(request): Json<FixRequest>,
) -> Result<Json<FixOutcome>, AppError> {
    let fix = Fix {
        entity_id: request.entity_id,
        lat: request.lat,
        lon: request.lon,
        observed_at: request.observed_at.unwrap_or_else(Utc::now),
    };
    let outcome = state.process_fix(fix)?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct LocationRequest {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct SessionResponse {
    riding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<RidingSession>,
}

async fn observer_location(
    State(state): State<AppState>,
    UrlPath(observer_id): UrlPath<String>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.observer_tick(
        &observer_id,
        Point::new(request.lat, request.lon),
        Utc::now(),
    )?;
    Ok(Json(SessionResponse {
        riding: session.is_some(),
        session,
    }))
}
