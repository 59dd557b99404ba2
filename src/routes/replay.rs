use axum::extract::{Path as UrlPath, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::simulate::PathSimulator;
use crate::error::AppError;
use crate::state::AppState;
use crate::types::tracking::{Fix, TrackingState};

/// Upper bound on simulation steps, so a crawling replay cannot spin
/// the handler forever.
const MAX_STEPS: usize = 10_000;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/paths/:path_id/replay", post(replay))
}

#[derive(Deserialize)]
struct ReplayRequest {
    /// Defaults to the path's linked shuttle.
    entity_id: Option<String>,
    speed_mps: Option<f64>,
    step_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReplayResponse {
    entity_id: String,
    steps: usize,
    matched_fixes: usize,
    tracking: TrackingState,
}

/// Drive a simulated shuttle down the path and feed every produced
/// position through the regular fix pipeline. Deterministic end-to-end
/// exercise of projection and progress; also handy for demos without a
/// live GPS feed.
async fn replay(
    State(state): State<AppState>,
    UrlPath(path_id): UrlPath<String>,
    Json(request): Json<ReplayRequest>,
) -> Result<Json<ReplayResponse>, AppError> {
    let path = state
        .get_path(&path_id)
        .ok_or_else(|| AppError::NotFound(format!("path {path_id}")))?;

    let entity_id = request
        .entity_id
        .or_else(|| path.linked_entity_id.clone())
        .ok_or_else(|| {
            AppError::BadRequest("path has no linked shuttle; pass entity_id".to_string())
        })?;

    let speed_mps = request.speed_mps.unwrap_or(10.0);
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return Err(AppError::BadRequest("speed_mps must be positive".to_string()));
    }
    let step_ms = request.step_ms.unwrap_or(1_000).max(1);

    state.assign(&entity_id, &path_id)?;

    let mut simulator = PathSimulator::new(&path, speed_mps)?;
    let base = Utc::now();
    let mut steps = 0;
    let mut matched_fixes = 0;

    while steps < MAX_STEPS {
        let position = simulator.advance(step_ms);
        let observed_at = base + chrono::Duration::milliseconds((steps as u64 * step_ms) as i64);
        let outcome = state.process_fix(Fix {
            entity_id: entity_id.clone(),
            lat: position.lat,
            lon: position.lon,
            observed_at,
        })?;
        if outcome.matched {
            matched_fixes += 1;
        }
        steps += 1;
        if simulator.is_finished() {
            break;
        }
    }

    let tracking = state
        .tracking_state(&entity_id)
        .ok_or_else(|| AppError::Internal("tracker vanished during replay".to_string()))?;

    tracing::info!(
        entity = %entity_id,
        path = %path_id,
        steps,
        stops = tracking.stops_passed,
        "replay finished"
    );

    Ok(Json(ReplayResponse {
        entity_id,
        steps,
        matched_fixes,
        tracking,
    }))
}
