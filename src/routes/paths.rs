use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::geometry::haversine_distance_m;
use crate::engine::simplify;
use crate::error::AppError;
use crate::ingest::{self, RouteFormat};
use crate::state::AppState;
use crate::types::geo::Point;
use crate::types::path::Path;

const DEFAULT_COLOR: &str = "#3478f6";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/paths", post(upload).get(list))
        .route("/api/paths/:path_id", get(get_one))
        .route("/api/paths/:path_id/geometry", get(geometry))
        .route("/api/paths/:path_id/assign", post(assign))
}

#[derive(Serialize, Deserialize)]
pub struct PathSummary {
    pub path_id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<String>,
    pub waypoints: usize,
    pub stops: usize,
    pub length_m: f64,
}

fn summarize(path: &Path) -> PathSummary {
    let points = path.points();
    let length_m = points
        .windows(2)
        .map(|pair| haversine_distance_m(pair[0], pair[1]))
        .sum();

    PathSummary {
        path_id: path.id.clone(),
        name: path.name.clone(),
        color: path.color.clone(),
        linked_entity_id: path.linked_entity_id.clone(),
        waypoints: path.waypoints.len(),
        stops: path.waypoints.iter().filter(|w| w.is_stop).count(),
        length_m,
    }
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PathSummary>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let filename = filename.ok_or_else(|| AppError::BadRequest("No filename provided".to_string()))?;

    let format = RouteFormat::from_filename(&filename)
        .ok_or_else(|| AppError::BadRequest("Unsupported file format".to_string()))?;

    tracing::info!("Parsing route file: {}", filename);

    let route = ingest::parse(&bytes, format)?;
    let path_id = Uuid::new_v4().to_string();
    let name = route.name.unwrap_or_else(|| {
        filename
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| filename.clone())
    });
    let path = Path::new(
        path_id,
        name,
        route.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        route.linked_entity_id,
        route.waypoints,
    )?;

    let path = state.insert_path(path);
    let summary = summarize(&path);

    tracing::info!(
        "Registered path {} ({} waypoints, {} stops, {:.0} m)",
        path.id,
        summary.waypoints,
        summary.stops,
        summary.length_m
    );

    Ok(Json(summary))
}

async fn list(State(state): State<AppState>) -> Json<Vec<PathSummary>> {
    let mut summaries: Vec<PathSummary> =
        state.list_paths().iter().map(|p| summarize(p)).collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Json(summaries)
}

async fn get_one(
    State(state): State<AppState>,
    UrlPath(path_id): UrlPath<String>,
) -> Result<Json<Path>, AppError> {
    let path = state
        .get_path(&path_id)
        .ok_or_else(|| AppError::NotFound(format!("path {path_id}")))?;
    Ok(Json((*path).clone()))
}

#[derive(Deserialize)]
struct GeometryQuery {
    tolerance: Option<f64>,
}

#[derive(Serialize)]
struct GeometryResponse {
    path_id: String,
    tolerance_deg: f64,
    points: Vec<Point>,
}

/// Simplified polyline for rendering clients; tracking always uses the
/// full waypoint list.
async fn geometry(
    State(state): State<AppState>,
    UrlPath(path_id): UrlPath<String>,
    Query(query): Query<GeometryQuery>,
) -> Result<Json<GeometryResponse>, AppError> {
    let path = state
        .get_path(&path_id)
        .ok_or_else(|| AppError::NotFound(format!("path {path_id}")))?;

    let tolerance_deg = query
        .tolerance
        .unwrap_or(state.config().simplify_tolerance_deg);
    if !tolerance_deg.is_finite() || tolerance_deg < 0.0 {
        return Err(AppError::BadRequest("tolerance must be non-negative".to_string()));
    }

    let points = simplify::simplify(&path.points(), tolerance_deg);
    Ok(Json(GeometryResponse {
        path_id,
        tolerance_deg,
        points,
    }))
}

#[derive(Deserialize)]
struct AssignRequest {
    entity_id: String,
}

async fn assign(
    State(state): State<AppState>,
    UrlPath(path_id): UrlPath<String>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.assign(&request.entity_id, &path_id)?;
    Ok(Json(serde_json::json!({
        "entity_id": request.entity_id,
        "path_id": path_id,
    })))
}
