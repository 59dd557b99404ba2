use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid GPX: {0}")]
    InvalidGpx(String),
    #[error("Invalid path spec: {0}")]
    InvalidSpec(String),
    #[error("No waypoints found in file")]
    EmptyFile,
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("A path needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("Non-finite coordinates ({lat}, {lon})")]
    NonFiniteCoordinates { lat: f64, lon: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Fix(#[from] FixError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Parse(_) | AppError::Path(_) | AppError::Fix(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
