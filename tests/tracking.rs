use axum::{body::to_bytes, http::Request, Router};
use shuttletrack_rs::{config::Config, routes, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = Config::from_env();
    let state = AppState::new(config);
    Router::new()
        .merge(routes::paths::router())
        .merge(routes::fixes::router())
        .merge(routes::tracking::router())
        .merge(routes::replay::router())
        .with_state(state)
}

fn multipart_body(file_name: &str, file_body: &str, boundary: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{file_body}\r\n--{boundary}--\r\n"
    )
}

async fn post_multipart(app: &Router, uri: &str, file_name: &str, file_body: &str) -> Value {
    let boundary = "X-BOUNDARY-TEST";
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(axum::body::Body::from(multipart_body(
                    file_name, file_body, boundary,
                )))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&body).expect("json")
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (axum::http::StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(app: &Router, uri: &str) -> (axum::http::StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Two ~111 m segments along the equator with stops at the second and
/// third waypoints, pre-linked to shuttle "bus-1".
fn two_stop_route() -> &'static str {
    r#"{
        "name": "Test Line",
        "linked_entity_id": "bus-1",
        "waypoints": [
            {"lat": 0.0, "lon": 0.0},
            {"lat": 0.0, "lon": 0.001, "stop": "A"},
            {"lat": 0.0, "lon": 0.002, "stop": "B"}
        ]
    }"#
}

async fn send_fix(app: &Router, entity_id: &str, lat: f64, lon: f64) -> Value {
    let (status, json) = post_json(
        app,
        "/api/fixes",
        json!({"entity_id": entity_id, "lat": lat, "lon": lon}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    json
}

fn stops_passed(outcome: &Value) -> u64 {
    outcome
        .pointer("/tracking/stops_passed")
        .and_then(Value::as_u64)
        .expect("stops_passed")
}

#[tokio::test]
async fn stops_accumulate_as_the_shuttle_drives_the_route() {
    let app = app();
    post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;

    let outcome = send_fix(&app, "bus-1", 0.0, 0.0).await;
    assert_eq!(outcome.get("matched").and_then(Value::as_bool), Some(true));
    assert_eq!(stops_passed(&outcome), 0);

    let outcome = send_fix(&app, "bus-1", 0.0, 0.00115).await;
    assert_eq!(stops_passed(&outcome), 1);

    let outcome = send_fix(&app, "bus-1", 0.0, 0.002).await;
    assert_eq!(stops_passed(&outcome), 2);

    let (status, tracking) = get_json(&app, "/api/entities/bus-1/tracking").await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(
        tracking.pointer("/tracking/stops_passed").and_then(Value::as_u64),
        Some(2)
    );
}

#[tokio::test]
async fn backward_and_jitter_fixes_hold_the_previous_state() {
    let app = app();
    post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;

    send_fix(&app, "bus-1", 0.0, 0.0).await;
    let settled = send_fix(&app, "bus-1", 0.0, 0.0012).await;
    let settled_cumulative = settled
        .pointer("/tracking/cumulative_m")
        .and_then(Value::as_f64)
        .expect("cumulative");
    assert_eq!(stops_passed(&settled), 1);

    // ~1 m of jitter: accepted by the projector, rejected by the
    // progress gate.
    let jitter = send_fix(&app, "bus-1", 0.0, 0.001209).await;
    assert_eq!(
        jitter.pointer("/tracking/cumulative_m").and_then(Value::as_f64),
        Some(settled_cumulative)
    );

    // ~22 m backward: rejected outright.
    let backward = send_fix(&app, "bus-1", 0.0, 0.001).await;
    assert_eq!(
        backward.pointer("/tracking/cumulative_m").and_then(Value::as_f64),
        Some(settled_cumulative)
    );
    assert_eq!(stops_passed(&backward), 1);
}

#[tokio::test]
async fn an_off_route_fix_is_a_no_match_not_an_error() {
    let app = app();
    post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;

    send_fix(&app, "bus-1", 0.0, 0.0012).await;

    // ~5.5 km off the route: held, previous state still reported.
    let outcome = send_fix(&app, "bus-1", 0.05, 0.0012).await;
    assert_eq!(outcome.get("matched").and_then(Value::as_bool), Some(false));
    assert_eq!(stops_passed(&outcome), 1);
}

#[tokio::test]
async fn non_finite_coordinates_are_rejected_at_the_boundary() {
    let app = app();
    post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;

    // JSON cannot carry NaN, so a malformed literal is the closest a
    // wire client can get; it is rejected before the engine runs.
    let (status, _) = post_json(
        &app,
        "/api/fixes",
        json!({"entity_id": "bus-1", "lat": "NaN", "lon": 0.0}),
    )
    .await;
    assert_ne!(status, axum::http::StatusCode::OK);
}

#[test]
fn the_engine_itself_rejects_non_finite_coordinates() {
    use chrono::Utc;
    use shuttletrack_rs::types::tracking::Fix;

    let state = AppState::new(Config::from_env());
    let result = state.process_fix(Fix {
        entity_id: "bus-1".to_string(),
        lat: f64::NAN,
        lon: 0.0,
        observed_at: Utc::now(),
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn fixes_without_an_assignment_are_remembered_but_unmatched() {
    let app = app();

    let outcome = send_fix(&app, "ghost-bus", 0.0, 0.0).await;
    assert_eq!(outcome.get("matched").and_then(Value::as_bool), Some(false));
    assert!(outcome.get("tracking").is_none());

    let (status, _) = get_json(&app, "/api/entities/ghost-bus/tracking").await;
    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reassignment_resets_progress() {
    let app = app();
    let uploaded = post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;
    let path_id = uploaded
        .get("path_id")
        .and_then(Value::as_str)
        .expect("path id")
        .to_string();

    send_fix(&app, "bus-1", 0.0, 0.0).await;
    let outcome = send_fix(&app, "bus-1", 0.0, 0.002).await;
    assert_eq!(stops_passed(&outcome), 2);

    // Re-binding the same shuttle starts a clean record.
    let (status, _) = post_json(
        &app,
        &format!("/api/paths/{path_id}/assign"),
        json!({"entity_id": "bus-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let (_, tracking) = get_json(&app, "/api/entities/bus-1/tracking").await;
    assert_eq!(
        tracking.pointer("/tracking/stops_passed").and_then(Value::as_u64),
        Some(0)
    );
    assert_eq!(
        tracking.pointer("/tracking/cumulative_m").and_then(Value::as_f64),
        Some(0.0)
    );
}

#[tokio::test]
async fn viewport_stops_respect_highlight_priority() {
    let app = app();
    post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;

    // A second path with many stops crowding the same viewport.
    let mut waypoints = Vec::new();
    for i in 0..60 {
        waypoints.push(json!({
            "lat": 0.01,
            "lon": i as f64 * 0.001,
            "stop": format!("S{i}")
        }));
    }
    let crowded = json!({"name": "Crowded", "waypoints": waypoints}).to_string();
    post_multipart(&app, "/api/paths", "crowded.json", &crowded).await;

    let uploaded = get_json(&app, "/api/paths").await.1;
    let highlight_id = uploaded
        .as_array()
        .expect("array")
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some("Test Line"))
        .and_then(|p| p.get("path_id"))
        .and_then(Value::as_str)
        .expect("highlight id")
        .to_string();

    let uri = format!(
        "/api/stops?min_lat=-0.05&min_lon=-0.05&max_lat=0.05&max_lon=0.1&highlight={highlight_id}&limit=50"
    );
    let (status, markers) = get_json(&app, &uri).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    let markers = markers.as_array().expect("markers");
    assert_eq!(markers.len(), 50);
    let highlighted = markers
        .iter()
        .filter(|m| m.get("path_id").and_then(Value::as_str) == Some(highlight_id.as_str()))
        .count();
    assert_eq!(highlighted, 2);
}

#[tokio::test]
async fn replay_drives_the_full_pipeline_to_the_terminus() {
    let app = app();
    let uploaded = post_multipart(&app, "/api/paths", "line.json", two_stop_route()).await;
    let path_id = uploaded
        .get("path_id")
        .and_then(Value::as_str)
        .expect("path id");

    let (status, result) = post_json(
        &app,
        &format!("/api/paths/{path_id}/replay"),
        json!({"speed_mps": 10.0, "step_ms": 1000}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(result.get("entity_id").and_then(Value::as_str), Some("bus-1"));

    let steps = result.get("steps").and_then(Value::as_u64).expect("steps");
    assert!(steps >= 20 && steps < 40, "got {steps}");
    assert_eq!(result.get("steps"), result.get("matched_fixes"));
    assert_eq!(
        result.pointer("/tracking/stops_passed").and_then(Value::as_u64),
        Some(2)
    );
}
