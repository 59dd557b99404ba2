use crate::engine::geometry::haversine_distance_m;
use crate::types::path::Path;
use crate::types::tracking::{ProjectionResult, TrackingState};

/// Fold an accepted projection into the shuttle's progress record.
/// Backward jumps beyond GPS noise and sub-noise jitter are rejected
/// by returning the state unchanged. For the lifetime of one
/// assignment `stops_passed` never decreases and `cumulative_m` never
/// moves backward by more than the noise allowance.
pub fn advance(
    state: &TrackingState,
    projection: &ProjectionResult,
    path: &Path,
    min_advance_m: f64,
    max_backward_m: f64,
) -> TrackingState {
    let delta = projection.cumulative_m - state.cumulative_m;

    if delta < -max_backward_m {
        return state.clone();
    }
    // The `> 0` guard lets the very first fix of an assignment land
    // even when the shuttle is barely past the path start.
    if delta.abs() < min_advance_m && state.cumulative_m > 0.0 {
        return state.clone();
    }

    TrackingState {
        segment_index: projection.segment_index,
        cumulative_m: projection.cumulative_m,
        // max(): an accepted sub-noise backward drift must never
        // rewind the stop count
        stops_passed: stops_passed_at(path, projection.cumulative_m).max(state.stops_passed),
        snapped: Some(projection.point),
    }
}

/// Number of stop waypoints whose distance along the path has been
/// reached. A stop exactly at the projected point counts as passed.
fn stops_passed_at(path: &Path, cumulative_m: f64) -> usize {
    let mut offset = 0.0;
    let mut passed = 0;
    for (idx, waypoint) in path.waypoints.iter().enumerate() {
        if idx > 0 {
            offset += haversine_distance_m(
                path.waypoints[idx - 1].point(),
                waypoint.point(),
            );
        }
        if offset > cumulative_m {
            break;
        }
        if waypoint.is_stop {
            passed += 1;
        }
    }
    passed
}
