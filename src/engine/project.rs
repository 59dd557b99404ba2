use crate::engine::geometry::{haversine_distance_m, project_onto_segment};
use crate::types::geo::Point;
use crate::types::path::Path;
use crate::types::tracking::ProjectionResult;

/// Segments to look back from the anchor. Covers the anchor drifting
/// slightly ahead of the shuttle between fixes.
const SEARCH_BACK_SEGMENTS: usize = 2;

/// Snap a raw position onto the path, searching only segments near
/// `anchor` (the last resolved segment). The bounded window keeps the
/// scan cheap on long paths and stops a looping route from stealing
/// the match where it passes near itself. Returns `None` when nothing
/// in the window is within `acceptance_m` — a frequent, normal
/// outcome; the caller just keeps its previous state.
pub fn project_onto_path(
    position: Point,
    path: &Path,
    anchor: usize,
    ahead_segments: usize,
    acceptance_m: f64,
) -> Option<ProjectionResult> {
    let last_segment = path.segment_count() - 1;
    let window_start = anchor.saturating_sub(SEARCH_BACK_SEGMENTS);
    let window_end = (anchor + SEARCH_BACK_SEGMENTS + ahead_segments).min(last_segment);

    let mut best: Option<(f64, usize, Point)> = None;
    for idx in window_start..=window_end {
        let start = path.waypoints[idx].point();
        let end = path.waypoints[idx + 1].point();
        let snapped = project_onto_segment(position, start, end);
        let distance = haversine_distance_m(position, snapped);

        // <= so a fix exactly on a shared waypoint resolves to the
        // later segment, counting the waypoint as reached
        if best.map_or(true, |(d, _, _)| distance <= d) {
            best = Some((distance, idx, snapped));
        }
    }

    let (distance, segment_index, point) = best?;
    if distance > acceptance_m {
        return None;
    }

    let mut cumulative_m = 0.0;
    for idx in 0..segment_index {
        cumulative_m += haversine_distance_m(
            path.waypoints[idx].point(),
            path.waypoints[idx + 1].point(),
        );
    }
    cumulative_m += haversine_distance_m(path.waypoints[segment_index].point(), point);

    Some(ProjectionResult {
        segment_index,
        point,
        cumulative_m,
    })
}
