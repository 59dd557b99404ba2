use crate::types::geo::BoundingRegion;
use crate::types::path::StopMarker;

/// Filter stop markers down to what a viewport should render. The
/// region is padded so markers just off-screen survive a pan; past
/// `hard_limit`, stops of the highlighted path are kept unconditionally
/// and the rest are truncated in input order. Rendering-only; tracking
/// never consults this.
pub fn cull(
    all_stops: &[StopMarker],
    region: BoundingRegion,
    highlighted_path_id: Option<&str>,
    hard_limit: usize,
    padding_deg: f64,
) -> Vec<StopMarker> {
    let padded = region.expanded(padding_deg);

    let visible: Vec<&StopMarker> = all_stops
        .iter()
        .filter(|s| padded.contains(s.point()))
        .collect();

    if visible.len() <= hard_limit {
        return visible.into_iter().cloned().collect();
    }

    let mut kept: Vec<StopMarker> = Vec::with_capacity(hard_limit);
    if let Some(highlighted) = highlighted_path_id {
        kept.extend(
            visible
                .iter()
                .filter(|s| s.path_id == highlighted)
                .map(|s| (*s).clone()),
        );
    }

    for stop in &visible {
        if kept.len() >= hard_limit {
            break;
        }
        if highlighted_path_id.map_or(false, |h| stop.path_id == h) {
            continue; // already kept
        }
        kept.push((*stop).clone());
    }

    kept
}
