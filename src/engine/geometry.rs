use crate::types::geo::Point;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters. NaN inputs propagate NaN.
pub fn haversine_distance_m(a: Point, b: Point) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Perpendicular projection of `p` onto the segment `start`..`end`,
/// clamped to the endpoints. Works in a local equirectangular plane
/// with longitude scaled by cos(mean latitude); only valid for
/// segments a few kilometers long.
pub fn project_onto_segment(p: Point, start: Point, end: Point) -> Point {
    let scale = ((start.lat + end.lat) / 2.0).to_radians().cos();

    let seg_lat = end.lat - start.lat;
    let seg_lon = (end.lon - start.lon) * scale;
    let to_p_lat = p.lat - start.lat;
    let to_p_lon = (p.lon - start.lon) * scale;

    let len_sq = seg_lat * seg_lat + seg_lon * seg_lon;
    if len_sq <= f64::EPSILON {
        return start;
    }

    let dot = to_p_lat * seg_lat + to_p_lon * seg_lon;
    let t = (dot / len_sq).clamp(0.0, 1.0);

    Point::new(
        start.lat + t * (end.lat - start.lat),
        start.lon + t * (end.lon - start.lon),
    )
}
