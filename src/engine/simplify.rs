use crate::types::geo::Point;

/// Douglas-Peucker reduction of a polyline to `tolerance_deg`.
/// Distances are measured in raw degree space, matching the tolerance
/// unit; the default of 0.00003 deg is roughly 3 m. Inputs of fewer
/// than 3 points come back unchanged.
pub fn simplify(points: &[Point], tolerance_deg: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let tolerance_deg = tolerance_deg.max(0.0);

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_distance = 0.0;
    let mut max_index = 0;
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = perpendicular_distance_deg(*p, first, last);
        if d > max_distance {
            max_distance = d;
            max_index = i;
        }
    }

    if max_distance > tolerance_deg {
        let mut left = simplify(&points[..=max_index], tolerance_deg);
        let right = simplify(&points[max_index..], tolerance_deg);
        left.pop(); // the split point is the first element of `right`
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance_deg(p: Point, a: Point, b: Point) -> f64 {
    let seg_lat = b.lat - a.lat;
    let seg_lon = b.lon - a.lon;
    let len_sq = seg_lat * seg_lat + seg_lon * seg_lon;

    if len_sq <= f64::EPSILON {
        return ((p.lat - a.lat).powi(2) + (p.lon - a.lon).powi(2)).sqrt();
    }

    let t = (((p.lat - a.lat) * seg_lat + (p.lon - a.lon) * seg_lon) / len_sq).clamp(0.0, 1.0);
    let nearest_lat = a.lat + t * seg_lat;
    let nearest_lon = a.lon + t * seg_lon;

    ((p.lat - nearest_lat).powi(2) + (p.lon - nearest_lon).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_collapses_to_endpoints() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.001),
            Point::new(0.0, 0.002),
            Point::new(0.0, 0.003),
            Point::new(0.0, 0.004),
        ];
        let simplified = simplify(&points, 0.00003);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0], points[0]);
        assert_eq!(simplified[1], points[4]);
    }

    #[test]
    fn corner_above_tolerance_survives() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.001, 0.001),
            Point::new(0.0, 0.002),
        ];
        let simplified = simplify(&points, 0.00003);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn small_inputs_unchanged() {
        assert!(simplify(&[], 0.00003).is_empty());
        let one = vec![Point::new(1.0, 2.0)];
        assert_eq!(simplify(&one, 0.00003), one);
        let two = vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)];
        assert_eq!(simplify(&two, 0.00003), two);
    }

    #[test]
    fn simplification_is_idempotent() {
        let points: Vec<Point> = (0..200)
            .map(|i| {
                let x = i as f64 * 0.0001;
                Point::new((x * 150.0).sin() * 0.0004, x)
            })
            .collect();

        let once = simplify(&points, 0.00003);
        let twice = simplify(&once, 0.00003);
        assert_eq!(once, twice);
        assert!(once.len() < points.len());
    }

    #[test]
    fn tighter_tolerance_keeps_more_points() {
        let points: Vec<Point> = (0..100)
            .map(|i| {
                let x = i as f64 * 0.0001;
                Point::new((x * 300.0).sin() * 0.0002, x)
            })
            .collect();

        let coarse = simplify(&points, 0.0001);
        let fine = simplify(&points, 0.000001);
        assert!(fine.len() >= coarse.len());
    }
}
