use crate::engine::geometry::haversine_distance_m;
use crate::error::PathError;
use crate::types::geo::Point;
use crate::types::path::Path;

/// Pull-based playback of a path at constant speed. The caller owns
/// the clock: each `advance(elapsed_ms)` moves the virtual shuttle
/// forward and returns its position, so the same stepper works under
/// a timer, a frame callback, or a test loop.
#[derive(Debug, Clone)]
pub struct PathSimulator {
    points: Vec<Point>,
    /// Distance along the path at each point; same length as `points`.
    offsets_m: Vec<f64>,
    speed_mps: f64,
    traveled_m: f64,
}

impl PathSimulator {
    pub fn new(path: &Path, speed_mps: f64) -> Result<Self, PathError> {
        if path.waypoints.len() < 2 {
            return Err(PathError::TooFewWaypoints(path.waypoints.len()));
        }

        let points = path.points();
        let mut offsets_m = Vec::with_capacity(points.len());
        let mut total = 0.0;
        offsets_m.push(0.0);
        for pair in points.windows(2) {
            total += haversine_distance_m(pair[0], pair[1]);
            offsets_m.push(total);
        }

        Ok(Self {
            points,
            offsets_m,
            speed_mps: speed_mps.max(0.0),
            traveled_m: 0.0,
        })
    }

    pub fn total_length_m(&self) -> f64 {
        *self.offsets_m.last().unwrap_or(&0.0)
    }

    pub fn is_finished(&self) -> bool {
        self.traveled_m >= self.total_length_m()
    }

    /// Advance the playback clock and return the interpolated position.
    pub fn advance(&mut self, elapsed_ms: u64) -> Point {
        self.traveled_m = (self.traveled_m + self.speed_mps * elapsed_ms as f64 / 1000.0)
            .min(self.total_length_m());
        self.position_at(self.traveled_m)
    }

    fn position_at(&self, distance_m: f64) -> Point {
        if distance_m <= 0.0 {
            return self.points[0];
        }
        if distance_m >= self.total_length_m() {
            return *self.points.last().expect("validated non-empty");
        }

        // offsets_m is sorted; find the segment containing distance_m.
        let next = self
            .offsets_m
            .iter()
            .position(|&offset| offset > distance_m)
            .expect("distance below total length");
        let prev = next - 1;

        let span = self.offsets_m[next] - self.offsets_m[prev];
        if span <= f64::EPSILON {
            return self.points[prev];
        }
        let t = (distance_m - self.offsets_m[prev]) / span;

        let a = self.points[prev];
        let b = self.points[next];
        Point::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::path::Waypoint;

    fn waypoint(lat: f64, lon: f64) -> Waypoint {
        Waypoint {
            lat,
            lon,
            is_stop: false,
            stop_label: None,
        }
    }

    fn line_path() -> Path {
        // Two ~111 m segments along the equator.
        let waypoints = vec![
            waypoint(0.0, 0.0),
            waypoint(0.0, 0.001),
            waypoint(0.0, 0.002),
        ];
        Path::new("p1".into(), "Line".into(), "#3366ff".into(), None, waypoints).unwrap()
    }

    #[test]
    fn starts_at_the_first_waypoint() {
        let mut sim = PathSimulator::new(&line_path(), 10.0).unwrap();
        let p = sim.advance(0);
        assert_eq!(p, Point::new(0.0, 0.0));
        assert!(!sim.is_finished());
    }

    #[test]
    fn advances_proportionally_to_elapsed_time() {
        let mut sim = PathSimulator::new(&line_path(), 10.0).unwrap();

        // 5 s at 10 m/s: ~50 m, still on the first segment.
        let p = sim.advance(5_000);
        assert_eq!(p.lat, 0.0);
        assert!(p.lon > 0.0004 && p.lon < 0.0005, "got {}", p.lon);

        // Another 8 s: ~130 m, onto the second segment.
        let p = sim.advance(8_000);
        assert!(p.lon > 0.001, "got {}", p.lon);
        assert!(!sim.is_finished());
    }

    #[test]
    fn clamps_at_the_end_of_the_path() {
        let mut sim = PathSimulator::new(&line_path(), 10.0).unwrap();
        let p = sim.advance(600_000);
        assert_eq!(p, Point::new(0.0, 0.002));
        assert!(sim.is_finished());

        // Further time keeps returning the terminus.
        assert_eq!(sim.advance(1_000), Point::new(0.0, 0.002));
    }

    #[test]
    fn accumulates_across_many_small_steps() {
        let mut one_shot = PathSimulator::new(&line_path(), 10.0).unwrap();
        let direct = one_shot.advance(10_000);

        let mut stepped = PathSimulator::new(&line_path(), 10.0).unwrap();
        let mut last = Point::new(0.0, 0.0);
        for _ in 0..10 {
            last = stepped.advance(1_000);
        }

        assert!((direct.lon - last.lon).abs() < 1e-9);
        assert!((direct.lat - last.lat).abs() < 1e-9);
    }

    #[test]
    fn zero_speed_never_moves() {
        let mut sim = PathSimulator::new(&line_path(), 0.0).unwrap();
        assert_eq!(sim.advance(60_000), Point::new(0.0, 0.0));
    }
}
