use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::geo::Point;

/// A single timestamped position observation for a shuttle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fix {
    pub entity_id: String,
    pub lat: f64,
    pub lon: f64,
    pub observed_at: DateTime<Utc>,
}

impl Fix {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// The nearest on-path point for a raw fix, with its distance along
/// the path. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionResult {
    pub segment_index: usize,
    pub point: Point,
    pub cumulative_m: f64,
}

/// Per (shuttle, path) progress record. `cumulative_m` and
/// `stops_passed` never decrease while the assignment is unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingState {
    pub segment_index: usize,
    pub cumulative_m: f64,
    pub stops_passed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapped: Option<Point>,
}

/// An active "rider is aboard this shuttle" commitment. At most one
/// per rider; destroyed by sustained distance or an assignment change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidingSession {
    pub id: uuid::Uuid,
    pub observer_id: String,
    pub entity_id: String,
    pub boarded_at: DateTime<Utc>,
    pub consecutive_far: u32,
}

impl RidingSession {
    pub fn new(observer_id: String, entity_id: String, boarded_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            observer_id,
            entity_id,
            boarded_at,
            consecutive_far: 0,
        }
    }
}
