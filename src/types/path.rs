use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::types::geo::Point;

/// A point on an authored route, optionally flagged as a named stop.
/// Waypoint order is travel direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub is_stop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_label: Option<String>,
}

impl Waypoint {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// An ordered route a shuttle drives, with at least two waypoints.
/// Treated as an immutable snapshot for the duration of a tracking
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<String>,
    pub waypoints: Vec<Waypoint>,
}

impl Path {
    pub fn new(
        id: String,
        name: String,
        color: String,
        linked_entity_id: Option<String>,
        waypoints: Vec<Waypoint>,
    ) -> Result<Self, PathError> {
        if waypoints.len() < 2 {
            return Err(PathError::TooFewWaypoints(waypoints.len()));
        }
        Ok(Self {
            id,
            name,
            color,
            linked_entity_id,
            waypoints,
        })
    }

    pub fn segment_count(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn points(&self) -> Vec<Point> {
        self.waypoints.iter().map(Waypoint::point).collect()
    }

    pub fn stop_markers(&self) -> Vec<StopMarker> {
        self.waypoints
            .iter()
            .filter(|w| w.is_stop)
            .map(|w| StopMarker {
                path_id: self.id.clone(),
                label: w.stop_label.clone().unwrap_or_default(),
                lat: w.lat,
                lon: w.lon,
            })
            .collect()
    }
}

/// A renderable stop pin, detached from its parent path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopMarker {
    pub path_id: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

impl StopMarker {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}
