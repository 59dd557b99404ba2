use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Axis-aligned lat/lon rectangle, e.g. a map viewport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingRegion {
    pub fn expanded(&self, padding_deg: f64) -> Self {
        Self {
            min_lat: self.min_lat - padding_deg,
            min_lon: self.min_lon - padding_deg,
            max_lat: self.max_lat + padding_deg,
            max_lon: self.max_lon + padding_deg,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}
