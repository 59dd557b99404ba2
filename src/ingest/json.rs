use serde::Deserialize;

use crate::error::ParseError;
use crate::ingest::{ParsedRoute, Parser};
use crate::types::path::Waypoint;

/// JSON body for an authored route, the format the path editor
/// produces. Unlike GPX it can carry a display color and the shuttle
/// the route belongs to.
#[derive(Debug, Deserialize)]
pub struct RouteSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub linked_entity_id: Option<String>,
    pub waypoints: Vec<WaypointSpec>,
}

#[derive(Debug, Deserialize)]
pub struct WaypointSpec {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub stop: Option<String>,
}

pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedRoute, ParseError> {
        let spec: RouteSpec =
            serde_json::from_slice(bytes).map_err(|e| ParseError::InvalidSpec(e.to_string()))?;

        if spec.waypoints.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let waypoints = spec
            .waypoints
            .into_iter()
            .map(|w| Waypoint {
                lat: w.lat,
                lon: w.lon,
                is_stop: w.stop.is_some(),
                stop_label: w.stop,
            })
            .collect();

        Ok(ParsedRoute {
            name: spec.name,
            color: spec.color,
            linked_entity_id: spec.linked_entity_id,
            waypoints,
        })
    }
}
