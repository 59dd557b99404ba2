mod gpx;
mod json;

use crate::error::ParseError;
use crate::types::path::Waypoint;

/// An authored route as read from an upload, before it is validated
/// and registered as a Path.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
    pub name: Option<String>,
    pub color: Option<String>,
    pub linked_entity_id: Option<String>,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Copy)]
pub enum RouteFormat {
    Gpx,
    Json,
}

impl RouteFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_lowercase();
        match ext.as_str() {
            "gpx" => Some(RouteFormat::Gpx),
            "json" => Some(RouteFormat::Json),
            _ => None,
        }
    }
}

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedRoute, ParseError>;
}

pub fn parse(bytes: &[u8], format: RouteFormat) -> Result<ParsedRoute, ParseError> {
    match format {
        RouteFormat::Gpx => gpx::GpxParser.parse(bytes),
        RouteFormat::Json => json::JsonParser.parse(bytes),
    }
}
