use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::ingest::{ParsedRoute, Parser};
use crate::types::path::Waypoint;

/// Reads an authored GPX route. Both `<rtept>` and `<trkpt>` become
/// waypoints; a `<name>` child marks the waypoint as a named stop.
pub struct GpxParser;

fn point_from_attributes(e: &BytesStart) -> Result<Option<Waypoint>, ParseError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

        match key {
            "lat" => lat = value.parse().ok(),
            "lon" => lon = value.parse().ok(),
            _ => {}
        }
    }

    Ok(lat.zip(lon).map(|(lat, lon)| Waypoint {
        lat,
        lon,
        is_stop: false,
        stop_label: None,
    }))
}

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedRoute, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut route_name: Option<String> = None;
        let mut waypoints = Vec::new();
        let mut in_point = false;
        let mut in_route_name = false;
        let mut current_point: Option<Waypoint> = None;
        let mut current_element = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    if name_str == "rtept" || name_str == "trkpt" {
                        in_point = true;
                        current_point = point_from_attributes(&e)?;
                    } else if in_point {
                        current_element = name_str.to_string();
                    } else if name_str == "name" {
                        in_route_name = true;
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    // Self-closing point: no children, complete as-is.
                    if name_str == "rtept" || name_str == "trkpt" {
                        if let Some(point) = point_from_attributes(&e)? {
                            waypoints.push(point);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    if in_point {
                        if let Some(point) = current_point.as_mut() {
                            if current_element == "name" {
                                point.is_stop = true;
                                point.stop_label = Some(text.to_string());
                            }
                        }
                    } else if in_route_name && route_name.is_none() {
                        route_name = Some(text.to_string());
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    if name_str == "rtept" || name_str == "trkpt" {
                        if let Some(point) = current_point.take() {
                            waypoints.push(point);
                        }
                        in_point = false;
                        current_element.clear();
                    } else if name_str == "name" {
                        in_route_name = false;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if waypoints.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        Ok(ParsedRoute {
            name: route_name,
            color: None,
            linked_entity_id: None,
            waypoints,
        })
    }
}
