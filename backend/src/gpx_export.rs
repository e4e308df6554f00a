use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::ExportError;
use crate::models::{Coordinate, Location, Poi, TripPlan};

const CREATOR: &str = "ecoroute";

/// GPX 1.1 document: the route as one track, endpoints and stations as waypoints.
pub fn encode_trip_as_gpx(plan: &TripPlan) -> Result<String, ExportError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };

    gpx.waypoints.push(place_waypoint(&plan.start, "Start"));
    gpx.waypoints.extend(plan.pois.iter().map(poi_waypoint));
    gpx.waypoints.push(place_waypoint(&plan.end, "Destination"));

    let mut track = Track {
        name: Some(format!(
            "{} to {}",
            plan.start.short_name(),
            plan.end.short_name()
        )),
        ..Default::default()
    };
    let mut segment = TrackSegment::new();
    segment
        .points
        .extend(plan.route.coordinates.iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn encode_trip_as_gpx_base64(plan: &TripPlan) -> Result<String, ExportError> {
    encode_trip_as_gpx(plan).map(|xml| BASE64.encode(xml))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

fn place_waypoint(location: &Location, role: &str) -> Waypoint {
    let mut waypoint = to_waypoint(&location.coordinate());
    waypoint.name = Some(format!("{role}: {}", location.short_name()));
    waypoint.description = Some(location.display_name.clone());
    waypoint
}

fn poi_waypoint(poi: &Poi) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(poi.lon, poi.lat));
    waypoint.name = Some(poi.name.clone());
    waypoint.description = poi.tags.get("operator").cloned();
    waypoint
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{PoiKind, RouteData, TripStats, VehicleType};

    fn sample_plan() -> TripPlan {
        let route = RouteData {
            coordinates: vec![Coordinate::new(48.8566, 2.3522), Coordinate::new(45.764, 4.8357)],
            distance: 465_000.0,
            duration: 16_200.0,
        };
        let pois = vec![Poi {
            id: 42,
            lat: 47.3,
            lon: 5.0,
            name: "Ionity Dijon".into(),
            kind: PoiKind::EvCharging,
            tags: BTreeMap::from([("operator".to_string(), "Ionity".to_string())]),
        }];
        TripPlan {
            generation: 1,
            start: Location {
                lat: 48.8566,
                lon: 2.3522,
                display_name: "Paris, Ile-de-France, France".into(),
            },
            end: Location {
                lat: 45.764,
                lon: 4.8357,
                display_name: "Lyon, Auvergne-Rhone-Alpes, France".into(),
            },
            vehicle: VehicleType::Ev,
            stats: TripStats::from_route(&route, &pois),
            route,
            pois,
        }
    }

    #[test]
    fn gpx_contains_track_and_stations() {
        let xml = encode_trip_as_gpx(&sample_plan()).unwrap();
        assert!(xml.contains("<trkpt"));
        assert!(xml.contains("Ionity Dijon"));
        assert!(xml.contains("Start: Paris"));
        assert!(xml.contains("Destination: Lyon"));
    }

    #[test]
    fn gpx_round_trips_through_reader() {
        let xml = encode_trip_as_gpx(&sample_plan()).unwrap();
        let parsed = gpx::read(xml.as_bytes()).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.tracks[0].segments[0].points.len(), 2);
        assert_eq!(parsed.waypoints.len(), 3);
    }

    #[test]
    fn base64_variant_is_not_empty() {
        assert!(!encode_trip_as_gpx_base64(&sample_plan()).unwrap().is_empty());
    }
}
