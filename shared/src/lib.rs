use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A geocoded place, immutable once the user picked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// First comma-separated segment of the display name ("Paris" for "Paris, Ile-de-France, France").
    pub fn short_name(&self) -> &str {
        self.display_name
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }
}

/// Driving route, coordinates ordered start to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub coordinates: Vec<Coordinate>,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleType {
    #[default]
    #[serde(rename = "EV")]
    Ev,
    #[serde(rename = "ICE")]
    Ice,
}

impl VehicleType {
    /// OpenStreetMap `amenity` value searched for this vehicle.
    pub fn amenity(self) -> &'static str {
        match self {
            VehicleType::Ev => "charging_station",
            VehicleType::Ice => "fuel",
        }
    }

    pub fn poi_kind(self) -> PoiKind {
        match self {
            VehicleType::Ev => PoiKind::EvCharging,
            VehicleType::Ice => PoiKind::Fuel,
        }
    }

    pub fn default_poi_name(self) -> &'static str {
        match self {
            VehicleType::Ev => "Charging Station",
            VehicleType::Ice => "Gas Station",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VehicleType::Ev => "Electric Vehicle",
            VehicleType::Ice => "Combustion Engine Vehicle",
        }
    }
}

impl std::str::FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EV" => Ok(VehicleType::Ev),
            "ICE" => Ok(VehicleType::Ice),
            other => Err(format!("unknown vehicle type `{other}` (expected EV or ICE)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    EvCharging,
    Fuel,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PoiKind,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub start: Location,
    pub end: Location,
    #[serde(default)]
    pub vehicle: VehicleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStats {
    pub distance_km: f64,
    pub duration_min: f64,
    pub stations_found: usize,
}

impl TripStats {
    pub fn from_route(route: &RouteData, pois: &[Poi]) -> Self {
        Self {
            distance_km: route.distance / 1000.0,
            duration_min: route.duration / 60.0,
            stations_found: pois.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    /// Calculation sequence number the plan was produced under.
    pub generation: u64,
    pub start: Location,
    pub end: Location,
    pub vehicle: VehicleType,
    pub route: RouteData,
    pub pois: Vec<Poi>,
    pub stats: TripStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStop {
    pub title: String,
    pub subtitle: String,
    pub lat: f64,
    pub lon: f64,
}

/// Presentation-free content of the shareable trip card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub start: SnapshotStop,
    pub end: SnapshotStop,
    pub distance_km: f64,
    pub duration_hours: u64,
    pub duration_minutes: u64,
    pub avg_speed_kmh: u64,
    pub markers: Vec<Poi>,
    pub polyline: String,
    pub generated_on: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    pub advice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
