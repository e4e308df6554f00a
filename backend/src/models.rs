pub use shared::{
    AdviceResponse, ApiError, Coordinate, FeaturesResponse, Location, Poi, PoiKind, RouteData,
    SnapshotStop, TripPlan, TripRequest, TripSnapshot, TripStats, VehicleType,
};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    #[serde(default)]
    pub q: String,
}
