//! Charging and fuel stations along a route, via the Overpass API.
//!
//! The route is thinned to a handful of anchors (see [`crate::sampler`]), all
//! anchors go out in one batched `around` query, and the merged answer is
//! deduplicated by OSM id with the first occurrence kept. Endpoints are tried
//! one after another; when none answers the caller gets an empty list.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Write as _,
    time::Duration,
};

use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::AppConfig,
    error::ServiceError,
    models::{Coordinate, Poi, VehicleType},
    sampler::SamplingPolicy,
};

const SERVICE: &str = "poi";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

/// Overpass QL selecting `amenity=<vehicle amenity>` nodes around every anchor.
pub fn build_query(
    anchors: &[Coordinate],
    vehicle: VehicleType,
    radius_m: u32,
    timeout_secs: u64,
) -> String {
    let amenity = vehicle.amenity();
    let mut query = format!("[out:json][timeout:{timeout_secs}];(");
    for anchor in anchors {
        // Writing into a String cannot fail.
        let _ = write!(
            query,
            "node[\"amenity\"=\"{amenity}\"](around:{radius_m},{},{});",
            anchor.lat, anchor.lon
        );
    }
    query.push_str(");out body;>;out skel qt;");
    query
}

/// Turns raw elements into POIs: first occurrence of an id wins, elements
/// without coordinates are dropped, and the kind comes from `vehicle` alone.
pub fn merge_elements<I>(elements: I, vehicle: VehicleType) -> Vec<Poi>
where
    I: IntoIterator<Item = OverpassElement>,
{
    let mut seen = HashSet::new();
    let mut pois = Vec::new();

    for element in elements {
        let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
            continue;
        };
        if !seen.insert(element.id) {
            continue;
        }

        let tags = element.tags.unwrap_or_default();
        let name = tags
            .get("name")
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| vehicle.default_poi_name().to_string());

        pois.push(Poi {
            id: element.id,
            lat,
            lon,
            name,
            kind: vehicle.poi_kind(),
            tags,
        });
    }

    pois
}

pub struct PoiAggregator {
    http: Client,
    endpoints: Vec<String>,
    radius_m: u32,
    timeout: Duration,
    sampling: SamplingPolicy,
}

impl PoiAggregator {
    pub fn new(
        http: Client,
        endpoints: Vec<String>,
        radius_m: u32,
        timeout: Duration,
        sampling: SamplingPolicy,
    ) -> Self {
        Self {
            http,
            endpoints,
            radius_m,
            timeout,
            sampling,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.overpass_endpoints.clone(),
            config.poi_radius_m,
            config.request_timeout,
            config.sampling,
        )
    }

    pub async fn pois_along_route(&self, coordinates: &[Coordinate], vehicle: VehicleType) -> Vec<Poi> {
        let anchors = self.sampling.sample(coordinates);
        tracing::debug!(
            "sampled {} anchor(s) from {} route point(s) with {}",
            anchors.len(),
            coordinates.len(),
            self.sampling
        );
        self.pois_near(&anchors, vehicle).await
    }

    /// Stations within the configured radius of any anchor; empty when every
    /// endpoint fails.
    pub async fn pois_near(&self, anchors: &[Coordinate], vehicle: VehicleType) -> Vec<Poi> {
        match self.fetch(anchors, vehicle).await {
            Ok(pois) => pois,
            Err(err) => {
                tracing::warn!("continuing without stations: {err}");
                Vec::new()
            }
        }
    }

    pub async fn fetch(
        &self,
        anchors: &[Coordinate],
        vehicle: VehicleType,
    ) -> Result<Vec<Poi>, ServiceError> {
        if anchors.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_query(anchors, vehicle, self.radius_m, self.timeout.as_secs().max(1));
        let mut last_error = ServiceError::NoEndpoint(SERVICE);

        for (attempt, endpoint) in self.endpoints.iter().enumerate() {
            match self.query_endpoint(endpoint, &query).await {
                Ok(elements) => {
                    let pois = merge_elements(elements, vehicle);
                    tracing::info!(
                        "{} {} station(s) from {endpoint} (attempt {})",
                        pois.len(),
                        vehicle.amenity(),
                        attempt + 1
                    );
                    return Ok(pois);
                }
                Err(err) => {
                    tracing::warn!("overpass endpoint {endpoint} failed: {err}");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    async fn query_endpoint(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<Vec<OverpassElement>, ServiceError> {
        let response = self
            .http
            .post(endpoint)
            .timeout(self.timeout)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(ServiceError::transport(SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: SERVICE,
                status,
            });
        }

        let body: OverpassResponse = response.json().await.map_err(|err| ServiceError::Payload {
            service: SERVICE,
            reason: err.to_string(),
        })?;
        Ok(body.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: i64, name: Option<&str>) -> OverpassElement {
        OverpassElement {
            id,
            lat: Some(37.77),
            lon: Some(-122.42),
            tags: name.map(|name| BTreeMap::from([("name".to_string(), name.to_string())])),
        }
    }

    #[test]
    fn query_has_one_clause_per_anchor() {
        let anchors = [Coordinate::new(37.77, -122.42), Coordinate::new(37.8, -122.27)];
        let query = build_query(&anchors, VehicleType::Ev, 3000, 25);
        assert_eq!(
            query,
            "[out:json][timeout:25];(\
             node[\"amenity\"=\"charging_station\"](around:3000,37.77,-122.42);\
             node[\"amenity\"=\"charging_station\"](around:3000,37.8,-122.27);\
             );out body;>;out skel qt;"
        );
    }

    #[test]
    fn fuel_query_uses_fuel_amenity() {
        let query = build_query(&[Coordinate::new(1.0, 2.0)], VehicleType::Ice, 5000, 10);
        assert!(query.contains("node[\"amenity\"=\"fuel\"](around:5000,1,2);"));
    }

    #[test]
    fn duplicates_collapse_to_first_seen() {
        let pois = merge_elements(
            vec![element(42, Some("First")), element(7, None), element(42, Some("Second"))],
            VehicleType::Ev,
        );
        assert_eq!(pois.len(), 2);
        assert_eq!(pois[0].id, 42);
        assert_eq!(pois[0].name, "First");
        assert_eq!(pois[1].id, 7);
    }

    #[test]
    fn kind_and_placeholder_follow_vehicle() {
        let mut fuel_tagged = element(1, None);
        fuel_tagged.tags = Some(BTreeMap::from([("amenity".to_string(), "fuel".to_string())]));

        let ev = merge_elements(vec![fuel_tagged.clone()], VehicleType::Ev);
        assert_eq!(ev[0].kind, crate::models::PoiKind::EvCharging);
        assert_eq!(ev[0].name, "Charging Station");

        let ice = merge_elements(vec![fuel_tagged], VehicleType::Ice);
        assert_eq!(ice[0].kind, crate::models::PoiKind::Fuel);
        assert_eq!(ice[0].name, "Gas Station");
    }

    #[test]
    fn elements_without_coordinates_are_skipped() {
        let way = OverpassElement {
            id: 9,
            lat: None,
            lon: None,
            tags: None,
        };
        assert!(merge_elements(vec![way], VehicleType::Ice).is_empty());
    }

    #[test]
    fn parses_overpass_payload() {
        let body: OverpassResponse = serde_json::from_str(
            r#"{"version":0.6,"elements":[
                {"type":"node","id":42,"lat":37.77,"lon":-122.42,"tags":{"amenity":"charging_station","operator":"Tesla"}},
                {"type":"node","id":43,"lat":37.8,"lon":-122.27}
            ]}"#,
        )
        .unwrap();
        let pois = merge_elements(body.elements, VehicleType::Ev);
        assert_eq!(pois.len(), 2);
        assert_eq!(pois[0].tags.get("operator").map(String::as_str), Some("Tesla"));
        assert!(pois[1].tags.is_empty());
    }

    #[tokio::test]
    async fn no_endpoints_yields_empty_list() {
        let aggregator = PoiAggregator::new(
            Client::new(),
            Vec::new(),
            3000,
            Duration::from_secs(1),
            SamplingPolicy::default(),
        );
        let anchors = [Coordinate::new(37.77, -122.42)];
        assert!(aggregator.pois_near(&anchors, VehicleType::Ev).await.is_empty());
        assert!(matches!(
            aggregator.fetch(&anchors, VehicleType::Ev).await,
            Err(ServiceError::NoEndpoint(_))
        ));
    }
}
