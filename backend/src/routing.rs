use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::AppConfig,
    error::ServiceError,
    models::{Location, RouteData},
    polyline,
};

const SERVICE: &str = "routing";
/// OSRM codes meaning the request was fine but the points cannot be connected.
const NO_ROUTE_CODES: [&str; 2] = ["NoRoute", "NoSegment"];

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    distance: f64,
    duration: f64,
}

impl OsrmResponse {
    fn reports_no_route(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| NO_ROUTE_CODES.contains(&code))
    }
}

/// Driving directions from an OSRM-compatible `route/v1/driving` service.
pub struct RoutingClient {
    http: Client,
    base_url: String,
}

impl RoutingClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(http, config.osrm_url.clone())
    }

    /// `None` means "no route found", whether the service said so or failed.
    pub async fn route(&self, start: &Location, end: &Location) -> Option<RouteData> {
        match self.fetch_route(start, end).await {
            Ok(route) => route,
            Err(err) => {
                tracing::error!(
                    "route lookup {} -> {} failed: {err}",
                    start.display_name,
                    end.display_name
                );
                None
            }
        }
    }

    pub async fn fetch_route(
        &self,
        start: &Location,
        end: &Location,
    ) -> Result<Option<RouteData>, ServiceError> {
        let url = self.route_url(start, end);
        tracing::debug!("requesting route {url}");

        let response = self
            .http
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "polyline")])
            .send()
            .await
            .map_err(ServiceError::transport(SERVICE))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ServiceError::transport(SERVICE))?;
        let parsed = serde_json::from_str::<OsrmResponse>(&body);

        if !status.is_success() {
            return match parsed {
                Ok(osrm) if osrm.reports_no_route() => {
                    tracing::info!(
                        "routing service found no route: {}",
                        osrm.message.unwrap_or_default()
                    );
                    Ok(None)
                }
                _ => Err(ServiceError::Status {
                    service: SERVICE,
                    status,
                }),
            };
        }

        let osrm = parsed.map_err(|err| ServiceError::Payload {
            service: SERVICE,
            reason: err.to_string(),
        })?;

        if osrm.reports_no_route() {
            return Ok(None);
        }

        let Some(route) = osrm.routes.into_iter().next() else {
            tracing::info!("routing service returned zero routes");
            return Ok(None);
        };

        let coordinates = polyline::decode(&route.geometry)?;
        tracing::debug!(
            "route decoded: {} points, {:.1} km, {:.0} min",
            coordinates.len(),
            route.distance / 1000.0,
            route.duration / 60.0
        );

        Ok(Some(RouteData {
            coordinates,
            distance: route.distance,
            duration: route.duration,
        }))
    }

    fn route_url(&self, start: &Location, end: &Location) -> String {
        format!(
            "{}/{},{};{},{}",
            self.base_url.trim_end_matches('/'),
            start.lon,
            start.lat,
            end.lon,
            end.lat
        )
    }
}
