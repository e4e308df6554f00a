use crate::{
    distance::path_length_km,
    models::{TripPlan, TripRequest, TripStats},
    poi::PoiAggregator,
    routing::RoutingClient,
};

/// Routing followed by station lookup, strictly in that order.
pub struct TripPlanner {
    routing: RoutingClient,
    pois: PoiAggregator,
}

impl TripPlanner {
    pub fn new(routing: RoutingClient, pois: PoiAggregator) -> Self {
        Self { routing, pois }
    }

    /// `None` only when no route connects the two locations. A failed station
    /// lookup still yields a plan, with no stations.
    pub async fn plan(&self, request: &TripRequest, generation: u64) -> Option<TripPlan> {
        tracing::info!(
            "planning #{generation}: {} -> {} ({:?})",
            request.start.display_name,
            request.end.display_name,
            request.vehicle
        );

        let route = self.routing.route(&request.start, &request.end).await?;
        tracing::debug!(
            "route geometry: {} point(s), {:.1} km as drawn",
            route.coordinates.len(),
            path_length_km(&route.coordinates)
        );
        let pois = self
            .pois
            .pois_along_route(&route.coordinates, request.vehicle)
            .await;
        let stats = TripStats::from_route(&route, &pois);

        tracing::info!(
            "plan #{generation}: {:.1} km, {:.0} min, {} station(s)",
            stats.distance_km,
            stats.duration_min,
            stats.stations_found
        );

        Some(TripPlan {
            generation,
            start: request.start.clone(),
            end: request.end.clone(),
            vehicle: request.vehicle,
            route,
            pois,
            stats,
        })
    }
}
