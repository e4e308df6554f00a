pub mod advice;
pub mod config;
pub mod distance;
pub mod error;
pub mod geocoding;
pub mod gpx_export;
pub mod models;
pub mod planner;
pub mod poi;
pub mod polyline;
pub mod routing;
pub mod sampler;
pub mod session;
pub mod snapshot;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::advice::{FAILED_ADVICE, GeminiClient, TripAdvisor};
use crate::config::AppConfig;
use crate::geocoding::{GeocodingClient, should_search};
use crate::gpx_export::{encode_trip_as_gpx, encode_trip_as_gpx_base64};
use crate::models::{
    AdviceResponse, ApiError, FeaturesResponse, GeocodeParams, Location, TripPlan, TripRequest,
    TripSnapshot,
};
use crate::planner::TripPlanner;
use crate::poi::PoiAggregator;
use crate::routing::RoutingClient;
use crate::session::TripSession;
use crate::snapshot::{build_snapshot, file_stem};

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<GeocodingClient>,
    pub planner: Arc<TripPlanner>,
    /// Absent when no text-generation key is configured.
    pub advisor: Option<TripAdvisor>,
    pub session: Arc<TripSession>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        let planner = TripPlanner::new(
            RoutingClient::from_config(http.clone(), config),
            PoiAggregator::from_config(http.clone(), config),
        );
        let advisor = GeminiClient::from_config(http.clone(), &config.gemini)
            .map(|client| TripAdvisor::new(Arc::new(client)));

        Ok(Self {
            geocoder: Arc::new(GeocodingClient::from_config(http, config)),
            planner: Arc::new(planner),
            advisor,
            session: Arc::new(TripSession::new()),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/geocode", get(geocode_handler))
        .route(
            "/api/trip",
            post(plan_handler)
                .get(current_trip_handler)
                .delete(reset_handler),
        )
        .route("/api/trip/advice", post(advice_handler))
        .route("/api/trip/features", get(features_handler))
        .route("/api/trip/snapshot", get(snapshot_handler))
        .route("/api/trip/gpx", get(gpx_handler))
        .with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

async fn geocode_handler(
    State(state): State<AppState>,
    Query(params): Query<GeocodeParams>,
) -> Json<Vec<Location>> {
    if !should_search(&params.q) {
        return Json(Vec::new());
    }
    Json(state.geocoder.search(&params.q).await)
}

async fn plan_handler(
    State(state): State<AppState>,
    Json(req): Json<TripRequest>,
) -> ApiResult<Json<TripPlan>> {
    if !is_valid_location(&req.start) || !is_valid_location(&req.end) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid coordinates"));
    }

    let generation = state.session.begin();
    let Some(plan) = state.planner.plan(&req, generation).await else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "Could not find a route between these locations.",
        ));
    };

    if !state.session.commit(plan.clone()).await {
        return Err(api_error(
            StatusCode::CONFLICT,
            "A newer trip calculation replaced this one.",
        ));
    }

    Ok(Json(plan))
}

async fn current_trip_handler(State(state): State<AppState>) -> ApiResult<Json<TripPlan>> {
    current_plan(&state).await.map(Json)
}

async fn reset_handler(State(state): State<AppState>) -> StatusCode {
    state.session.reset().await;
    StatusCode::NO_CONTENT
}

async fn advice_handler(State(state): State<AppState>) -> ApiResult<Json<AdviceResponse>> {
    let (plan, cached) = state
        .session
        .current_with_advice()
        .await
        .ok_or_else(no_trip)?;
    if let Some(advice) = cached {
        return Ok(Json(AdviceResponse { advice }));
    }

    let Some(advisor) = &state.advisor else {
        return Ok(Json(AdviceResponse {
            advice: FAILED_ADVICE.to_string(),
        }));
    };

    let distance_km = (plan.route.distance / 1000.0).round().max(0.0) as u64;
    let advice = advisor
        .trip_advice(
            &plan.start.display_name,
            &plan.end.display_name,
            plan.vehicle,
            distance_km,
        )
        .await;
    state
        .session
        .store_advice(plan.generation, advice.clone())
        .await;

    Ok(Json(AdviceResponse { advice }))
}

async fn features_handler(State(state): State<AppState>) -> ApiResult<Json<FeaturesResponse>> {
    let plan = current_plan(&state).await?;
    let features = match &state.advisor {
        Some(advisor) => {
            advisor
                .geographic_features(&plan.start.display_name, &plan.end.display_name)
                .await
        }
        None => Vec::new(),
    };
    Ok(Json(FeaturesResponse { features }))
}

async fn snapshot_handler(State(state): State<AppState>) -> ApiResult<Json<TripSnapshot>> {
    let plan = current_plan(&state).await?;
    let mut snapshot = build_snapshot(&plan, chrono::Local::now().date_naive());
    match encode_trip_as_gpx_base64(&plan) {
        Ok(gpx) => snapshot.gpx_base64 = gpx,
        Err(err) => tracing::warn!("snapshot without GPX attachment: {err}"),
    }
    Ok(Json(snapshot))
}

async fn gpx_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let plan = current_plan(&state).await?;
    let xml = encode_trip_as_gpx(&plan)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()))?;
    let file_name: String = file_stem(&plan.start, &plan.end)
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "application/gpx+xml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}.gpx\""),
            ),
        ],
        xml,
    ))
}

async fn current_plan(state: &AppState) -> ApiResult<TripPlan> {
    state
        .session
        .current()
        .await
        .ok_or_else(no_trip)
}

fn no_trip() -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::NOT_FOUND, "No trip has been planned yet.")
}

fn is_valid_location(location: &Location) -> bool {
    (-90.0..=90.0).contains(&location.lat) && (-180.0..=180.0).contains(&location.lon)
}

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.to_string(),
        }),
    )
}
