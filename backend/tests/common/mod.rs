#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use ecoroute::{
    AppState,
    config::AppConfig,
    models::Coordinate,
    polyline,
    sampler::SamplingPolicy,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub const ROUTE_DISTANCE_M: f64 = 465_432.0;
pub const ROUTE_DURATION_S: f64 = 16_500.0;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn paris_to_lyon() -> Vec<Coordinate> {
    vec![
        Coordinate::new(48.8566, 2.3522),
        Coordinate::new(48.20, 2.80),
        Coordinate::new(47.32, 5.04),
        Coordinate::new(46.30, 4.83),
        Coordinate::new(45.764, 4.8357),
    ]
}

pub async fn nominatim() -> String {
    let app = Router::new().route(
        "/search",
        get(|| async {
            Json(json!([
                {"lat": "48.8566", "lon": "2.3522", "display_name": "Paris, Ile-de-France, France"},
                {"lat": "33.6617", "lon": "-95.5555", "display_name": "Paris, Texas, United States"}
            ]))
        }),
    );
    format!("{}/search", spawn(app).await)
}

/// OSRM stand-in answering every path with `body`.
pub async fn osrm(status: StatusCode, body: Value) -> String {
    let app = Router::new().fallback(move || {
        let body = body.clone();
        async move { (status, Json(body)) }
    });
    format!("{}/route/v1/driving", spawn(app).await)
}

pub fn osrm_route(coordinates: &[Coordinate]) -> Value {
    json!({
        "code": "Ok",
        "routes": [{
            "geometry": polyline::encode(coordinates),
            "distance": ROUTE_DISTANCE_M,
            "duration": ROUTE_DURATION_S
        }]
    })
}

#[derive(Debug, Deserialize)]
struct OverpassForm {
    data: String,
}

/// Overpass stand-in that records each query it receives.
#[derive(Clone, Default)]
pub struct Overpass {
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl Overpass {
    pub async fn serve(&self, elements: Value) -> String {
        let queries = self.queries.clone();
        let app = Router::new().route(
            "/api/interpreter",
            post(move |Form(form): Form<OverpassForm>| {
                let elements = elements.clone();
                let queries = queries.clone();
                async move {
                    queries.lock().unwrap().push(form.data);
                    Json(json!({ "version": 0.6, "elements": elements }))
                }
            }),
        );
        format!("{}/api/interpreter", spawn(app).await)
    }

    pub async fn failing(&self) -> String {
        let queries = self.queries.clone();
        let app = Router::new().route(
            "/api/interpreter",
            post(move |Form(form): Form<OverpassForm>| {
                let queries = queries.clone();
                async move {
                    queries.lock().unwrap().push(form.data);
                    (StatusCode::GATEWAY_TIMEOUT, "rate limited")
                }
            }),
        );
        format!("{}/api/interpreter", spawn(app).await)
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

pub fn charger(id: i64, lat: f64, lon: f64, name: &str) -> Value {
    json!({
        "type": "node",
        "id": id,
        "lat": lat,
        "lon": lon,
        "tags": {"amenity": "charging_station", "name": name, "operator": "Ionity"}
    })
}

/// Text-generation stand-in: a JSON array for feature prompts, prose otherwise.
pub async fn gemini(expected_key: &'static str) -> String {
    let app = Router::new().fallback(move |headers: HeaderMap, Json(body): Json<Value>| async move {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok());
        if key != Some(expected_key) {
            return (StatusCode::FORBIDDEN, Json(json!({"error": "bad key"}))).into_response();
        }
        let prompt = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        let text = if prompt.contains("JSON array") {
            "```json\n[\"Morvan\", \"Saone river\"]\n```"
        } else {
            "Plan one charging stop near Dijon."
        };
        Json(json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})).into_response()
    });
    spawn(app).await
}

pub fn config(nominatim_url: String, osrm_url: String, overpass: Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();
    config.nominatim_url = nominatim_url;
    config.osrm_url = osrm_url;
    config.overpass_endpoints = overpass;
    config.request_timeout = Duration::from_secs(5);
    config.sampling = SamplingPolicy::FixedStride { max_points: 3 };
    config
}

pub fn state(config: &AppConfig) -> AppState {
    AppState::from_config(config).unwrap()
}
