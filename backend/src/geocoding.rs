use std::{num::NonZeroUsize, sync::Mutex};

use lru::LruCache;
use reqwest::Client;
use serde::Deserialize;

use crate::{config::AppConfig, error::ServiceError, models::Location};

const SERVICE: &str = "geocoding";
/// Shorter queries are not worth a round trip.
pub const MIN_QUERY_LEN: usize = 3;
const CACHE_CAPACITY: usize = 128;

pub fn should_search(query: &str) -> bool {
    query.trim().chars().count() >= MIN_QUERY_LEN
}

/// Nominatim sends coordinates as strings; some compatible servers send numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Degrees::Number(value) => Some(*value),
            Degrees::Text(text) => text.trim().parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Degrees,
    lon: Degrees,
    #[serde(default)]
    display_name: String,
}

impl Place {
    fn into_location(self) -> Option<Location> {
        Some(Location {
            lat: self.lat.value()?,
            lon: self.lon.value()?,
            display_name: self.display_name,
        })
    }
}

pub struct GeocodingClient {
    http: Client,
    base_url: String,
    limit: usize,
    cache: Mutex<LruCache<String, Vec<Location>>>,
}

impl GeocodingClient {
    pub fn new(http: Client, base_url: impl Into<String>, limit: usize) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            base_url: base_url.into(),
            limit: limit.max(1),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(http, config.nominatim_url.clone(), config.geocode_limit)
    }

    /// Candidate places for a free-text query; empty on no match or any failure.
    pub async fn search(&self, query: &str) -> Vec<Location> {
        match self.fetch(query).await {
            Ok(locations) => locations,
            Err(err) => {
                tracing::warn!("location search for {query:?} failed: {err}");
                Vec::new()
            }
        }
    }

    pub async fn fetch(&self, query: &str) -> Result<Vec<Location>, ServiceError> {
        let key = cache_key(query);
        if let Some(hit) = self.cached(&key) {
            tracing::debug!("geocode cache hit for {key:?}");
            return Ok(hit);
        }

        let limit = self.limit.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query.trim()),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
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

        let places: Vec<Place> = response.json().await.map_err(|err| ServiceError::Payload {
            service: SERVICE,
            reason: err.to_string(),
        })?;

        let locations: Vec<Location> = places
            .into_iter()
            .filter_map(Place::into_location)
            .take(self.limit)
            .collect();
        tracing::debug!("geocoded {query:?} to {} candidate(s)", locations.len());

        if !locations.is_empty() {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, locations.clone());
            }
        }

        Ok(locations)
    }

    fn cached(&self, key: &str) -> Option<Vec<Location>> {
        self.cache.lock().ok()?.get(key).cloned()
    }
}

fn cache_key(query: &str) -> String {
    query.trim().to_lowercase()
}
