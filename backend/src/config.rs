use std::{env, net::SocketAddr, ops::RangeInclusive, str::FromStr, time::Duration};

use thiserror::Error;

use crate::sampler::SamplingPolicy;

pub const USER_AGENT: &str = concat!("ecoroute/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org/route/v1/driving";
pub const DEFAULT_OVERPASS_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_POI_RADIUS_M: u32 = 5_000;
/// Radii that keep an Overpass `around` query both useful and affordable.
pub const USUAL_POI_RADIUS_M: RangeInclusive<u32> = 3_000..=5_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_GEOCODE_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must list at least one URL")]
    Empty(&'static str),
}

/// Runtime settings, read from `ECOROUTE_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub nominatim_url: String,
    pub osrm_url: String,
    /// Tried in order until one answers.
    pub overpass_endpoints: Vec<String>,
    pub poi_radius_m: u32,
    /// Bound on every single outbound request, including each Overpass attempt.
    pub request_timeout: Duration,
    pub sampling: SamplingPolicy,
    pub geocode_limit: usize,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            overpass_endpoints: DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|url| url.to_string())
                .collect(),
            poi_radius_m: DEFAULT_POI_RADIUS_M,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sampling: SamplingPolicy::default(),
            geocode_limit: DEFAULT_GEOCODE_LIMIT,
            gemini: GeminiConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_URL.to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults
    /// for unset or blank keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(raw) = get("ECOROUTE_BIND") {
            config.bind_addr = parse_value("ECOROUTE_BIND", &raw)?;
        }
        if let Some(url) = get("ECOROUTE_NOMINATIM_URL") {
            config.nominatim_url = url.trim().to_string();
        }
        if let Some(url) = get("ECOROUTE_OSRM_URL") {
            config.osrm_url = url.trim().to_string();
        }
        if let Some(raw) = get("ECOROUTE_OVERPASS_ENDPOINTS") {
            config.overpass_endpoints = split_list(&raw);
            if config.overpass_endpoints.is_empty() {
                return Err(ConfigError::Empty("ECOROUTE_OVERPASS_ENDPOINTS"));
            }
        }
        if let Some(raw) = get("ECOROUTE_POI_RADIUS_M") {
            let radius_m = parse_value("ECOROUTE_POI_RADIUS_M", &raw)?;
            config.poi_radius_m = checked_poi_radius("ECOROUTE_POI_RADIUS_M", radius_m)?;
        }
        if let Some(raw) = get("ECOROUTE_TIMEOUT_SECS") {
            let secs: u64 = parse_value("ECOROUTE_TIMEOUT_SECS", &raw)?;
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(raw) = get("ECOROUTE_SAMPLING") {
            config.sampling = parse_value("ECOROUTE_SAMPLING", &raw)?;
        }
        if let Some(raw) = get("ECOROUTE_GEOCODE_LIMIT") {
            config.geocode_limit = parse_value("ECOROUTE_GEOCODE_LIMIT", &raw)?;
        }

        config.gemini.api_key = get("GEMINI_API_KEY");
        if let Some(model) = get("ECOROUTE_GEMINI_MODEL") {
            config.gemini.model = model.trim().to_string();
        }
        if let Some(url) = get("ECOROUTE_GEMINI_URL") {
            config.gemini.base_url = url.trim().to_string();
        }

        Ok(config)
    }

    /// Shared HTTP client for every outbound service.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .build()
    }
}

/// Rejects a zero radius and warns about ones outside [`USUAL_POI_RADIUS_M`].
pub fn checked_poi_radius(key: &'static str, radius_m: u32) -> Result<u32, ConfigError> {
    if radius_m == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: radius_m.to_string(),
            reason: "search radius must be positive".to_string(),
        });
    }
    if !USUAL_POI_RADIUS_M.contains(&radius_m) {
        tracing::warn!(
            "{key}={radius_m} m is outside the usual {}-{} m station search radius",
            USUAL_POI_RADIUS_M.start(),
            USUAL_POI_RADIUS_M.end()
        );
    }
    Ok(radius_m)
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
