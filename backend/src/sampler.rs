use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{distance::haversine_km, models::Coordinate};

pub const DEFAULT_INTERVAL_KM: f64 = 25.0;
pub const DEFAULT_MAX_POINTS: usize = 40;
const MIN_STRIDE_POINTS: usize = 2;

/// How a dense route polyline is thinned into POI query anchors.
///
/// Both policies keep the first and last point, preserve ordering, never
/// emit the final point twice and never return more than `max_points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Keep a point once it lies at least `interval_km` from the last kept one,
    /// then thin by stride if more than `max_points` survive.
    DistanceThreshold {
        interval_km: f64,
        #[serde(default = "default_max_points")]
        max_points: usize,
    },
    /// Keep every `ceil(n / max_points)`-th point, capped at `max_points`.
    FixedStride { max_points: usize },
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::DistanceThreshold {
            interval_km: DEFAULT_INTERVAL_KM,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

fn default_max_points() -> usize {
    DEFAULT_MAX_POINTS
}

impl SamplingPolicy {
    pub fn sample(&self, coordinates: &[Coordinate]) -> Vec<Coordinate> {
        match *self {
            SamplingPolicy::DistanceThreshold {
                interval_km,
                max_points,
            } => sample_by_stride(&sample_by_distance(coordinates, interval_km), max_points),
            SamplingPolicy::FixedStride { max_points } => sample_by_stride(coordinates, max_points),
        }
    }
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingPolicy::DistanceThreshold {
                interval_km,
                max_points,
            } => write!(f, "distance:{interval_km}:{max_points}"),
            SamplingPolicy::FixedStride { max_points } => write!(f, "stride:{max_points}"),
        }
    }
}

/// Parses `distance`, `distance:<km>`, `distance:<km>:<max points>`, `stride`
/// or `stride:<max points>`.
impl FromStr for SamplingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.trim().split_once(':') {
            Some((kind, arg)) => (kind.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };

        match kind {
            "distance" => {
                let (km, cap) = match arg.map(|arg| arg.split_once(':')) {
                    Some(Some((km, cap))) => (Some(km.trim()), Some(cap.trim())),
                    Some(None) => (arg, None),
                    None => (None, None),
                };
                let interval_km = match km {
                    Some(raw) => raw
                        .parse::<f64>()
                        .ok()
                        .filter(|km| km.is_finite() && *km > 0.0)
                        .ok_or_else(|| format!("invalid sampling interval `{raw}`"))?,
                    None => DEFAULT_INTERVAL_KM,
                };
                Ok(SamplingPolicy::DistanceThreshold {
                    interval_km,
                    max_points: parse_max_points(cap)?,
                })
            }
            "stride" => Ok(SamplingPolicy::FixedStride {
                max_points: parse_max_points(arg)?,
            }),
            other => Err(format!(
                "unknown sampling policy `{other}` (expected `distance[:km]` or `stride[:n]`)"
            )),
        }
    }
}

fn parse_max_points(raw: Option<&str>) -> Result<usize, String> {
    match raw {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| format!("invalid sampling point count `{raw}`")),
        None => Ok(DEFAULT_MAX_POINTS),
    }
}

/// Distance thinning alone, without the point cap.
pub fn sample_by_distance(coordinates: &[Coordinate], interval_km: f64) -> Vec<Coordinate> {
    let Some((&first, rest)) = coordinates.split_first() else {
        return Vec::new();
    };

    let mut sampled = vec![first];
    let mut last_kept = first;
    let mut last_kept_is_final = rest.is_empty();

    for (i, &point) in rest.iter().enumerate() {
        if haversine_km(last_kept, point) >= interval_km {
            sampled.push(point);
            last_kept = point;
            last_kept_is_final = i + 1 == rest.len();
        }
    }

    if !last_kept_is_final {
        sampled.push(coordinates[coordinates.len() - 1]);
    }

    sampled
}

pub fn sample_by_stride(coordinates: &[Coordinate], max_points: usize) -> Vec<Coordinate> {
    let max_points = max_points.max(MIN_STRIDE_POINTS);
    let n = coordinates.len();
    if n <= max_points {
        return coordinates.to_vec();
    }

    let step = n.div_ceil(max_points);
    let mut sampled: Vec<Coordinate> = coordinates.iter().step_by(step).copied().collect();
    let last_index = (n - 1) / step * step;

    if last_index != n - 1 {
        let last = coordinates[n - 1];
        if sampled.len() < max_points {
            sampled.push(last);
        } else if let Some(slot) = sampled.last_mut() {
            *slot = last;
        }
    }

    sampled
}
