use chrono::NaiveDate;

use crate::{
    models::{Location, SnapshotStop, TripPlan, TripSnapshot},
    polyline,
};

/// Stations drawn on the shareable card.
pub const MAX_SNAPSHOT_MARKERS: usize = 15;

pub fn build_snapshot(plan: &TripPlan, generated_on: NaiveDate) -> TripSnapshot {
    let route = &plan.route;
    let distance_km = route.distance / 1000.0;
    let total_minutes = (route.duration / 60.0).round().max(0.0) as u64;
    let avg_speed_kmh = if route.duration > 0.0 {
        (distance_km / (route.duration / 3600.0)).round() as u64
    } else {
        0
    };

    TripSnapshot {
        start: stop(&plan.start),
        end: stop(&plan.end),
        distance_km: (distance_km * 10.0).round() / 10.0,
        duration_hours: total_minutes / 60,
        duration_minutes: total_minutes % 60,
        avg_speed_kmh,
        markers: plan.pois.iter().take(MAX_SNAPSHOT_MARKERS).cloned().collect(),
        polyline: polyline::encode(&route.coordinates),
        generated_on: generated_on.format("%Y-%m-%d").to_string(),
        file_name: format!("{}.png", file_stem(&plan.start, &plan.end)),
        gpx_base64: String::new(),
    }
}

/// `trip-snapshot-<start>-to-<end>`, safe to use as a download name.
pub fn file_stem(start: &Location, end: &Location) -> String {
    format!(
        "trip-snapshot-{}-to-{}",
        slug(start.short_name()),
        slug(end.short_name())
    )
}

fn stop(location: &Location) -> SnapshotStop {
    let subtitle = location
        .display_name
        .split(',')
        .skip(1)
        .take(2)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    SnapshotStop {
        title: location.short_name().to_string(),
        subtitle,
        lat: location.lat,
        lon: location.lon,
    }
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "place".to_string()
    } else {
        slug.to_string()
    }
}
