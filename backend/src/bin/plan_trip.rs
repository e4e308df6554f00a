use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ecoroute::{
    advice::{GeminiClient, TripAdvisor},
    config::{AppConfig, checked_poi_radius},
    geocoding::{GeocodingClient, should_search},
    gpx_export::encode_trip_as_gpx,
    models::{Location, TripPlan, TripRequest, VehicleType},
    planner::TripPlanner,
    poi::PoiAggregator,
    routing::RoutingClient,
    sampler::SamplingPolicy,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a drive between two places and list charging or fuel stations on the way"
)]
struct Args {
    /// Start location, free text (e.g. "Paris, France")
    #[arg(long)]
    from: String,

    /// Destination, free text
    #[arg(long)]
    to: String,

    /// EV looks for charging stations, ICE for fuel stations
    #[arg(long, default_value = "EV")]
    vehicle: VehicleType,

    /// Anchor sampling policy: `distance[:km]` or `stride[:max points]`
    #[arg(long, env = "ECOROUTE_SAMPLING")]
    sampling: Option<SamplingPolicy>,

    /// Search radius around each anchor, in meters
    #[arg(long, env = "ECOROUTE_POI_RADIUS_M")]
    radius: Option<u32>,

    /// Ask the text-generation service for trip insights (needs GEMINI_API_KEY)
    #[arg(long)]
    advice: bool,

    /// Write the trip as GPX to this path
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Print the plan as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(sampling) = args.sampling {
        config.sampling = sampling;
    }
    if let Some(radius) = args.radius {
        config.poi_radius_m = checked_poi_radius("--radius", radius)?;
    }

    let http = config.http_client()?;
    let geocoder = GeocodingClient::from_config(http.clone(), &config);
    let start = resolve(&geocoder, &args.from).await?;
    let end = resolve(&geocoder, &args.to).await?;

    let planner = TripPlanner::new(
        RoutingClient::from_config(http.clone(), &config),
        PoiAggregator::from_config(http.clone(), &config),
    );
    let request = TripRequest {
        start,
        end,
        vehicle: args.vehicle,
    };
    let plan = planner
        .plan(&request, 1)
        .await
        .ok_or("Could not find a route between these locations.")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_summary(&plan);
    }

    if let Some(path) = &args.gpx {
        std::fs::write(path, encode_trip_as_gpx(&plan)?)?;
        tracing::info!("GPX written to {}", path.display());
    }

    if args.advice {
        match GeminiClient::from_config(http, &config.gemini) {
            Some(client) => {
                let advisor = TripAdvisor::new(Arc::new(client));
                let distance_km = (plan.route.distance / 1000.0).round().max(0.0) as u64;
                let advice = advisor
                    .trip_advice(
                        &plan.start.display_name,
                        &plan.end.display_name,
                        plan.vehicle,
                        distance_km,
                    )
                    .await;
                println!("\nAI Insights\n{advice}");
                let features = advisor
                    .geographic_features(&plan.start.display_name, &plan.end.display_name)
                    .await;
                if !features.is_empty() {
                    println!("\nOn the way: {}", features.join(", "));
                }
            }
            None => eprintln!("--advice needs GEMINI_API_KEY to be set"),
        }
    }

    Ok(())
}

async fn resolve(
    geocoder: &GeocodingClient,
    query: &str,
) -> Result<Location, Box<dyn std::error::Error>> {
    if !should_search(query) {
        return Err(format!("`{query}` is too short to search for").into());
    }
    let candidates = geocoder.search(query).await;
    let Some(first) = candidates.into_iter().next() else {
        return Err(format!("no location found for `{query}`").into());
    };
    tracing::info!("{query} -> {} ({}, {})", first.display_name, first.lat, first.lon);
    Ok(first)
}

fn print_summary(plan: &TripPlan) {
    println!("From: {}", plan.start.display_name);
    println!("To:   {}", plan.end.display_name);
    println!("Distance:       {:.1} km", plan.stats.distance_km);
    println!("Est. Time:      {:.0} min", plan.stats.duration_min);
    println!("Stations Found: {}", plan.stats.stations_found);
    for poi in &plan.pois {
        let operator = poi
            .tags
            .get("operator")
            .map(|operator| format!(" [{operator}]"))
            .unwrap_or_default();
        println!("  - {}{operator} ({:.5}, {:.5})", poi.name, poi.lat, poi.lon);
    }
}
