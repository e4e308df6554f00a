use ecoroute::{AppState, config::AppConfig, create_router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecoroute=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "stations from {} overpass endpoint(s), {} m radius, sampling {}",
        config.overpass_endpoints.len(),
        config.poi_radius_m,
        config.sampling
    );

    let state = AppState::from_config(&config)?;
    if state.advisor.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, trip insights will answer with a placeholder");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state).layer(cors);

    let addr = config.bind_addr;
    tracing::info!("starting ecoroute on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  GET    /api/geocode?q= - Location candidates");
    tracing::info!("  POST   /api/trip - Plan a trip with stations along the route");
    tracing::info!("  GET    /api/trip - Current trip");
    tracing::info!("  DELETE /api/trip - Reset");
    tracing::info!("  POST   /api/trip/advice - AI trip insights");
    tracing::info!("  GET    /api/trip/features - Geographic features on the way");
    tracing::info!("  GET    /api/trip/snapshot - Shareable trip card");
    tracing::info!("  GET    /api/trip/gpx - GPX export");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
