// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::pricing_service::PricingService;
use crate::application::refresh_service::RefreshService;
use crate::application::snapshot_service::SnapshotService;
use crate::infrastructure::barchart_client::BarchartClient;
use crate::infrastructure::config::{load_geography, load_settings};
use crate::infrastructure::mysql_repository::MySqlRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    admin_refresh, area_trends, geo_prices, health_check, local_prices, national_prices,
    national_trends, state_prices, station_detail, station_history, stats,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings().context("Failed to load settings")?;
    let geography = Arc::new(load_geography().context("Failed to load geography tables")?);

    // Create adapters (infrastructure layer); the process stops here without a database
    let repository = Arc::new(MySqlRepository::connect(&settings.database).await?);
    repository.migrate().await?;
    let source = Arc::new(BarchartClient::new(&settings.upstream)?);

    // Create services (application layer)
    let pricing_service = PricingService::new(
        source,
        SnapshotService::new(repository.clone()),
        repository.clone(),
        geography,
    );
    let refresh = RefreshService::new(pricing_service.clone(), settings.refresh.schedule()).spawn();

    // Create application state
    let admin_api_key = settings.admin.secret();
    if admin_api_key.is_none() {
        tracing::warn!("No admin API key configured, admin endpoints are disabled");
    }
    let state = Arc::new(AppState {
        pricing_service,
        admin_api_key,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/gas-prices", get(local_prices))
        .route("/api/gas-prices/geo", get(geo_prices))
        .route("/api/gas-prices/state/:state", get(state_prices))
        .route("/api/gas-prices/national", get(national_prices))
        .route("/api/gas-prices/trends/national", get(national_trends))
        .route("/api/gas-prices/trends/state/:state", get(area_trends))
        .route("/api/gas-stations/:station_id", get(station_detail))
        .route("/api/gas-stations/:station_id/history", get(station_history))
        .route("/api/stats", get(stats))
        .route("/api/admin/refresh/:zip_code", post(admin_refresh))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    tracing::info!(%addr, "Starting fuel price service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    repository.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutting down");
}
