// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use spklu_dashboard::application::forecast_service::ForecastService;
use spklu_dashboard::application::report_service::ReportService;
use spklu_dashboard::infrastructure::config::load_config;
use spklu_dashboard::infrastructure::csv_source::source_from_settings;
use spklu_dashboard::infrastructure::logging::init_tracing;
use spklu_dashboard::infrastructure::model_store::FileModelStore;
use spklu_dashboard::presentation::app_state::AppState;
use spklu_dashboard::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = load_config().context("Failed to load configuration")?;

    // Load transactions once; the dashboard serves this snapshot
    let source = source_from_settings(&config.source)?;
    let records = Arc::new(
        source
            .load_transactions()
            .await
            .with_context(|| format!("Failed to load transactions from {}", source.describe()))?,
    );
    tracing::info!("Loaded {} transactions from {}", records.len(), source.describe());

    // Create services (application layer)
    let store = FileModelStore::new(config.models.dir.clone());
    let report_service = ReportService::new(records.clone());
    let forecast_service = ForecastService::new(records, &store, config.forecast.limits());

    let state = Arc::new(AppState {
        report_service,
        forecast_service,
        default_method: config.forecast.default_method,
    });

    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .with_context(|| format!("Invalid server address '{}'", config.server.address))?;
    tracing::info!("Starting spklu-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
