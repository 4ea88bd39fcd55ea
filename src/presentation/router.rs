// Route table for the dashboard API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    forecast, health_check, list_months, station_ranking, summary, trend, unit_stations,
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is handled in the response builders, so no CompressionLayer here
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/months", get(list_months))
        .route("/summary", get(summary))
        .route("/stations/ranking", get(station_ranking))
        .route("/units/:unit/stations", get(unit_stations))
        .route("/trend", get(trend))
        .route("/forecast", get(forecast))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
