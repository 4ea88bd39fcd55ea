// Infrastructure layer - External dependencies and adapters
pub mod arima;
pub mod config;
pub mod csv_source;
pub mod gbdt;
pub mod http_response;
pub mod logging;
pub mod model_store;
