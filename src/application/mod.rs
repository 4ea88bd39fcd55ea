// Application layer - Use cases and the ports they depend on
pub mod forecast_model;
pub mod forecast_service;
pub mod forecaster;
pub mod model_store;
pub mod report_service;
pub mod trainer;
pub mod transaction_source;
