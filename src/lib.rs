// SPKLU dashboard - transaction reports and forecasting
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
