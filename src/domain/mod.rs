// Domain layer - Core business models and rules
pub mod error;
pub mod features;
pub mod forecast;
pub mod report;
pub mod series;
pub mod transaction;
