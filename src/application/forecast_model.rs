// Forecast model capability consumed by the recursive forecaster
use crate::domain::error::Result;
use crate::domain::features::FeatureRow;

/// A fitted regressor mapping one feature row to the next observation.
/// Implementations must reject rows whose feature names differ from the
/// schema they were trained with.
pub trait ForecastModel: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<f64>;
}
