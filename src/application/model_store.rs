// Persistence slots for trained forecast models
use crate::domain::error::Result;
use crate::domain::series::Granularity;
use crate::infrastructure::gbdt::GradientBoostedRegressor;

/// One artifact per granularity. Saving replaces whatever the slot held.
pub trait ModelStore: Send + Sync {
    /// Fails with `ForecastError::ModelLoadFailure` when the slot is empty or unreadable
    fn load(&self, granularity: Granularity) -> Result<GradientBoostedRegressor>;

    fn save(&self, granularity: Granularity, model: &GradientBoostedRegressor) -> anyhow::Result<()>;
}
