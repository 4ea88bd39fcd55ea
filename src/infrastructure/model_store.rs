// Filesystem model store: one JSON artifact per granularity
use crate::application::model_store::ModelStore;
use crate::domain::error::{ForecastError, Result};
use crate::domain::features::FeatureSchema;
use crate::domain::series::Granularity;
use crate::infrastructure::gbdt::GradientBoostedRegressor;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, granularity: Granularity) -> PathBuf {
        self.dir.join(format!("model_{}.json", granularity))
    }

    fn load_failure(granularity: Granularity, path: &Path, reason: impl std::fmt::Display) -> ForecastError {
        ForecastError::ModelLoadFailure {
            granularity,
            reason: format!("{}: {}", path.display(), reason),
        }
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, granularity: Granularity) -> Result<GradientBoostedRegressor> {
        let path = self.path_for(granularity);
        let json = fs::read_to_string(&path)
            .map_err(|e| Self::load_failure(granularity, &path, e))?;
        let model: GradientBoostedRegressor =
            serde_json::from_str(&json).map_err(|e| Self::load_failure(granularity, &path, e))?;

        let expected = FeatureSchema::for_granularity(granularity).feature_names();
        model
            .validate(&expected)
            .map_err(|e| Self::load_failure(granularity, &path, e))?;
        Ok(model)
    }

    fn save(&self, granularity: Granularity, model: &GradientBoostedRegressor) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create model directory {}", self.dir.display()))?;

        let path = self.path_for(granularity);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(model).context("Failed to serialize model")?;

        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::debug!("Saved {} model to {}", granularity, path.display());
        Ok(())
    }
}
