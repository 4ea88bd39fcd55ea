// Offline trainer - fits the daily and monthly models and persists them
use crate::application::model_store::ModelStore;
use crate::domain::error::Result;
use crate::domain::features::FeatureSchema;
use crate::domain::series::{Granularity, build_series};
use crate::domain::transaction::TransactionRecord;
use crate::infrastructure::gbdt::{BoostingParams, GradientBoostedRegressor};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub granularity: Granularity,
    pub periods: usize,
    pub rows: usize,
    pub trees: usize,
    /// In-sample mean absolute error
    pub mae: f64,
    /// In-sample root mean squared error
    pub rmse: f64,
}

pub struct Trainer {
    params: BoostingParams,
    store: Arc<dyn ModelStore>,
}

impl Trainer {
    pub fn new(params: BoostingParams, store: Arc<dyn ModelStore>) -> Self {
        Self { params, store }
    }

    /// Fit one model from raw records without persisting it.
    pub fn fit(
        &self,
        records: &[TransactionRecord],
        granularity: Granularity,
    ) -> Result<(GradientBoostedRegressor, TrainingReport)> {
        let schema = FeatureSchema::for_granularity(granularity);
        let series = build_series(records, granularity)?;
        let table = schema.training_table(&series)?;
        let matrix = table.matrix();

        let model = GradientBoostedRegressor::fit(
            schema.feature_names(),
            &matrix,
            &table.targets,
            &self.params,
        )?;

        let errors: Vec<f64> = matrix
            .iter()
            .zip(&table.targets)
            .map(|(row, target)| model.predict_values(row) - target)
            .collect();
        let n = errors.len() as f64;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

        let report = TrainingReport {
            granularity,
            periods: series.len(),
            rows: table.len(),
            trees: model.tree_count(),
            mae,
            rmse,
        };
        Ok((model, report))
    }

    /// Fit and replace the stored artifact for `granularity`.
    pub fn train(
        &self,
        records: &[TransactionRecord],
        granularity: Granularity,
    ) -> anyhow::Result<TrainingReport> {
        let (model, report) = self
            .fit(records, granularity)
            .with_context(|| format!("Failed to train {} model", granularity))?;
        self.store.save(granularity, &model)?;

        tracing::info!(
            "Trained {} model on {} rows ({} periods): {} trees, MAE {:.3}, RMSE {:.3}",
            granularity,
            report.rows,
            report.periods,
            report.trees,
            report.mae,
            report.rmse
        );
        Ok(report)
    }

    /// Train both granularities independently; one failing does not stop the other.
    pub fn train_all(
        &self,
        records: &[TransactionRecord],
    ) -> Vec<(Granularity, anyhow::Result<TrainingReport>)> {
        [Granularity::Daily, Granularity::Monthly]
            .into_iter()
            .map(|granularity| (granularity, self.train(records, granularity)))
            .collect()
    }
}
