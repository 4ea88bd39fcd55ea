// Offline trainer - refits and persists the daily and monthly models
use std::sync::Arc;

use anyhow::Context;
use spklu_dashboard::application::trainer::Trainer;
use spklu_dashboard::infrastructure::config::load_config;
use spklu_dashboard::infrastructure::csv_source::source_from_settings;
use spklu_dashboard::infrastructure::logging::init_tracing;
use spklu_dashboard::infrastructure::model_store::FileModelStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config().context("Failed to load configuration")?;
    let source = source_from_settings(&config.source)?;
    let records = source
        .load_transactions()
        .await
        .with_context(|| format!("Failed to load transactions from {}", source.describe()))?;
    tracing::info!("Training on {} transactions from {}", records.len(), source.describe());

    let store = Arc::new(FileModelStore::new(config.models.dir.clone()));
    let trainer = Trainer::new(config.training, store);

    let mut failed = Vec::new();
    for (granularity, result) in trainer.train_all(&records) {
        if let Err(e) = result {
            tracing::error!("{:#}", e);
            failed.push(granularity.to_string());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Training failed for: {}", failed.join(", "));
    }

    tracing::info!("Models written to {}", config.models.dir.display());
    Ok(())
}
