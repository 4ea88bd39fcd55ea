// Configuration loading - file plus environment overrides
use crate::domain::forecast::{ForecastMethod, HorizonLimits};
use crate::infrastructure::gbdt::BoostingParams;
use serde::Deserialize;
use std::path::PathBuf;

const CONFIG_FILE: &str = "config/spklu";
const ENV_PREFIX: &str = "SPKLU";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub training: BoostingParams,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Url,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// Header names of the transaction export
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnMapping {
    pub id: String,
    pub payment_date: String,
    pub unit: String,
    pub station: String,
    pub energy_kwh: String,
    pub revenue: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "No".to_string(),
            payment_date: "TGL BAYAR".to_string(),
            unit: "UNITUP".to_string(),
            station: "NAMA_SPKLU".to_string(),
            energy_kwh: "PEMKWH".to_string(),
            revenue: "RPKWH".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSettings {
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSettings {
    #[serde(default = "default_max_daily_horizon")]
    pub max_daily_horizon: usize,
    #[serde(default = "default_max_monthly_horizon")]
    pub max_monthly_horizon: usize,
    #[serde(default = "default_method")]
    pub default_method: ForecastMethod,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            max_daily_horizon: default_max_daily_horizon(),
            max_monthly_horizon: default_max_monthly_horizon(),
            default_method: default_method(),
        }
    }
}

impl ForecastSettings {
    pub fn limits(&self) -> HorizonLimits {
        HorizonLimits {
            daily: self.max_daily_horizon,
            monthly: self.max_monthly_horizon,
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_max_daily_horizon() -> usize {
    30
}

fn default_max_monthly_horizon() -> usize {
    24
}

fn default_method() -> ForecastMethod {
    ForecastMethod::GradientBoosting
}

/// Load `config/spklu.{toml,...}` with `SPKLU__SECTION__KEY` environment overrides
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [source]
            kind = "file"
            path = "data/transactions.csv"
            "#,
        );

        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.columns, ColumnMapping::default());
        assert_eq!(config.models.dir, PathBuf::from("models"));
        assert_eq!(config.forecast.limits(), HorizonLimits::default());
        assert_eq!(config.forecast.default_method, ForecastMethod::GradientBoosting);
        assert_eq!(config.training, BoostingParams::default());
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
            [source]
            kind = "url"
            url = "https://example.com/export?format=csv"

            [source.columns]
            id = "ID"

            [forecast]
            max_daily_horizon = 14
            default_method = "arima"

            [training]
            n_estimators = 100
            max_depth = 4
            "#,
        );

        assert_eq!(config.source.kind, SourceKind::Url);
        assert_eq!(config.source.columns.id, "ID");
        assert_eq!(config.source.columns.payment_date, "TGL BAYAR");
        assert_eq!(config.forecast.limits().daily, 14);
        assert_eq!(config.forecast.limits().monthly, 24);
        assert_eq!(config.forecast.default_method, ForecastMethod::Arima);
        assert_eq!(config.training.n_estimators, 100);
        assert_eq!(config.training.max_depth, 4);
        assert_eq!(config.training.learning_rate, 0.05);
    }
}
