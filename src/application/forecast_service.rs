// Forecast service - Use case for serving transaction count forecasts
use crate::application::forecast_model::ForecastModel;
use crate::application::forecaster::{forecast_arima, forecast_recursive};
use crate::application::model_store::ModelStore;
use crate::domain::error::{ForecastError, Result};
use crate::domain::forecast::{ForecastMethod, ForecastRequest, Horizon, HorizonLimits};
use crate::domain::series::{Granularity, RegularSeries, SeriesPoint, build_series};
use crate::domain::transaction::TransactionRecord;
use crate::infrastructure::arima::ArimaOrder;
use serde::Serialize;
use std::sync::Arc;

type ModelSlot = std::result::Result<Arc<dyn ForecastModel>, ForecastError>;

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub granularity: Granularity,
    pub method: ForecastMethod,
    pub history: Vec<SeriesPoint>,
    pub forecast: Vec<SeriesPoint>,
}

#[derive(Clone)]
pub struct ForecastService {
    records: Arc<Vec<TransactionRecord>>,
    daily: ModelSlot,
    monthly: ModelSlot,
    limits: HorizonLimits,
}

impl ForecastService {
    /// Load both model slots once. A slot that fails to load stays failed for
    /// the life of the process and every request for it reports the failure.
    pub fn new(
        records: Arc<Vec<TransactionRecord>>,
        store: &dyn ModelStore,
        limits: HorizonLimits,
    ) -> Self {
        let load = |granularity: Granularity| -> ModelSlot {
            match store.load(granularity) {
                Ok(model) => {
                    tracing::info!(
                        "Loaded {} model with {} trees",
                        granularity,
                        model.tree_count()
                    );
                    Ok(Arc::new(model))
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    Err(e)
                }
            }
        };

        Self::with_models(
            records,
            load(Granularity::Daily),
            load(Granularity::Monthly),
            limits,
        )
    }

    pub fn with_models(
        records: Arc<Vec<TransactionRecord>>,
        daily: ModelSlot,
        monthly: ModelSlot,
        limits: HorizonLimits,
    ) -> Self {
        Self {
            records,
            daily,
            monthly,
            limits,
        }
    }

    pub fn limits(&self) -> HorizonLimits {
        self.limits
    }

    pub fn history(&self, granularity: Granularity) -> Result<RegularSeries> {
        build_series(&self.records, granularity)
    }

    fn model(&self, granularity: Granularity) -> Result<&Arc<dyn ForecastModel>> {
        let slot = match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Monthly => &self.monthly,
        };
        slot.as_ref().map_err(Clone::clone)
    }

    pub fn forecast(&self, request: ForecastRequest) -> Result<ForecastReport> {
        let granularity = request.granularity;
        let horizon = Horizon::new(request.horizon, self.limits.max_for(granularity))?;

        let (series, output) = match request.method {
            ForecastMethod::GradientBoosting => {
                let model = self.model(granularity)?;
                let series = self.history(granularity)?;
                tracing::debug!(
                    "Forecasting {} steps of {} series with {} periods",
                    horizon.steps(),
                    granularity,
                    series.len()
                );
                let output = forecast_recursive(&series, model.as_ref(), horizon)?;
                (series, output)
            }
            ForecastMethod::Arima => {
                let series = self.history(granularity)?;
                let output = forecast_arima(&series, ArimaOrder::DASHBOARD, horizon)?;
                (series, output)
            }
        };

        Ok(ForecastReport {
            granularity,
            method: request.method,
            history: series.points(),
            forecast: output.points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureRow;
    use chrono::{Days, NaiveDate};

    struct Constant(f64);

    impl ForecastModel for Constant {
        fn predict(&self, _row: &FeatureRow) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn records(days: u64) -> Arc<Vec<TransactionRecord>> {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let rows = (0..days)
            .map(|d| {
                TransactionRecord::new(
                    format!("tx-{}", d),
                    start.checked_add_days(Days::new(d)),
                    "51001".to_string(),
                    "SPKLU A".to_string(),
                    Some(12.0),
                    Some(30_000.0),
                )
            })
            .collect();
        Arc::new(rows)
    }

    fn missing(granularity: Granularity) -> ModelSlot {
        Err(ForecastError::ModelLoadFailure {
            granularity,
            reason: "not trained".to_string(),
        })
    }

    fn service(days: u64) -> ForecastService {
        ForecastService::with_models(
            records(days),
            Ok(Arc::new(Constant(4.0))),
            missing(Granularity::Monthly),
            HorizonLimits::default(),
        )
    }

    #[test]
    fn test_gbdt_forecast_report() {
        let report = service(14)
            .forecast(ForecastRequest::new(
                Granularity::Daily,
                7,
                ForecastMethod::GradientBoosting,
            ))
            .unwrap();

        assert_eq!(report.history.len(), 14);
        assert_eq!(report.forecast.len(), 7);
        assert_eq!(
            report.forecast[0].period,
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
        );
        assert!(report.forecast.iter().all(|p| p.value == 4.0));
    }

    #[test]
    fn test_rejects_invalid_horizon_before_work() {
        let svc = service(14);
        for horizon in [0, -1, 31] {
            let err = svc
                .forecast(ForecastRequest::new(
                    Granularity::Daily,
                    horizon,
                    ForecastMethod::GradientBoosting,
                ))
                .unwrap_err();
            assert_eq!(err, ForecastError::InvalidHorizon { requested: horizon, max: 30 });
        }
    }

    #[test]
    fn test_missing_model_surfaces_load_failure() {
        let err = service(14)
            .forecast(ForecastRequest::new(
                Granularity::Monthly,
                3,
                ForecastMethod::GradientBoosting,
            ))
            .unwrap_err();
        assert_eq!(err, missing(Granularity::Monthly).err().unwrap());
    }

    #[test]
    fn test_single_day_history_is_insufficient() {
        let err = service(1)
            .forecast(ForecastRequest::new(
                Granularity::Daily,
                3,
                ForecastMethod::GradientBoosting,
            ))
            .unwrap_err();
        assert_eq!(err, ForecastError::InsufficientHistory { needed: 2, got: 1 });
    }

    #[test]
    fn test_arima_needs_no_trained_model() {
        let report = service(20)
            .forecast(ForecastRequest::new(Granularity::Daily, 5, ForecastMethod::Arima))
            .unwrap();
        assert_eq!(report.method, ForecastMethod::Arima);
        assert_eq!(report.forecast.len(), 5);
        assert!(report.forecast.iter().all(|p| (p.value - 1.0).abs() < 1e-6));
    }
}
