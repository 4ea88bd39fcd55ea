// Recursive multi-step forecasting over a regular series
use crate::application::forecast_model::ForecastModel;
use crate::domain::error::{ForecastError, Result};
use crate::domain::features::FeatureSchema;
use crate::domain::forecast::{ForecastOutput, Horizon};
use crate::domain::series::{RegularSeries, SeriesPoint};
use crate::infrastructure::arima::{ArimaModel, ArimaOrder};

fn clamp_prediction(raw: f64) -> Result<f64> {
    if raw.is_finite() {
        Ok(raw.max(0.0))
    } else {
        Err(ForecastError::Computation(format!(
            "model produced a non-finite prediction ({})",
            raw
        )))
    }
}

/// Predict `horizon` periods one at a time. Every prediction is appended to a
/// request-local copy of the series so later steps see it as a lag input.
pub fn forecast_recursive(
    series: &RegularSeries,
    model: &dyn ForecastModel,
    horizon: Horizon,
) -> Result<ForecastOutput> {
    let schema = FeatureSchema::for_granularity(series.granularity());
    let mut working = series.clone();
    let mut output = ForecastOutput::with_capacity(series.granularity(), horizon.steps());

    for _ in 0..horizon.steps() {
        let row = schema.next_row(&working)?;
        let value = clamp_prediction(model.predict(&row)?)?;
        working.push(value);
        output.points.push(SeriesPoint {
            period: row.period,
            value,
        });
    }

    Ok(output)
}

/// ARIMA alternative: fit on the full series, then project forward.
pub fn forecast_arima(
    series: &RegularSeries,
    order: ArimaOrder,
    horizon: Horizon,
) -> Result<ForecastOutput> {
    let model = ArimaModel::fit(series.values(), order)?;
    let mut output = ForecastOutput::with_capacity(series.granularity(), horizon.steps());
    let granularity = series.granularity();
    let mut period = series.next_period();

    for raw in model.forecast(horizon.steps()) {
        output.points.push(SeriesPoint {
            period,
            value: clamp_prediction(raw)?,
        });
        period = granularity.advance(period, 1);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{DAILY_SCHEMA, FeatureRow};
    use crate::domain::series::Granularity;
    use crate::infrastructure::gbdt::{BoostingParams, GradientBoostedRegressor};
    use chrono::{Datelike, NaiveDate, Weekday};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Predicts lag1 + step so feedback is observable
    struct LagPlus(f64);

    impl ForecastModel for LagPlus {
        fn predict(&self, row: &FeatureRow) -> Result<f64> {
            Ok(row.get("lag1").unwrap_or_default() + self.0)
        }
    }

    struct FailsOnCall {
        fail_at: usize,
        calls: AtomicUsize,
    }

    impl ForecastModel for FailsOnCall {
        fn predict(&self, _row: &FeatureRow) -> Result<f64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_at {
                Err(ForecastError::Computation("boom".to_string()))
            } else {
                Ok(1.0)
            }
        }
    }

    fn week_series() -> RegularSeries {
        // Monday 2025-06-02 .. Sunday 2025-06-08
        RegularSeries::new(
            Granularity::Daily,
            date(2025, 6, 2),
            vec![3.0, 5.0, 0.0, 2.0, 4.0, 6.0, 1.0],
        )
    }

    #[test]
    fn test_predictions_feed_back_as_lags() {
        let output = forecast_recursive(&week_series(), &LagPlus(2.0), Horizon::new(3, 30).unwrap())
            .unwrap();
        let values: Vec<f64> = output.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_negative_predictions_clamped() {
        let output =
            forecast_recursive(&week_series(), &LagPlus(-4.0), Horizon::new(4, 30).unwrap())
                .unwrap();
        assert!(output.points.iter().all(|p| p.value >= 0.0));
        assert_eq!(output.points[3].value, 0.0);
    }

    #[test]
    fn test_week_forecast_starts_on_monday() {
        let series = week_series();
        // too short to train on, but still enough to forecast from
        let err = DAILY_SCHEMA.training_table(&series).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { .. }));

        let output =
            forecast_recursive(&series, &LagPlus(0.0), Horizon::new(1, 30).unwrap()).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.points[0].period, date(2025, 6, 9));
        assert_eq!(output.points[0].period.weekday(), Weekday::Mon);
        assert!(output.points[0].value >= 0.0);
    }

    #[test]
    fn test_monthly_horizon_periods() {
        let values: Vec<f64> = (0..18).map(|i| f64::from(20 + (i % 5))).collect();
        let series = RegularSeries::new(Granularity::Monthly, date(2024, 1, 1), values);
        let output =
            forecast_recursive(&series, &LagPlus(1.0), Horizon::new(6, 24).unwrap()).unwrap();

        let periods: Vec<NaiveDate> = output.points.iter().map(|p| p.period).collect();
        let expected: Vec<NaiveDate> = (7..=12).map(|m| date(2025, m, 1)).collect();
        assert_eq!(periods, expected);
    }

    #[test]
    fn test_failure_aborts_whole_forecast() {
        let model = FailsOnCall {
            fail_at: 2,
            calls: AtomicUsize::new(0),
        };
        let result = forecast_recursive(&week_series(), &model, Horizon::new(5, 30).unwrap());
        assert_eq!(result, Err(ForecastError::Computation("boom".to_string())));
    }

    #[test]
    fn test_trained_model_forecast_is_deterministic() {
        let values: Vec<f64> = (0..60).map(|i| f64::from((i * 7) % 9)).collect();
        let series = RegularSeries::new(Granularity::Daily, date(2025, 1, 1), values);
        let table = DAILY_SCHEMA.training_table(&series).unwrap();
        let params = BoostingParams {
            n_estimators: 100,
            ..BoostingParams::default()
        };
        let model = GradientBoostedRegressor::fit(
            DAILY_SCHEMA.feature_names(),
            &table.matrix(),
            &table.targets,
            &params,
        )
        .unwrap();

        let horizon = Horizon::new(14, 30).unwrap();
        let first = forecast_recursive(&series, &model, horizon).unwrap();
        let second = forecast_recursive(&series, &model, horizon).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 14);

        for pair in first.points.windows(2) {
            assert_eq!(Granularity::Daily.advance(pair[0].period, 1), pair[1].period);
        }
        assert_eq!(first.points[0].period, date(2025, 3, 2));
    }

    #[test]
    fn test_arima_output_contract() {
        let values: Vec<f64> = (0..30).map(|i| f64::from(10 + (i % 4))).collect();
        let series = RegularSeries::new(Granularity::Daily, date(2025, 6, 1), values);
        let output =
            forecast_arima(&series, ArimaOrder::DASHBOARD, Horizon::new(7, 30).unwrap()).unwrap();

        assert_eq!(output.len(), 7);
        assert_eq!(output.points[0].period, date(2025, 7, 1));
        assert_eq!(output.points[6].period, date(2025, 7, 7));
        assert!(output.points.iter().all(|p| p.value >= 0.0));
    }
}
