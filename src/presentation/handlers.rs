// HTTP request handlers
use crate::domain::error::ForecastError;
use crate::domain::forecast::{ForecastMethod, ForecastRequest};
use crate::domain::report::YearMonth;
use crate::domain::series::Granularity;
use crate::infrastructure::http_response::{
    accepts_brotli, error_response, forecast_error_response, json_response,
};
use crate::presentation::app_state::AppState;
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, Response, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Initial horizon of the forecast page
pub const DEFAULT_HORIZON: i64 = 7;

#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Deserialize)]
pub struct TrendQuery {
    pub granularity: Option<String>,
}

#[derive(Deserialize)]
pub struct ForecastQuery {
    pub granularity: Option<String>,
    pub horizon: Option<i64>,
    pub method: Option<String>,
}

fn finish(result: Result<Response<Body>, StatusCode>) -> AxumResponse {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn ok_json<T: Serialize>(data: &T, compress: bool) -> AxumResponse {
    finish(json_response(data, compress).await)
}

async fn forecast_error(error: &ForecastError, compress: bool) -> AxumResponse {
    finish(forecast_error_response(error, compress).await)
}

async fn bad_query(rejection: QueryRejection, compress: bool) -> AxumResponse {
    tracing::debug!("Rejected query string: {}", rejection.body_text());
    finish(error_response(StatusCode::BAD_REQUEST, &rejection.body_text(), compress).await)
}

fn parse_granularity(raw: Option<&str>) -> Result<Granularity, ForecastError> {
    raw.map_or(Ok(Granularity::Daily), str::parse)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Months that have dated transactions, newest first
pub async fn list_months(headers: HeaderMap, State(state): State<Arc<AppState>>) -> AxumResponse {
    ok_json(&state.report_service.months(), accepts_brotli(&headers)).await
}

/// Totals and per-unit breakdown, optionally for one `YYYY-MM` month
pub async fn summary(
    query: Result<Query<MonthQuery>, QueryRejection>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AxumResponse {
    let compress = accepts_brotli(&headers);
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return bad_query(rejection, compress).await,
    };

    let month = match query.month.as_deref().map(str::parse::<YearMonth>).transpose() {
        Ok(month) => month,
        Err(e) => {
            return finish(error_response(StatusCode::BAD_REQUEST, &e.to_string(), compress).await)
        }
    };

    ok_json(&state.report_service.summary(month), compress).await
}

pub async fn station_ranking(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AxumResponse {
    ok_json(&state.report_service.station_rankings(), accepts_brotli(&headers)).await
}

/// Distinct transactions per station of one service unit
pub async fn unit_stations(
    Path(unit): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AxumResponse {
    let compress = accepts_brotli(&headers);

    match state.report_service.unit_stations(&unit) {
        Some(stations) => ok_json(&stations, compress).await,
        None => {
            let message = format!("unknown unit '{}'", unit);
            finish(error_response(StatusCode::NOT_FOUND, &message, compress).await)
        }
    }
}

/// Historical transaction counts per period
pub async fn trend(
    query: Result<Query<TrendQuery>, QueryRejection>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AxumResponse {
    let compress = accepts_brotli(&headers);
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return bad_query(rejection, compress).await,
    };

    let result = parse_granularity(query.granularity.as_deref())
        .and_then(|granularity| state.report_service.trend(granularity));

    match result {
        Ok(points) => ok_json(&points, compress).await,
        Err(e) => forecast_error(&e, compress).await,
    }
}

/// Forecast the next `horizon` periods after the last observed one
pub async fn forecast(
    query: Result<Query<ForecastQuery>, QueryRejection>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AxumResponse {
    let compress = accepts_brotli(&headers);
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return bad_query(rejection, compress).await,
    };

    let request = parse_granularity(query.granularity.as_deref()).and_then(|granularity| {
        let method = query
            .method
            .as_deref()
            .map_or(Ok(state.default_method), str::parse::<ForecastMethod>)?;
        Ok(ForecastRequest::new(
            granularity,
            query.horizon.unwrap_or(DEFAULT_HORIZON),
            method,
        ))
    });

    match request.and_then(|request| state.forecast_service.forecast(request)) {
        Ok(report) => ok_json(&report, compress).await,
        Err(e) => forecast_error(&e, compress).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::forecast_model::ForecastModel;
    use crate::application::forecast_service::ForecastService;
    use crate::application::report_service::ReportService;
    use crate::domain::error::Result;
    use crate::domain::features::FeatureRow;
    use crate::domain::forecast::HorizonLimits;
    use crate::domain::transaction::TransactionRecord;
    use axum::body::to_bytes;
    use chrono::{Days, NaiveDate};

    struct Constant(f64);

    impl ForecastModel for Constant {
        fn predict(&self, _row: &FeatureRow) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn state() -> Arc<AppState> {
        let start = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let records: Vec<TransactionRecord> = (0..20)
            .map(|d| {
                TransactionRecord::new(
                    format!("tx-{}", d),
                    start.checked_add_days(Days::new(d)),
                    "51001".to_string(),
                    "SPKLU A".to_string(),
                    Some(10.0),
                    Some(25_000.0),
                )
            })
            .collect();
        let records = Arc::new(records);

        Arc::new(AppState {
            report_service: ReportService::new(records.clone()),
            forecast_service: ForecastService::with_models(
                records,
                Ok(Arc::new(Constant(3.0))),
                Err(ForecastError::ModelLoadFailure {
                    granularity: Granularity::Monthly,
                    reason: "not trained".to_string(),
                }),
                HorizonLimits::default(),
            ),
            default_method: ForecastMethod::GradientBoosting,
        })
    }

    async fn body_json(response: AxumResponse) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn forecast_query(granularity: &str, horizon: Option<i64>, method: Option<&str>) -> ForecastQuery {
        ForecastQuery {
            granularity: Some(granularity.to_string()),
            horizon,
            method: method.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_forecast_defaults_to_seven_days() {
        let response = forecast(
            Ok(Query(ForecastQuery {
                granularity: None,
                horizon: None,
                method: None,
            })),
            HeaderMap::new(),
            State(state()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["granularity"], "daily");
        assert_eq!(json["method"], "gbdt");
        assert_eq!(json["forecast"].as_array().unwrap().len(), 7);
        assert_eq!(json["forecast"][0]["period"], "2025-06-09");
    }

    #[tokio::test]
    async fn test_forecast_error_statuses() {
        let cases = [
            (forecast_query("daily", Some(0), None), StatusCode::BAD_REQUEST),
            (forecast_query("weekly", Some(3), None), StatusCode::BAD_REQUEST),
            (forecast_query("daily", Some(3), Some("lstm")), StatusCode::BAD_REQUEST),
            (forecast_query("monthly", Some(3), None), StatusCode::SERVICE_UNAVAILABLE),
            (forecast_query("monthly", Some(3), Some("arima")), StatusCode::UNPROCESSABLE_ENTITY),
        ];

        for (query, expected) in cases {
            let response = forecast(Ok(Query(query)), HeaderMap::new(), State(state())).await;
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_malformed_query_gets_json_error() {
        for uri in ["/forecast?horizon=abc", "/forecast?horizon=1.5"] {
            let uri: axum::http::Uri = uri.parse().unwrap();
            let query = Query::<ForecastQuery>::try_from_uri(&uri);
            assert!(query.is_err());

            let response = forecast(query, HeaderMap::new(), State(state())).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()["content-type"], "application/json");

            let json = body_json(response).await;
            assert!(json["error"].as_str().unwrap().contains("query string"));
        }
    }

    #[tokio::test]
    async fn test_summary_rejects_bad_month() {
        let response = summary(
            Ok(Query(MonthQuery {
                month: Some("2025-13".to_string()),
            })),
            HeaderMap::new(),
            State(state()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = summary(
            Ok(Query(MonthQuery {
                month: Some("2025-06".to_string()),
            })),
            HeaderMap::new(),
            State(state()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["summary"]["transactions"], 8);
    }

    #[tokio::test]
    async fn test_unit_stations_not_found() {
        let response = unit_stations(Path("99999".to_string()), HeaderMap::new(), State(state())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = unit_stations(Path("51001".to_string()), HeaderMap::new(), State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["stations"][0]["transactions"], 20);
    }

    #[tokio::test]
    async fn test_monthly_trend() {
        let response = trend(
            Ok(Query(TrendQuery {
                granularity: Some("monthly".to_string()),
            })),
            HeaderMap::new(),
            State(state()),
        )
        .await;
        let json = body_json(response).await;
        assert_eq!(json[0]["period"], "2025-05-01");
        assert_eq!(json[0]["value"], 12.0);
        assert_eq!(json[1]["value"], 8.0);
    }
}
