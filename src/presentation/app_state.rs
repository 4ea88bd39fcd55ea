// Application state for HTTP handlers
use crate::application::forecast_service::ForecastService;
use crate::application::report_service::ReportService;
use crate::domain::forecast::ForecastMethod;

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub forecast_service: ForecastService,
    pub default_method: ForecastMethod,
}
