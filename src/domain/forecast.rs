// Forecast request and output domain models
use super::error::{ForecastError, Result};
use super::series::{Granularity, SeriesPoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bounds on the number of steps a single request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonLimits {
    pub daily: usize,
    pub monthly: usize,
}

impl HorizonLimits {
    pub fn max_for(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Daily => self.daily,
            Granularity::Monthly => self.monthly,
        }
    }
}

impl Default for HorizonLimits {
    fn default() -> Self {
        Self {
            daily: 30,
            monthly: 24,
        }
    }
}

/// Validated number of future periods, always in `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon(usize);

impl Horizon {
    pub fn new(requested: i64, max: usize) -> Result<Self> {
        match usize::try_from(requested) {
            Ok(steps) if steps >= 1 && steps <= max => Ok(Self(steps)),
            _ => Err(ForecastError::InvalidHorizon { requested, max }),
        }
    }

    pub fn steps(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastMethod {
    #[serde(rename = "gbdt")]
    GradientBoosting,
    #[serde(rename = "arima")]
    Arima,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::GradientBoosting => "gbdt",
            ForecastMethod::Arima => "arima",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gbdt" | "xgboost" | "boosting" => Ok(ForecastMethod::GradientBoosting),
            "arima" => Ok(ForecastMethod::Arima),
            other => Err(ForecastError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRequest {
    pub granularity: Granularity,
    pub horizon: i64,
    pub method: ForecastMethod,
}

impl ForecastRequest {
    pub fn new(granularity: Granularity, horizon: i64, method: ForecastMethod) -> Self {
        Self {
            granularity,
            horizon,
            method,
        }
    }
}

/// Predicted values for consecutive periods after the last observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutput {
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

impl ForecastOutput {
    pub fn with_capacity(granularity: Granularity, steps: usize) -> Self {
        Self {
            granularity,
            points: Vec::with_capacity(steps),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
