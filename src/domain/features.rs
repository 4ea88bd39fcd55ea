// Calendar and lag features for transaction count forecasting
use super::error::{ForecastError, Result};
use super::series::{Granularity, RegularSeries};
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarFeature {
    /// Monday = 0 .. Sunday = 6
    DayOfWeek,
    Month,
    Year,
}

impl CalendarFeature {
    pub fn extract(&self, period: NaiveDate) -> f64 {
        match self {
            CalendarFeature::DayOfWeek => f64::from(period.weekday().num_days_from_monday()),
            CalendarFeature::Month => f64::from(period.month()),
            CalendarFeature::Year => f64::from(period.year()),
        }
    }
}

/// Ordered feature layout for one granularity: calendar features first, then lags.
#[derive(Debug, PartialEq, Eq)]
pub struct FeatureSchema {
    pub granularity: Granularity,
    pub names: &'static [&'static str],
    pub calendar: &'static [CalendarFeature],
    pub lags: &'static [usize],
}

pub static DAILY_SCHEMA: FeatureSchema = FeatureSchema {
    granularity: Granularity::Daily,
    names: &["dayofweek", "month", "lag1", "lag2", "lag3", "lag7"],
    calendar: &[CalendarFeature::DayOfWeek, CalendarFeature::Month],
    lags: &[1, 2, 3, 7],
};

pub static MONTHLY_SCHEMA: FeatureSchema = FeatureSchema {
    granularity: Granularity::Monthly,
    names: &["month", "year", "lag1", "lag2", "lag3", "lag6", "lag12"],
    calendar: &[CalendarFeature::Month, CalendarFeature::Year],
    lags: &[1, 2, 3, 6, 12],
};

impl FeatureSchema {
    pub fn for_granularity(granularity: Granularity) -> &'static FeatureSchema {
        match granularity {
            Granularity::Daily => &DAILY_SCHEMA,
            Granularity::Monthly => &MONTHLY_SCHEMA,
        }
    }

    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.names.iter().map(|n| n.to_string()).collect()
    }

    fn row(&self, period: NaiveDate, lag_value: impl Fn(usize) -> f64) -> FeatureRow {
        let mut values = Vec::with_capacity(self.names.len());
        values.extend(self.calendar.iter().map(|c| c.extract(period)));
        values.extend(self.lags.iter().map(|&k| lag_value(k)));
        FeatureRow {
            period,
            names: self.names,
            values,
        }
    }

    /// One row per period that has a full lag history, paired with its observed value.
    pub fn training_table(&self, series: &RegularSeries) -> Result<FeatureTable> {
        let values = series.values();
        let needed = self.max_lag() + 1;
        if values.len() < needed {
            return Err(ForecastError::InsufficientHistory {
                needed,
                got: values.len(),
            });
        }

        let (rows, targets): (Vec<FeatureRow>, Vec<f64>) = (self.max_lag()..values.len())
            .map(|i| {
                let row = self.row(series.period_at(i), |k| values[i - k]);
                (row, values[i])
            })
            .unzip();

        Ok(FeatureTable {
            names: self.names,
            rows,
            targets,
        })
    }

    /// Row describing the period right after the last value of `series`.
    /// Lags reaching past the start of the series repeat the most recent value.
    pub fn next_row(&self, series: &RegularSeries) -> Result<FeatureRow> {
        let values = series.values();
        let Some(&latest) = values.last() else {
            return Err(ForecastError::InsufficientHistory {
                needed: 1,
                got: 0,
            });
        };
        let n = values.len();
        Ok(self.row(series.next_period(), |k| {
            if k <= n { values[n - k] } else { latest }
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub period: NaiveDate,
    pub names: &'static [&'static str],
    pub values: Vec<f64>,
}

impl FeatureRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.values.get(i).copied())
    }
}

#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub names: &'static [&'static str],
    pub rows: Vec<FeatureRow>,
    pub targets: Vec<f64>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix in row-major order.
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }
}
