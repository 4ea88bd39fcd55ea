// Regular (gap-filled) transaction count series
use super::error::{ForecastError, Result};
use super::transaction::TransactionRecord;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Fewer periods than this make a forecast meaningless.
pub const MIN_SERIES_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }

    /// Map a calendar date onto the period that contains it.
    /// Monthly periods are keyed by the first day of the month.
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Move `steps` periods forward from a truncated period.
    pub fn advance(&self, period: NaiveDate, steps: u32) -> NaiveDate {
        let advanced = match self {
            Granularity::Daily => period.checked_add_days(Days::new(u64::from(steps))),
            Granularity::Monthly => period.checked_add_months(Months::new(steps)),
        };
        advanced.unwrap_or(NaiveDate::MAX)
    }

    /// Number of whole periods from `from` to `to` (both truncated).
    pub fn periods_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        match self {
            Granularity::Daily => (to - from).num_days(),
            Granularity::Monthly => {
                let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
                months(to) - months(from)
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Granularity::Daily),
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            other => Err(ForecastError::UnknownGranularity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: NaiveDate,
    pub value: f64,
}

/// Contiguous series of per-period values. Contiguity holds by construction:
/// only the start period is stored and every value occupies the next period.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularSeries {
    granularity: Granularity,
    start: NaiveDate,
    values: Vec<f64>,
}

impl RegularSeries {
    pub fn new(granularity: Granularity, start: NaiveDate, values: Vec<f64>) -> Self {
        Self {
            granularity,
            start: granularity.truncate(start),
            values,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn period_at(&self, index: usize) -> NaiveDate {
        let steps = u32::try_from(index).unwrap_or(u32::MAX);
        self.granularity.advance(self.start, steps)
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.period_at(self.values.len() - 1))
        }
    }

    /// The period immediately after the last value (the start when empty).
    pub fn next_period(&self) -> NaiveDate {
        self.period_at(self.values.len())
    }

    /// Append a value for `next_period()`.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn points(&self) -> Vec<SeriesPoint> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &value)| SeriesPoint {
                period: self.period_at(i),
                value,
            })
            .collect()
    }
}

/// Count distinct transaction ids per period and reindex over the full span,
/// filling empty periods with zero. Records without a payment date are skipped.
pub fn build_series(
    records: &[TransactionRecord],
    granularity: Granularity,
) -> Result<RegularSeries> {
    let mut ids_per_period: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
    let mut undated = 0usize;

    for record in records {
        match record.payment_date {
            Some(date) => {
                ids_per_period
                    .entry(granularity.truncate(date))
                    .or_default()
                    .insert(record.id.as_str());
            }
            None => undated += 1,
        }
    }

    if undated > 0 {
        tracing::debug!(
            "Skipped {} of {} records without a valid payment date",
            undated,
            records.len()
        );
    }

    let (Some(&first), Some(&last)) = (
        ids_per_period.keys().next(),
        ids_per_period.keys().next_back(),
    ) else {
        return Err(ForecastError::InsufficientHistory {
            needed: MIN_SERIES_PERIODS,
            got: 0,
        });
    };

    let span = usize::try_from(granularity.periods_between(first, last)).unwrap_or(0) + 1;
    if span < MIN_SERIES_PERIODS {
        return Err(ForecastError::InsufficientHistory {
            needed: MIN_SERIES_PERIODS,
            got: span,
        });
    }

    let mut values = vec![0.0; span];
    for (period, ids) in &ids_per_period {
        let index = granularity.periods_between(first, *period) as usize;
        values[index] = ids.len() as f64;
    }

    Ok(RegularSeries::new(granularity, first, values))
}
