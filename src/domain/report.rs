// Dashboard report models: totals, per-unit breakdowns and station rankings
use super::transaction::TransactionRecord;
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid month '{0}': expected YYYY-MM")]
pub struct InvalidMonth(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Human readable label, e.g. "June 2025"
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthEntry {
    pub month: YearMonth,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub transactions: usize,
    pub energy_kwh: f64,
    pub revenue: f64,
    pub revenue_per_kwh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitTotals {
    pub unit: String,
    pub transactions: usize,
    pub energy_kwh: f64,
    pub revenue: f64,
    /// Percent of all energy sold
    pub energy_share: f64,
    /// Percent of all revenue
    pub revenue_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTotals {
    pub station: String,
    pub energy_kwh: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRankings {
    pub by_energy: Vec<StationTotals>,
    pub by_revenue: Vec<StationTotals>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTransactions {
    pub station: String,
    pub transactions: usize,
}

/// Records whose payment date falls in `month`; every record when `month` is None.
pub fn filter_by_month(
    records: &[TransactionRecord],
    month: Option<YearMonth>,
) -> Vec<TransactionRecord> {
    match month {
        None => records.to_vec(),
        Some(month) => records
            .iter()
            .filter(|r| r.payment_date.map(YearMonth::of) == Some(month))
            .cloned()
            .collect(),
    }
}

/// Months that have at least one dated record, newest first.
pub fn available_months(records: &[TransactionRecord]) -> Vec<MonthEntry> {
    let months: BTreeSet<YearMonth> = records
        .iter()
        .filter_map(|r| r.payment_date.map(YearMonth::of))
        .collect();

    months
        .into_iter()
        .rev()
        .map(|month| MonthEntry {
            label: month.label(),
            month,
        })
        .collect()
}

fn distinct_ids<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> usize {
    records
        .into_iter()
        .map(|r| r.id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn summarize(records: &[TransactionRecord]) -> Summary {
    let energy_kwh: f64 = records.iter().filter_map(|r| r.energy_kwh).sum();
    let revenue: f64 = records.iter().filter_map(|r| r.revenue).sum();

    Summary {
        transactions: distinct_ids(records),
        energy_kwh,
        revenue,
        revenue_per_kwh: (energy_kwh > 0.0).then(|| revenue / energy_kwh),
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

/// Energy and revenue per unit, ordered by unit code.
pub fn unit_totals(records: &[TransactionRecord]) -> Vec<UnitTotals> {
    let mut by_unit: BTreeMap<&str, Vec<&TransactionRecord>> = BTreeMap::new();
    for record in records {
        by_unit.entry(record.unit.as_str()).or_default().push(record);
    }

    let total_energy: f64 = records.iter().filter_map(|r| r.energy_kwh).sum();
    let total_revenue: f64 = records.iter().filter_map(|r| r.revenue).sum();

    by_unit
        .into_iter()
        .map(|(unit, rows)| {
            let energy_kwh: f64 = rows.iter().filter_map(|r| r.energy_kwh).sum();
            let revenue: f64 = rows.iter().filter_map(|r| r.revenue).sum();
            UnitTotals {
                unit: unit.to_string(),
                transactions: distinct_ids(rows.iter().copied()),
                energy_kwh,
                revenue,
                energy_share: share(energy_kwh, total_energy),
                revenue_share: share(revenue, total_revenue),
            }
        })
        .collect()
}

pub fn station_rankings(records: &[TransactionRecord]) -> StationRankings {
    let mut totals: HashMap<&str, (f64, f64)> = HashMap::new();
    for record in records {
        let entry = totals.entry(record.station.as_str()).or_default();
        entry.0 += record.energy_kwh.unwrap_or(0.0);
        entry.1 += record.revenue.unwrap_or(0.0);
    }

    let stations: Vec<StationTotals> = totals
        .into_iter()
        .map(|(station, (energy_kwh, revenue))| StationTotals {
            station: station.to_string(),
            energy_kwh,
            revenue,
        })
        .collect();

    let mut by_energy = stations.clone();
    by_energy.sort_by(|a, b| {
        b.energy_kwh
            .total_cmp(&a.energy_kwh)
            .then_with(|| a.station.cmp(&b.station))
    });

    let mut by_revenue = stations;
    by_revenue.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.station.cmp(&b.station))
    });

    StationRankings {
        by_energy,
        by_revenue,
    }
}

/// Distinct transactions per station inside one unit, busiest first.
/// Returns None when no record belongs to `unit`.
pub fn station_transactions(
    records: &[TransactionRecord],
    unit: &str,
) -> Option<Vec<StationTransactions>> {
    let mut ids: HashMap<&str, HashSet<&str>> = HashMap::new();
    for record in records.iter().filter(|r| r.unit == unit) {
        ids.entry(record.station.as_str())
            .or_default()
            .insert(record.id.as_str());
    }

    if ids.is_empty() {
        return None;
    }

    let mut counts: Vec<StationTransactions> = ids
        .into_iter()
        .map(|(station, ids)| StationTransactions {
            station: station.to_string(),
            transactions: ids.len(),
        })
        .collect();
    counts.sort_by(|a, b| {
        b.transactions
            .cmp(&a.transactions)
            .then_with(|| a.station.cmp(&b.station))
    });
    Some(counts)
}
