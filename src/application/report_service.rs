// Report service - Use cases behind the summary and analysis pages
use crate::domain::error::Result;
use crate::domain::report::{
    self, MonthEntry, StationRankings, StationTransactions, Summary, UnitTotals, YearMonth,
};
use crate::domain::series::{Granularity, SeriesPoint, build_series};
use crate::domain::transaction::TransactionRecord;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub month: Option<YearMonth>,
    pub summary: Summary,
    pub units: Vec<UnitTotals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitStations {
    pub unit: String,
    pub stations: Vec<StationTransactions>,
}

#[derive(Clone)]
pub struct ReportService {
    records: Arc<Vec<TransactionRecord>>,
}

impl ReportService {
    pub fn new(records: Arc<Vec<TransactionRecord>>) -> Self {
        Self { records }
    }

    pub fn months(&self) -> Vec<MonthEntry> {
        report::available_months(&self.records)
    }

    /// Totals and per-unit breakdown, optionally restricted to one month
    pub fn summary(&self, month: Option<YearMonth>) -> DashboardSummary {
        let selected = report::filter_by_month(&self.records, month);
        DashboardSummary {
            month,
            summary: report::summarize(&selected),
            units: report::unit_totals(&selected),
        }
    }

    pub fn station_rankings(&self) -> StationRankings {
        report::station_rankings(&self.records)
    }

    pub fn unit_stations(&self, unit: &str) -> Option<UnitStations> {
        report::station_transactions(&self.records, unit).map(|stations| UnitStations {
            unit: unit.to_string(),
            stations,
        })
    }

    pub fn trend(&self, granularity: Granularity) -> Result<Vec<SeriesPoint>> {
        Ok(build_series(&self.records, granularity)?.points())
    }
}
