// CSV transaction sources (local file or spreadsheet CSV export over HTTP)
use crate::application::transaction_source::TransactionSource;
use crate::domain::transaction::TransactionRecord;
use crate::infrastructure::config::{ColumnMapping, SourceKind, SourceSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use std::sync::Arc;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a payment date the way the spreadsheets write them. Anything else is `None`.
pub fn parse_payment_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Non-negative amount; tolerates a currency prefix and thousands separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches("Rp").trim();
    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .or_else(|| cleaned.replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// `30.825` or `1.250.000,50`: dot thousands groups with an optional comma decimal part.
fn dot_grouped(raw: &str) -> Option<String> {
    let (integer, decimal) = match raw.split_once(',') {
        Some((integer, decimal)) => (integer, Some(decimal)),
        None => (raw, None),
    };
    let groups: Vec<&str> = integer.split('.').collect();
    let digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());

    let grouped = groups.len() >= 2
        && groups[0].len() <= 3
        && digits(groups[0])
        && groups[1..].iter().all(|g| g.len() == 3 && digits(*g))
        && decimal.is_none_or(digits);
    if !grouped {
        return None;
    }

    let mut normalized = groups.concat();
    if let Some(decimal) = decimal {
        normalized.push('.');
        normalized.push_str(decimal);
    }
    Some(normalized)
}

/// Rupiah amount. Dot thousands separators are read as grouping, so `Rp 30.825` is 30825.
pub fn parse_rupiah(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches("Rp").trim();
    match dot_grouped(cleaned) {
        Some(normalized) => parse_amount(&normalized),
        None => parse_amount(cleaned),
    }
}

struct ColumnIndex {
    id: usize,
    payment_date: usize,
    unit: Option<usize>,
    station: Option<usize>,
    energy_kwh: Option<usize>,
    revenue: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnMapping) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).with_context(|| format!("Column '{}' not found in CSV header", name))
        };

        let index = Self {
            id: required(&columns.id)?,
            payment_date: required(&columns.payment_date)?,
            unit: find(&columns.unit),
            station: find(&columns.station),
            energy_kwh: find(&columns.energy_kwh),
            revenue: find(&columns.revenue),
        };

        for (name, idx) in [
            (&columns.unit, index.unit),
            (&columns.station, index.station),
            (&columns.energy_kwh, index.energy_kwh),
            (&columns.revenue, index.revenue),
        ] {
            if idx.is_none() {
                tracing::warn!("Column '{}' not found; values will be empty", name);
            }
        }

        Ok(index)
    }
}

/// Parse CSV bytes into transaction records. Rows without an id are skipped.
pub fn parse_transactions(data: &[u8], columns: &ColumnMapping) -> Result<Vec<TransactionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut undated = 0usize;

    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to parse CSV row {}", line + 2))?;
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

        let id = field(Some(index.id));
        if id.is_empty() {
            skipped += 1;
            continue;
        }

        let payment_date = parse_payment_date(field(Some(index.payment_date)));
        if payment_date.is_none() {
            undated += 1;
        }

        records.push(TransactionRecord::new(
            id.to_string(),
            payment_date,
            field(index.unit).to_string(),
            field(index.station).to_string(),
            parse_amount(field(index.energy_kwh)),
            parse_rupiah(field(index.revenue)),
        ));
    }

    tracing::debug!(
        "Parsed {} records ({} without id skipped, {} with invalid payment date)",
        records.len(),
        skipped,
        undated
    );
    Ok(records)
}

#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    columns: ColumnMapping,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnMapping) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }
}

#[async_trait]
impl TransactionSource for CsvFileSource {
    async fn load_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        parse_transactions(&data, &self.columns)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[derive(Debug, Clone)]
pub struct CsvUrlSource {
    url: String,
    columns: ColumnMapping,
}

impl CsvUrlSource {
    pub fn new(url: String, columns: ColumnMapping) -> Self {
        Self { url, columns }
    }
}

#[async_trait]
impl TransactionSource for CsvUrlSource {
    async fn load_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let response = reqwest::get(&self.url)
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {} failed with status {}", self.url, response.status());
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read CSV response body")?;
        parse_transactions(&body, &self.columns)
    }

    fn describe(&self) -> String {
        format!("url {}", self.url)
    }
}

pub fn source_from_settings(settings: &SourceSettings) -> Result<Arc<dyn TransactionSource>> {
    let columns = settings.columns.clone();
    match settings.kind {
        SourceKind::File => {
            let path = settings
                .path
                .clone()
                .context("source.path is required when source.kind = \"file\"")?;
            Ok(Arc::new(CsvFileSource::new(path, columns)))
        }
        SourceKind::Url => {
            let url = settings
                .url
                .clone()
                .context("source.url is required when source.kind = \"url\"")?;
            Ok(Arc::new(CsvUrlSource::new(url, columns)))
        }
    }
}
