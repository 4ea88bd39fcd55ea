// Transaction domain model
use chrono::NaiveDate;

/// One payment event at a charging station. Several rows may share an id when a
/// transaction was exported as multiple line items.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub payment_date: Option<NaiveDate>,
    pub unit: String,
    pub station: String,
    pub energy_kwh: Option<f64>,
    pub revenue: Option<f64>,
}

impl TransactionRecord {
    pub fn new(
        id: String,
        payment_date: Option<NaiveDate>,
        unit: String,
        station: String,
        energy_kwh: Option<f64>,
        revenue: Option<f64>,
    ) -> Self {
        Self {
            id,
            payment_date,
            unit,
            station,
            energy_kwh,
            revenue,
        }
    }

    /// Revenue earned per kWh sold on this row
    pub fn revenue_per_kwh(&self) -> Option<f64> {
        match (self.revenue, self.energy_kwh) {
            (Some(revenue), Some(kwh)) if kwh > 0.0 => Some(revenue / kwh),
            _ => None,
        }
    }
}
