// Source trait for transaction records
use crate::domain::transaction::TransactionRecord;
use async_trait::async_trait;

#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Load every transaction row. Rows with unparseable dates are kept
    /// with `payment_date: None`; the series builder drops them.
    async fn load_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>>;

    /// Short description for logs
    fn describe(&self) -> String;
}
