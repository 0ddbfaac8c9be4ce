//! Bookkeeping spreadsheet that mirrors approved expenses, one tab per site.

pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{SheetsConfig, SheetsMode};
use crate::database::models::Expense;

pub use google::GoogleSheetsSink;

/// Column headings written as the first row of every site tab
pub const HEADER_ROW: [&str; 11] = [
    "Date",
    "Supervisor Name",
    "Site Name",
    "Material Name",
    "Quantity",
    "Price",
    "Total Amount",
    "Bill Number",
    "Bill Name / Shop Name",
    "Approved By",
    "Approval Date",
];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("spreadsheet sync is disabled")]
    Disabled,

    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected spreadsheet response: {0}")]
    InvalidResponse(String),
}

/// Where an appended row landed, so it can be cleared again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    pub site_name: String,
    pub updated_range: String,
}

/// One approved expense as it appears in the spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRow {
    pub date: DateTime<Utc>,
    pub supervisor_name: String,
    pub site_name: String,
    pub material_name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub bill_number: String,
    pub bill_name: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

impl ExpenseRow {
    pub fn from_expense(expense: &Expense, approved_by: &str, approved_at: DateTime<Utc>) -> Self {
        Self {
            date: expense.date,
            supervisor_name: expense.supervisor_username.clone(),
            site_name: expense.site_name.clone(),
            material_name: expense.material_name.clone(),
            quantity: expense.quantity,
            price_per_unit: expense.price_per_unit,
            total_amount: expense.total_amount,
            bill_number: expense.bill_number.clone().unwrap_or_default(),
            bill_name: expense.bill_name.clone().unwrap_or_default(),
            approved_by: approved_by.to_string(),
            approved_at,
        }
    }

    /// Cell values in header order; numbers stay textual so USER_ENTERED parses them
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.supervisor_name.clone(),
            self.site_name.clone(),
            self.material_name.clone(),
            self.quantity.normalize().to_string(),
            self.price_per_unit.normalize().to_string(),
            self.total_amount.normalize().to_string(),
            self.bill_number.clone(),
            self.bill_name.clone(),
            self.approved_by.clone(),
            self.approved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]
    }
}

/// External accounting sink for approved expenses
#[async_trait]
pub trait SheetSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Make sure the site's tab and header row exist
    async fn ensure_site_tab(&self, site_name: &str) -> Result<(), SheetError>;

    /// Append one approved expense to the site's tab, creating the tab when missing
    async fn append_expense(&self, site_name: &str, row: &ExpenseRow) -> Result<AppendReceipt, SheetError>;

    /// Clear a previously appended row
    async fn revert(&self, receipt: &AppendReceipt) -> Result<(), SheetError>;
}

/// Accepts everything and only logs; for local development
pub struct LogSink;

#[async_trait]
impl SheetSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn ensure_site_tab(&self, site_name: &str) -> Result<(), SheetError> {
        tracing::info!("[sheet:log] tab ready for site '{}'", site_name);
        Ok(())
    }

    async fn append_expense(&self, site_name: &str, row: &ExpenseRow) -> Result<AppendReceipt, SheetError> {
        tracing::info!("[sheet:log] append to '{}': {:?}", site_name, row.cells());
        Ok(AppendReceipt {
            site_name: site_name.to_string(),
            updated_range: a1_range(site_name, "A:K"),
        })
    }

    async fn revert(&self, receipt: &AppendReceipt) -> Result<(), SheetError> {
        tracing::info!("[sheet:log] revert {}", receipt.updated_range);
        Ok(())
    }
}

/// Refuses every append, so approvals cannot complete
pub struct DisabledSink;

#[async_trait]
impl SheetSink for DisabledSink {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn ensure_site_tab(&self, _site_name: &str) -> Result<(), SheetError> {
        Ok(())
    }

    async fn append_expense(&self, _site_name: &str, _row: &ExpenseRow) -> Result<AppendReceipt, SheetError> {
        Err(SheetError::Disabled)
    }

    async fn revert(&self, _receipt: &AppendReceipt) -> Result<(), SheetError> {
        Err(SheetError::Disabled)
    }
}

pub fn sink_from_config(config: &SheetsConfig) -> Result<Arc<dyn SheetSink>, SheetError> {
    let sink: Arc<dyn SheetSink> = match config.mode {
        SheetsMode::Google => Arc::new(GoogleSheetsSink::from_config(config)?),
        SheetsMode::Log => Arc::new(LogSink),
        SheetsMode::Disabled => Arc::new(DisabledSink),
    };
    tracing::info!("Spreadsheet sink: {}", sink.name());
    Ok(sink)
}

/// Sheet title quoted for A1 notation ('It''s a site')
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn a1_range(title: &str, cells: &str) -> String {
    format!("{}!{}", quote_sheet_title(title), cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> ExpenseRow {
        ExpenseRow {
            date: Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
            supervisor_name: "e1".to_string(),
            site_name: "Green Park".to_string(),
            material_name: "Cement".to_string(),
            quantity: "10".parse().unwrap(),
            price_per_unit: "350.50".parse().unwrap(),
            total_amount: "3505.00".parse().unwrap(),
            bill_number: "B-17".to_string(),
            bill_name: String::new(),
            approved_by: "admin".to_string(),
            approved_at: Utc.with_ymd_and_hms(2024, 3, 10, 14, 5, 9).unwrap(),
        }
    }

    #[test]
    fn cells_follow_header_order() {
        let cells = row().cells();
        assert_eq!(cells.len(), HEADER_ROW.len());
        assert_eq!(cells[0], "2024-03-09");
        assert_eq!(cells[2], "Green Park");
        assert_eq!(cells[5], "350.5");
        assert_eq!(cells[6], "3505");
        assert_eq!(cells[8], "");
        assert_eq!(cells[9], "admin");
        assert_eq!(cells[10], "2024-03-10 14:05:09 UTC");
    }

    #[test]
    fn titles_are_quoted_for_a1_ranges() {
        assert_eq!(a1_range("Green Park", "A1"), "'Green Park'!A1");
        assert_eq!(quote_sheet_title("Ravi's Plot"), "'Ravi''s Plot'");
    }

    #[tokio::test]
    async fn disabled_sink_refuses_appends() {
        let err = DisabledSink.append_expense("Green Park", &row()).await.unwrap_err();
        assert!(matches!(err, SheetError::Disabled));
        assert!(DisabledSink.ensure_site_tab("Green Park").await.is_ok());
    }

    #[tokio::test]
    async fn log_sink_accepts_appends() {
        let receipt = LogSink.append_expense("Green Park", &row()).await.unwrap();
        assert_eq!(receipt.site_name, "Green Park");
        assert!(LogSink.revert(&receipt).await.is_ok());
    }
}
