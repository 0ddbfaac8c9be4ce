//! In-memory stand-ins for the database transaction and spreadsheet sink used by unit tests.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::database::models::{Expense, Material, ReviewStatus};
use crate::database::DatabaseError;
use crate::services::expense_workflow::{ExpenseReader, ReviewTransaction};
use crate::sheets::{a1_range, AppendReceipt, ExpenseRow, SheetError, SheetSink};

/// A Pending expense for supervisor `e1` at `site`
pub fn pending_expense(site: &str) -> Expense {
    let now = Utc::now();
    let quantity: Decimal = "10".parse().unwrap();
    let price: Decimal = "350".parse().unwrap();
    Expense {
        id: Uuid::new_v4(),
        supervisor_id: Uuid::new_v4(),
        supervisor_username: "e1".to_string(),
        site_id: Uuid::new_v4(),
        site_name: site.to_string(),
        material_id: None,
        material_name: "Cement".to_string(),
        quantity,
        price_per_unit: price,
        total_amount: quantity * price,
        bill_number: Some("B-101".to_string()),
        bill_name: Some("Shree Traders".to_string()),
        bill_type: Some("cash".to_string()),
        status: ReviewStatus::Pending,
        rejection_reason: String::new(),
        is_price_changed: false,
        date: now,
        reviewed_by: None,
        reviewed_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn material(name: &str, base_price: &str) -> Material {
    let now = Utc::now();
    Material {
        id: Uuid::new_v4(),
        name: name.to_string(),
        unit: "bag".to_string(),
        base_price: base_price.parse().unwrap(),
        shop_name: None,
        created_at: now,
        updated_at: now,
    }
}

/// Expense table kept in memory; writes become visible on commit and rows lock like `FOR UPDATE`
#[derive(Clone, Default)]
pub struct MemoryExpenses {
    rows: Arc<Mutex<HashMap<Uuid, Expense>>>,
    row_locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
    unreadable: Arc<AtomicBool>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommitOutcome {
    Apply,
    Fail,
    /// The write lands but the caller sees an error, as when the acknowledgement is lost
    ApplyThenFail,
}

impl MemoryExpenses {
    pub fn with(expenses: Vec<Expense>) -> Self {
        let rows = expenses.into_iter().map(|e| (e.id, e)).collect();
        Self {
            rows: Arc::new(Mutex::new(rows)),
            ..Self::default()
        }
    }

    pub fn begin(&self) -> MemoryReview {
        self.begin_with(CommitOutcome::Apply)
    }

    /// A transaction whose commit fails and writes nothing
    pub fn begin_failing_commit(&self) -> MemoryReview {
        self.begin_with(CommitOutcome::Fail)
    }

    /// A transaction whose commit is stored but reported as failed
    pub fn begin_lost_commit_ack(&self) -> MemoryReview {
        self.begin_with(CommitOutcome::ApplyThenFail)
    }

    fn begin_with(&self, commit: CommitOutcome) -> MemoryReview {
        MemoryReview {
            store: self.clone(),
            staged: None,
            commit,
            row_lock: None,
        }
    }

    /// Reads outside a transaction fail from now on
    pub fn make_unreadable(&self) {
        self.unreadable.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, id: Uuid) -> Option<Expense> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn row_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.row_locks.lock().unwrap().entry(id).or_default().clone()
    }
}

fn connection_lost() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    )))
}

#[async_trait]
impl ExpenseReader for MemoryExpenses {
    async fn committed_expense(&self, id: Uuid) -> Result<Option<Expense>, DatabaseError> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(connection_lost());
        }
        Ok(self.get(id))
    }
}

pub struct MemoryReview {
    store: MemoryExpenses,
    staged: Option<Expense>,
    commit: CommitOutcome,
    row_lock: Option<OwnedMutexGuard<()>>,
}

#[async_trait]
impl ReviewTransaction for MemoryReview {
    type Reader = MemoryExpenses;

    fn reader(&self) -> MemoryExpenses {
        self.store.clone()
    }

    async fn lock_expense(&mut self, id: Uuid) -> Result<Option<Expense>, DatabaseError> {
        let lock = self.store.row_lock(id);
        self.row_lock = Some(lock.lock_owned().await);
        Ok(self.store.get(id))
    }

    async fn set_review(
        &mut self,
        id: Uuid,
        status: ReviewStatus,
        rejection_reason: &str,
        reviewer: Uuid,
    ) -> Result<Expense, DatabaseError> {
        let mut expense = self
            .store
            .get(id)
            .ok_or_else(|| DatabaseError::NotFound("Expense not found".to_string()))?;
        expense.status = status;
        expense.rejection_reason = rejection_reason.to_string();
        expense.reviewed_by = Some(reviewer);
        expense.reviewed_at = Some(Utc::now());
        self.staged = Some(expense.clone());
        Ok(expense)
    }

    /// The row lock is released when `self` drops, after the write is applied
    async fn commit(mut self) -> Result<(), DatabaseError> {
        if self.commit == CommitOutcome::Fail {
            return Err(connection_lost());
        }
        if let Some(expense) = self.staged.take() {
            self.store.rows.lock().unwrap().insert(expense.id, expense);
        }
        match self.commit {
            CommitOutcome::ApplyThenFail => Err(connection_lost()),
            _ => Ok(()),
        }
    }
}

/// Sink that keeps appended rows in memory and can be told to fail
#[derive(Default)]
pub struct RecordingSink {
    rows: Mutex<Vec<(String, ExpenseRow, AppendReceipt)>>,
    reverted: Mutex<Vec<AppendReceipt>>,
    fail: AtomicBool,
    next_row: Mutex<u32>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    /// Rows currently in the sheet, as (site, row)
    pub fn rows(&self) -> Vec<(String, ExpenseRow)> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(site, row, _)| (site.clone(), row.clone()))
            .collect()
    }

    pub fn reverted(&self) -> Vec<AppendReceipt> {
        self.reverted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn ensure_site_tab(&self, _site_name: &str) -> Result<(), SheetError> {
        Ok(())
    }

    async fn append_expense(&self, site_name: &str, row: &ExpenseRow) -> Result<AppendReceipt, SheetError> {
        // Give concurrent reviews a chance to run while this one holds its row lock
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(SheetError::Api {
                status: 503,
                message: "The service is currently unavailable".to_string(),
            });
        }
        let mut next_row = self.next_row.lock().unwrap();
        *next_row += 1;
        let line = *next_row + 1;
        let receipt = AppendReceipt {
            site_name: site_name.to_string(),
            updated_range: a1_range(site_name, &format!("A{}:K{}", line, line)),
        };
        self.rows
            .lock()
            .unwrap()
            .push((site_name.to_string(), row.clone(), receipt.clone()));
        Ok(receipt)
    }

    async fn revert(&self, receipt: &AppendReceipt) -> Result<(), SheetError> {
        self.rows.lock().unwrap().retain(|(_, _, r)| r != receipt);
        self.reverted.lock().unwrap().push(receipt.clone());
        Ok(())
    }
}
