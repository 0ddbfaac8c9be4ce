//! Expense lifecycle: submission, review, and resubmission after rejection.
//!
//! ```text
//! Pending ──approve──▶ Approved (final)
//! Pending ──reject───▶ Rejected ──resubmit──▶ Pending
//! ```
//!
//! Approval appends the expense to the site's spreadsheet tab before the
//! local status flips, all while the row is locked. A failed append leaves
//! the expense Pending. A failed local write after a successful append
//! clears the appended row again, unless a re-read shows the approval was
//! stored after all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::models::{Expense, ExpenseDraft, Material, ReviewStatus, Site};
use crate::database::DatabaseError;
use crate::ledger;
use crate::sheets::{AppendReceipt, ExpenseRow, SheetError, SheetSink};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("expense not found")]
    NotFound,

    #[error("expense is already approved")]
    AlreadyApproved,

    #[error("expense is {0}, not Pending")]
    NotPending(ReviewStatus),

    #[error("expense is {0}, not Rejected")]
    NotRejected(ReviewStatus),

    #[error("{0} is not a review outcome")]
    InvalidTarget(ReviewStatus),

    #[error("rejection reason is required")]
    MissingReason,

    #[error("expense belongs to another supervisor")]
    NotOwner,

    #[error("spreadsheet append failed: {0}")]
    Sink(#[from] SheetError),

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl WorkflowError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        WorkflowError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Body of a review request
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub status: ReviewStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// What a valid review decision will do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewPlan {
    Approve,
    Reject { reason: String },
}

impl ReviewPlan {
    pub fn from_decision(decision: &ReviewDecision) -> Result<Self, WorkflowError> {
        match decision.status {
            ReviewStatus::Approved => Ok(ReviewPlan::Approve),
            ReviewStatus::Rejected => {
                let reason = decision
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default();
                if reason.is_empty() {
                    return Err(WorkflowError::MissingReason);
                }
                Ok(ReviewPlan::Reject {
                    reason: reason.to_string(),
                })
            }
            ReviewStatus::Pending => Err(WorkflowError::InvalidTarget(ReviewStatus::Pending)),
        }
    }
}

/// Only Pending expenses can be reviewed; Approved is final
pub fn ensure_reviewable(current: ReviewStatus) -> Result<(), WorkflowError> {
    match current {
        ReviewStatus::Pending => Ok(()),
        ReviewStatus::Approved => Err(WorkflowError::AlreadyApproved),
        ReviewStatus::Rejected => Err(WorkflowError::NotPending(ReviewStatus::Rejected)),
    }
}

/// The manager performing a review
#[derive(Debug, Clone)]
pub struct Reviewer {
    pub id: Uuid,
    pub username: String,
}

/// Reads committed expense state outside any review transaction
#[async_trait]
pub trait ExpenseReader: Send + Sync {
    async fn committed_expense(&self, id: Uuid) -> Result<Option<Expense>, DatabaseError>;
}

#[async_trait]
impl ExpenseReader for PgPool {
    async fn committed_expense(&self, id: Uuid) -> Result<Option<Expense>, DatabaseError> {
        Expense::find_by_id(self, id).await
    }
}

/// Unit of work a review runs in. Dropping it without `commit` discards every write.
#[async_trait]
pub trait ReviewTransaction: Send {
    type Reader: ExpenseReader;

    /// Handle for checking, on a fresh connection, what a failed commit left behind
    fn reader(&self) -> Self::Reader;

    /// Read the expense and keep it locked until the transaction ends
    async fn lock_expense(&mut self, id: Uuid) -> Result<Option<Expense>, DatabaseError>;

    async fn set_review(
        &mut self,
        id: Uuid,
        status: ReviewStatus,
        rejection_reason: &str,
        reviewer: Uuid,
    ) -> Result<Expense, DatabaseError>;

    async fn commit(self) -> Result<(), DatabaseError>;
}

pub struct PgReviewTransaction {
    tx: Transaction<'static, Postgres>,
    pool: PgPool,
}

impl PgReviewTransaction {
    pub async fn begin(pool: &PgPool) -> Result<Self, DatabaseError> {
        Ok(Self {
            tx: pool.begin().await?,
            pool: pool.clone(),
        })
    }
}

#[async_trait]
impl ReviewTransaction for PgReviewTransaction {
    type Reader = PgPool;

    fn reader(&self) -> PgPool {
        self.pool.clone()
    }

    async fn lock_expense(&mut self, id: Uuid) -> Result<Option<Expense>, DatabaseError> {
        Expense::find_for_update(&mut *self.tx, id).await
    }

    async fn set_review(
        &mut self,
        id: Uuid,
        status: ReviewStatus,
        rejection_reason: &str,
        reviewer: Uuid,
    ) -> Result<Expense, DatabaseError> {
        Expense::set_review(&mut *self.tx, id, status, rejection_reason, reviewer).await
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Apply a review decision to a Pending expense.
pub async fn review_expense<T: ReviewTransaction>(
    mut tx: T,
    sink: &dyn SheetSink,
    expense_id: Uuid,
    decision: &ReviewDecision,
    reviewer: &Reviewer,
) -> Result<Expense, WorkflowError> {
    let plan = ReviewPlan::from_decision(decision)?;

    let current = tx
        .lock_expense(expense_id)
        .await?
        .ok_or(WorkflowError::NotFound)?;
    ensure_reviewable(current.status)?;

    match plan {
        ReviewPlan::Reject { reason } => {
            let rejected = tx
                .set_review(expense_id, ReviewStatus::Rejected, &reason, reviewer.id)
                .await?;
            tx.commit().await?;
            info!(
                "Expense {} rejected by {}: {}",
                expense_id, reviewer.username, reason
            );
            Ok(rejected)
        }
        ReviewPlan::Approve => {
            let row = ExpenseRow::from_expense(&current, &reviewer.username, Utc::now());
            let receipt = match sink.append_expense(&current.site_name, &row).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    // tx is dropped here, which rolls it back
                    error!(
                        "Spreadsheet append for expense {} failed, approval aborted: {}",
                        expense_id, e
                    );
                    return Err(WorkflowError::Sink(e));
                }
            };

            let approved = match tx
                .set_review(expense_id, ReviewStatus::Approved, "", reviewer.id)
                .await
            {
                Ok(approved) => approved,
                Err(e) => {
                    // Nothing was committed
                    warn!(
                        "Expense {} could not be marked Approved after the sheet append: {}",
                        expense_id, e
                    );
                    clear_appended_row(sink, &receipt, expense_id).await;
                    return Err(e.into());
                }
            };

            let reader = tx.reader();
            match tx.commit().await {
                Ok(()) => {
                    info!(
                        "Expense {} approved by {} and recorded at {}",
                        expense_id, reviewer.username, receipt.updated_range
                    );
                    Ok(approved)
                }
                Err(e) => settle_failed_commit(&reader, sink, &receipt, approved, e).await,
            }
        }
    }
}

/// A commit error does not say whether COMMIT reached the server, so look before clearing
async fn settle_failed_commit<R: ExpenseReader>(
    reader: &R,
    sink: &dyn SheetSink,
    receipt: &AppendReceipt,
    approved: Expense,
    commit_err: DatabaseError,
) -> Result<Expense, WorkflowError> {
    let expense_id = approved.id;
    match reader.committed_expense(expense_id).await {
        Ok(Some(stored))
            if stored.status == ReviewStatus::Approved && stored.reviewed_at == approved.reviewed_at =>
        {
            warn!(
                "Commit of expense {} reported an error but the approval is stored; keeping {}: {}",
                expense_id, receipt.updated_range, commit_err
            );
            Ok(stored)
        }
        Ok(_) => {
            warn!(
                "Expense {} was not marked Approved, clearing {}: {}",
                expense_id, receipt.updated_range, commit_err
            );
            clear_appended_row(sink, receipt, expense_id).await;
            Err(commit_err.into())
        }
        Err(read_err) => {
            error!(
                "Expense {} state unknown after commit error ({}); spreadsheet row {} left in place for manual reconciliation: {}",
                expense_id, commit_err, receipt.updated_range, read_err
            );
            Err(commit_err.into())
        }
    }
}

async fn clear_appended_row(sink: &dyn SheetSink, receipt: &AppendReceipt, expense_id: Uuid) {
    if let Err(revert_err) = sink.revert(receipt).await {
        error!(
            "Spreadsheet row {} for expense {} could not be cleared and needs manual removal: {}",
            receipt.updated_range, expense_id, revert_err
        );
    }
}

/// Expense fields as submitted; on resubmission missing fields keep their old values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseInput {
    pub site_id: Option<Uuid>,
    pub material_id: Option<Uuid>,
    pub material_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub bill_number: Option<String>,
    pub bill_name: Option<String>,
    pub bill_type: Option<String>,
    #[serde(default, with = "crate::types::entry_date")]
    pub date: Option<DateTime<Utc>>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Merge submitted fields over an optional base and compute the derived amounts.
///
/// `catalog` is the material the resulting draft points at, if any.
pub fn compose_draft(
    base: Option<&ExpenseDraft>,
    input: &ExpenseInput,
    catalog: Option<&Material>,
) -> Result<ExpenseDraft, WorkflowError> {
    let site_id = input
        .site_id
        .or(base.map(|b| b.site_id))
        .ok_or_else(|| WorkflowError::invalid("site_id", "Site is required"))?;

    let material_id = input.material_id.or(base.and_then(|b| b.material_id));

    // A newly chosen catalog material renames the line unless a name was given
    let material_name = non_blank(&input.material_name)
        .or_else(|| {
            input
                .material_id
                .and(catalog)
                .map(|m| m.name.clone())
        })
        .or_else(|| base.map(|b| b.material_name.clone()))
        .or_else(|| catalog.map(|m| m.name.clone()))
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| WorkflowError::invalid("material_name", "Material name is required"))?;

    let quantity = input
        .quantity
        .or(base.map(|b| b.quantity))
        .ok_or_else(|| WorkflowError::invalid("quantity", "Quantity is required"))?;
    if quantity <= Decimal::ZERO {
        return Err(WorkflowError::invalid("quantity", "Quantity must be greater than zero"));
    }

    let price_per_unit = input
        .price_per_unit
        .or(base.map(|b| b.price_per_unit))
        .ok_or_else(|| WorkflowError::invalid("price_per_unit", "Price per unit is required"))?;
    if price_per_unit < Decimal::ZERO {
        return Err(WorkflowError::invalid("price_per_unit", "Price per unit cannot be negative"));
    }

    let is_price_changed = catalog
        .map(|m| ledger::price_changed(price_per_unit, m.base_price))
        .unwrap_or(false);
    let total_amount = ledger::line_total(quantity, price_per_unit)
        .ok_or_else(|| WorkflowError::invalid("quantity", "Amount too large"))?;

    Ok(ExpenseDraft {
        site_id,
        material_id,
        material_name,
        quantity,
        price_per_unit,
        total_amount,
        bill_number: non_blank(&input.bill_number).or(base.and_then(|b| b.bill_number.clone())),
        bill_name: non_blank(&input.bill_name).or(base.and_then(|b| b.bill_name.clone())),
        bill_type: non_blank(&input.bill_type).or(base.and_then(|b| b.bill_type.clone())),
        is_price_changed,
        date: input.date.or(base.map(|b| b.date)).unwrap_or_else(Utc::now),
    })
}

/// Look up the referenced site and catalog material, then compose the draft
async fn prepare_draft(
    pool: &PgPool,
    base: Option<&ExpenseDraft>,
    input: &ExpenseInput,
) -> Result<ExpenseDraft, WorkflowError> {
    if let Some(site_id) = input.site_id {
        if Site::find_by_id(pool, site_id).await?.is_none() {
            return Err(WorkflowError::invalid("site_id", "Site not found"));
        }
    }

    let catalog = match input.material_id.or(base.and_then(|b| b.material_id)) {
        Some(material_id) => {
            let material = Material::find_by_id(pool, material_id).await?;
            if material.is_none() && input.material_id.is_some() {
                return Err(WorkflowError::invalid("material_id", "Material not found"));
            }
            material
        }
        None => None,
    };

    compose_draft(base, input, catalog.as_ref())
}

/// Record a new Pending expense for `supervisor_id`
pub async fn submit_expense(
    pool: &PgPool,
    supervisor_id: Uuid,
    input: &ExpenseInput,
) -> Result<Expense, WorkflowError> {
    if input.site_id.is_none() {
        return Err(WorkflowError::invalid("site_id", "Site is required"));
    }
    let draft = prepare_draft(pool, None, input).await?;
    let expense = Expense::create(pool, supervisor_id, &draft).await?;

    info!(
        "Expense {} submitted for site '{}' ({} {})",
        expense.id, expense.site_name, expense.total_amount, expense.status
    );
    Ok(expense)
}

/// Edit a Rejected expense and send it back to the approval queue
pub async fn resubmit_expense(
    pool: &PgPool,
    expense_id: Uuid,
    supervisor_id: Uuid,
    input: &ExpenseInput,
) -> Result<Expense, WorkflowError> {
    let existing = Expense::find_by_id(pool, expense_id)
        .await?
        .ok_or(WorkflowError::NotFound)?;
    check_resubmission(&existing, supervisor_id)?;

    let draft = prepare_draft(pool, Some(&existing.to_draft()), input).await?;
    match Expense::resubmit(pool, expense_id, supervisor_id, &draft).await? {
        Some(expense) => {
            info!("Expense {} resubmitted and back to Pending", expense_id);
            Ok(expense)
        }
        None => {
            // Someone reviewed or changed it between the read and the write
            let current = Expense::find_by_id(pool, expense_id)
                .await?
                .ok_or(WorkflowError::NotFound)?;
            check_resubmission(&current, supervisor_id)?;
            Err(WorkflowError::NotRejected(current.status))
        }
    }
}

/// Only the submitter may edit, and only while the expense is Rejected
pub fn check_resubmission(expense: &Expense, supervisor_id: Uuid) -> Result<(), WorkflowError> {
    if expense.supervisor_id != supervisor_id {
        return Err(WorkflowError::NotOwner);
    }
    match expense.status {
        ReviewStatus::Rejected => Ok(()),
        other => Err(WorkflowError::NotRejected(other)),
    }
}
