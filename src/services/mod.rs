pub mod expense_workflow;

pub use expense_workflow::{
    resubmit_expense, review_expense, submit_expense, ExpenseInput, ExpenseReader, PgReviewTransaction,
    ReviewDecision, Reviewer, WorkflowError,
};
