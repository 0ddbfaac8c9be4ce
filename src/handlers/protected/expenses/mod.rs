// handlers/protected/expenses/mod.rs - material expenses and their review

pub mod create; // POST /api/expenses
pub mod list; // GET /api/expenses, GET /api/expenses/:id
pub mod resubmit; // PUT /api/expenses/:id - edit a rejected expense
pub mod review; // PUT /api/expenses/:id/status - approve or reject

pub use create::expenses_post;
pub use list::{expense_get, expenses_get};
pub use resubmit::expense_put;
pub use review::status_put;
