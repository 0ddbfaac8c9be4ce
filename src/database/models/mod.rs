pub mod activity;
pub mod allocation;
pub mod attendance;
pub mod expense;
pub mod material;
pub mod site;
pub mod user;

pub use activity::DailyActivity;
pub use allocation::Allocation;
pub use attendance::Attendance;
pub use expense::{Expense, ExpenseDraft, ExpenseFilter, ReviewStatus, StatusTotal};
pub use material::Material;
pub use site::Site;
pub use user::{Role, User};
