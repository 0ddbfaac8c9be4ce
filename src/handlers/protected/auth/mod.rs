// handlers/protected/auth/mod.rs - Account handlers for authenticated users

pub mod me; // GET /api/auth/me - current profile
pub mod register; // POST /api/auth/register - manager creates an account

pub use me::me_get;
pub use register::register_post;
