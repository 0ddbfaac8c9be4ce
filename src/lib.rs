pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod services;
pub mod sheets;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use app::{app, AppState};
