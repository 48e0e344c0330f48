pub mod auth;
pub mod budget_goals;
pub mod config;
pub mod constants;
pub mod database;
pub mod expenses;
pub mod meal_plans;
pub mod models;
pub mod posts;
pub mod ranking;
pub mod token;
pub mod utils;

// Re-export types at crate root for convenient importing
pub use crate::database::{Db, TransactionError, with_transaction};
pub use crate::token::TokenKeeper;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared application database
    pub db: Db,
    /// Bearer token issuance and validation
    pub tokens: TokenKeeper,
}
