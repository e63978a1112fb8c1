pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod repos;
pub mod routes;
pub mod services;

pub use error::{LedgerError, LedgerResult};
pub use routes::{router, AppState};
