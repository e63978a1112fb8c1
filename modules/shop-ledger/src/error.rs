//! Error taxonomy shared by the balance engine and the report engine

use thiserror::Error;

use crate::models::EntityType;
use crate::repos::StoreError;

/// Errors surfaced by core operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity_type} {entity_id} not found")]
    NotFound {
        entity_type: EntityType,
        entity_id: i64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Stable machine-readable code used in batch failure reports
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::Storage(_) => "storage",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
