//! Error taxonomy for reconciliation runs.
//!
//! Precondition errors are raised before any table is touched. Storage
//! errors abort the current table (and the rest of the run); rows already
//! written before the failure stay written.

use crate::descriptor::ValueTableDescriptor;
use crate::store::StoreError;
use crate::value::ScopeId;

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("scope {0} is the default scope and cannot be reconciled as an override")]
    DefaultScope(ScopeId),

    #[error("scope {0} does not exist")]
    UnknownScope(ScopeId),

    #[error("unknown entity type `{0}` (expected product or category)")]
    UnknownEntityType(String),

    #[error("unknown storage edition `{0}` (expected community or enterprise)")]
    UnknownEdition(String),

    #[error("invalid table prefix `{0}`: only ASCII letters, digits and `_` are allowed")]
    InvalidTablePrefix(String),

    #[error("invalid table name `{0}`: only ASCII letters, digits and `_` are allowed")]
    InvalidTableName(String),

    #[error("failed to resolve scope {scope}")]
    ScopeLookup {
        scope: ScopeId,
        #[source]
        source: StoreError,
    },

    #[error("{operation} failed on table `{table}`")]
    Storage {
        table: String,
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to write audit output: {0}")]
    Audit(#[from] std::io::Error),
}

impl ReconcileError {
    pub fn storage(table: &ValueTableDescriptor, operation: &'static str, source: StoreError) -> Self {
        ReconcileError::Storage {
            table: table.name().to_string(),
            operation,
            source,
        }
    }

    /// True for input problems detected before any table is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ReconcileError::DefaultScope(_)
                | ReconcileError::UnknownScope(_)
                | ReconcileError::UnknownEntityType(_)
                | ReconcileError::UnknownEdition(_)
                | ReconcileError::InvalidTablePrefix(_)
                | ReconcileError::InvalidTableName(_)
        )
    }
}
