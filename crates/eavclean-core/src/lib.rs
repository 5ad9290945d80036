//! eavclean: scope reconciliation for EAV value tables
//!
//! Attribute values live in one row per `(entity, attribute, scope)`. Scope 0
//! holds the default; every other scope may override it. This crate finds
//! override rows that should be folded back into the default scope:
//!
//! ```text
//!   override scan (scope = N, value NOT NULL)
//!        │
//!        ▼
//!   ┌──────────────┐   default lookup (scope 0, same entity/attribute,
//!   │ override  R  │──► value <> R.value, exact)
//!   └──────────────┘        │
//!                           ├──► none ──► leave R alone
//!                           │
//!                           └──► D    ──► D.value := R.value, delete R
//!
//!   NULL pass (scope = N, value IS NULL) ──► bulk delete
//! ```
//!
//! Every action is written to an [`AuditSink`] before it is applied, and the
//! transcript is identical in dry-run and execute mode.
//!
//! ## Modules
//!
//! - [`descriptor`]: which physical tables and columns to touch
//! - [`store`]: the storage seam ([`ValueStore`]) and row filters
//! - [`cursor`]: lazy keyset-paged scans
//! - [`reconcile`] / [`prune`]: the passes
//! - [`report`]: counters, summaries and audit output
//! - [`run`]: fixed-order driver over a table set

pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod memory;
pub mod prune;
pub mod reconcile;
pub mod report;
pub mod run;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;
pub mod value;


pub use cursor::ScopedRowCursor;
pub use descriptor::{
    validate_table_prefix, Comparison, EntityType, StorageEdition, TableCategory,
    ValueTableDescriptor, SCOPE_COLUMN,
};
pub use error::{ReconcileError, Result};
pub use memory::MemoryStore;
pub use prune::{IdenticalOverridePruner, NullOverridePruner};
pub use reconcile::{ReconcileOptions, ScopeReconciler, DEFAULT_PAGE_SIZE};
pub use report::{AuditSink, ReconciliationReport, TableReport, WriteSink};
pub use run::run_reconciliation;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteOptions, SqliteStore};
pub use store::{RowQuery, StoreError, ValueFilter, ValueStore};
pub use value::{
    AttrValue, AttributeId, EntityKey, ScopeId, ValueId, ValueKind, ValueRow, DEFAULT_SCOPE,
};

#[cfg(feature = "sqlite")]
pub use rusqlite;
