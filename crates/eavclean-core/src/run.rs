//! Fixed-order driver over a set of value tables.

use crate::descriptor::ValueTableDescriptor;
use crate::error::{ReconcileError, Result};
use crate::prune::{IdenticalOverridePruner, NullOverridePruner};
use crate::reconcile::{ReconcileOptions, ScopeReconciler};
use crate::report::{AuditSink, ReconciliationReport};
use crate::store::ValueStore;

/// Run the enabled passes over `tables`, in the order given.
///
/// Per table: promotion, then (opt-in) identical-override removal, then the
/// NULL prune, then the table's status line. The first error aborts the run;
/// tables after the failing one are not touched.
pub fn run_reconciliation<S: ValueStore + ?Sized>(
    store: &S,
    tables: &[ValueTableDescriptor],
    options: &ReconcileOptions,
    sink: &mut dyn AuditSink,
) -> Result<ReconciliationReport> {
    options.validate()?;
    let exists = store
        .scope_exists(options.scope)
        .map_err(|source| ReconcileError::ScopeLookup {
            scope: options.scope,
            source,
        })?;
    if !exists {
        return Err(ReconcileError::UnknownScope(options.scope));
    }

    let reconciler = ScopeReconciler::new(store, options.clone())?;
    let identical = IdenticalOverridePruner::new(store, options.clone())?;
    let nulls = NullOverridePruner::new(store, options.clone())?;
    let mut report = ReconciliationReport::new(options.dry_run);

    for table in tables {
        if options.promote_overrides {
            reconciler.reconcile_table(table, &mut report, sink)?;
        }
        if options.remove_identical {
            identical.prune(table, &mut report, sink)?;
        }
        nulls.prune(table, &mut report, sink)?;

        let summary = report.table(table.name()).map(|t| t.status());
        if let Some(status) = summary {
            sink.emit(status)?;
            tracing::info!(table = table.name(), status, "table finished");
        }
    }

    Ok(report)
}
