//! Deletion-only passes over override rows.

use crate::cursor::ScopedRowCursor;
use crate::descriptor::ValueTableDescriptor;
use crate::error::{ReconcileError, Result};
use crate::reconcile::ReconcileOptions;
use crate::report::{AuditSink, ReconciliationReport};
use crate::store::{RowQuery, ValueStore};

// ============================================================================
// NULL overrides
// ============================================================================

/// Deletes override rows whose value is NULL.
///
/// A NULL override only says "inherit the default" and is never meaningful
/// on its own, so no comparison against the default row is made.
pub struct NullOverridePruner<'s, S: ValueStore + ?Sized> {
    store: &'s S,
    options: ReconcileOptions,
}

impl<'s, S: ValueStore + ?Sized> NullOverridePruner<'s, S> {
    pub fn new(store: &'s S, options: ReconcileOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    /// Returns the number of NULL overrides found (and, unless dry-run,
    /// deleted).
    pub fn prune(
        &self,
        table: &ValueTableDescriptor,
        report: &mut ReconciliationReport,
        sink: &mut dyn AuditSink,
    ) -> Result<u64> {
        report.begin_table(table.name());
        let scope = self.options.scope;

        let count = self
            .store
            .count_null_overrides(table, scope)
            .map_err(|source| ReconcileError::storage(table, "count NULL overrides", source))?;
        if count == 0 {
            return Ok(0);
        }

        sink.emit(&format!(
            "Deleting {count} NULL value(s) from {}",
            table.name()
        ))?;
        tracing::info!(
            table = table.name(),
            scope,
            count,
            dry_run = self.options.dry_run,
            "prune NULL overrides"
        );

        if !self.options.dry_run {
            let deleted = self
                .store
                .delete_null_overrides(table, scope)
                .map_err(|source| ReconcileError::storage(table, "delete NULL overrides", source))?;
            if deleted != count {
                tracing::warn!(
                    table = table.name(),
                    counted = count,
                    deleted,
                    "NULL override count changed between count and delete"
                );
            }
        }

        report.record_null_prune(table.name(), count);
        Ok(count)
    }
}

// ============================================================================
// Identical overrides
// ============================================================================

/// Deletes override rows whose value is byte-identical to their default.
///
/// Not part of the default run: promotion only looks at mismatching defaults
/// and leaves exact duplicates in place. This pass is enabled explicitly.
pub struct IdenticalOverridePruner<'s, S: ValueStore + ?Sized> {
    store: &'s S,
    options: ReconcileOptions,
}

impl<'s, S: ValueStore + ?Sized> IdenticalOverridePruner<'s, S> {
    pub fn new(store: &'s S, options: ReconcileOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    /// One line and one count per matching default row.
    pub fn prune(
        &self,
        table: &ValueTableDescriptor,
        report: &mut ReconciliationReport,
        sink: &mut dyn AuditSink,
    ) -> Result<u64> {
        report.begin_table(table.name());
        let mut removed = 0u64;

        let overrides = ScopedRowCursor::open(
            self.store,
            table,
            RowQuery::overrides(self.options.scope),
            "scan overrides",
            self.options.page_size,
        );

        for row in overrides {
            let row = row?;
            let Some(value) = row.value.as_ref() else {
                continue;
            };

            let defaults = ScopedRowCursor::open(
                self.store,
                table,
                RowQuery::matching_default(&row, value),
                "look up default value",
                self.options.page_size,
            );

            for default in defaults {
                let default = default?;
                sink.emit(&format!(
                    "Delete value {} in favor of {} for attribute {} in table {}",
                    row.value_id,
                    default.value_id,
                    row.attribute_id,
                    table.name()
                ))?;
                tracing::info!(
                    table = table.name(),
                    attribute_id = row.attribute_id,
                    default_value_id = default.value_id,
                    override_value_id = row.value_id,
                    dry_run = self.options.dry_run,
                    "remove override identical to default"
                );
                if !self.options.dry_run {
                    self.store.delete_row(table, row.value_id).map_err(|source| {
                        ReconcileError::storage(table, "delete identical override", source)
                    })?;
                }
                report.record_identical_prune(table.name(), row.attribute_id);
                removed += 1;
            }
        }

        Ok(removed)
    }
}
