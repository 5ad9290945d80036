//! Promotion of override values into the default scope.
//!
//! For every non-NULL override `R` in the target scope, the paired default
//! rows whose value differs from `R.value` (exact comparison) are looked up.
//! Each such default row `D` gets `R.value`, and `R` is deleted. An override
//! whose default already holds the same value yields no lookup rows and is
//! left alone by this pass (see [`crate::IdenticalOverridePruner`]).
//!
//! Row pairs are independent units of work without a surrounding
//! transaction. A re-run is idempotent: a promoted override is gone and no
//! longer shows up in the override scan.

use crate::cursor::ScopedRowCursor;
use crate::descriptor::ValueTableDescriptor;
use crate::error::{ReconcileError, Result};
use crate::report::{AuditSink, ReconciliationReport};
use crate::store::{RowQuery, ValueStore};
use crate::value::{AttrValue, ScopeId, ValueRow, DEFAULT_SCOPE};

pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Override scope to reconcile. Must not be [`DEFAULT_SCOPE`].
    pub scope: ScopeId,
    pub dry_run: bool,
    /// Rows fetched per cursor page.
    pub page_size: usize,
    /// Run the promotion pass.
    pub promote_overrides: bool,
    /// Also delete overrides identical to their default (opt-in).
    pub remove_identical: bool,
}

impl ReconcileOptions {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
            promote_overrides: true,
            remove_identical: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn remove_identical(mut self, remove_identical: bool) -> Self {
        self.remove_identical = remove_identical;
        self
    }

    pub fn promote_overrides(mut self, promote_overrides: bool) -> Self {
        self.promote_overrides = promote_overrides;
        self
    }

    /// Rejects the default scope as a reconciliation target.
    pub fn validate(&self) -> Result<()> {
        if self.scope == DEFAULT_SCOPE {
            return Err(ReconcileError::DefaultScope(self.scope));
        }
        Ok(())
    }
}

pub struct ScopeReconciler<'s, S: ValueStore + ?Sized> {
    store: &'s S,
    options: ReconcileOptions,
}

impl<'s, S: ValueStore + ?Sized> ScopeReconciler<'s, S> {
    pub fn new(store: &'s S, options: ReconcileOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    /// Reconcile one table into a fresh report.
    pub fn reconcile(
        &self,
        table: &ValueTableDescriptor,
        sink: &mut dyn AuditSink,
    ) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::new(self.options.dry_run);
        self.reconcile_table(table, &mut report, sink)?;
        Ok(report)
    }

    /// Reconcile one table, accumulating into `report`.
    pub fn reconcile_table(
        &self,
        table: &ValueTableDescriptor,
        report: &mut ReconciliationReport,
        sink: &mut dyn AuditSink,
    ) -> Result<()> {
        report.begin_table(table.name());
        tracing::debug!(
            table = table.name(),
            scope = self.options.scope,
            dry_run = self.options.dry_run,
            "reconciling overrides"
        );

        let overrides = ScopedRowCursor::open(
            self.store,
            table,
            RowQuery::overrides(self.options.scope),
            "scan overrides",
            self.options.page_size,
        );

        for row in overrides {
            let row = row?;
            // NULL overrides belong to the NULL pass.
            let Some(value) = row.value.as_ref() else {
                continue;
            };

            let defaults = ScopedRowCursor::open(
                self.store,
                table,
                RowQuery::mismatching_default(&row, value),
                "look up default value",
                self.options.page_size,
            );

            let mut promoted = 0usize;
            for default in defaults {
                let default = default?;
                self.promote(table, &row, value, &default, report, sink)?;
                promoted += 1;
            }

            if promoted > 1 {
                tracing::warn!(
                    table = table.name(),
                    attribute_id = row.attribute_id,
                    entity_key = row.entity_key,
                    defaults = promoted,
                    "override paired with several default rows"
                );
            }
        }

        Ok(())
    }

    fn promote(
        &self,
        table: &ValueTableDescriptor,
        row: &ValueRow,
        value: &AttrValue,
        default: &ValueRow,
        report: &mut ReconciliationReport,
        sink: &mut dyn AuditSink,
    ) -> Result<()> {
        sink.emit(&format!(
            "Update value {} with store value \"{}\" for attribute {} in table {}",
            default.value_id,
            value,
            row.attribute_id,
            table.name()
        ))?;
        sink.emit(&format!(
            "Delete value {} \"{}\" in favor of {} for attribute {} in table {}",
            row.value_id,
            value,
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
            "promote override into default scope"
        );

        if !self.options.dry_run {
            self.store
                .update_value(table, default.value_id, value)
                .map_err(|source| ReconcileError::storage(table, "update default value", source))?;
            self.store
                .delete_row(table, row.value_id)
                .map_err(|source| ReconcileError::storage(table, "delete override", source))?;
        }

        report.record_promotion(table.name(), row.attribute_id);
        Ok(())
    }
}
