//! Counters, summaries and the audit output channel.
//!
//! The report observes; it never writes to storage. Destructive actions live
//! in [`crate::reconcile`] and [`crate::prune`].

use crate::value::AttributeId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};

pub const STATUS_DONE: &str = "Done";
pub const STATUS_CLEAN: &str = "There were no attribute values to clean up";

// ============================================================================
// Audit output
// ============================================================================

/// Line-oriented audit output.
pub trait AuditSink {
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

impl AuditSink for Vec<String> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Writes each line, newline-terminated, to any [`Write`].
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> AuditSink for WriteSink<W> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.inner, "{line}")
    }
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Promotions per attribute.
    pub counts: BTreeMap<AttributeId, u64>,
    pub null_pruned: u64,
    /// Identical-override deletions per attribute (opt-in pass).
    pub identical_pruned: BTreeMap<AttributeId, u64>,
}

impl TableReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn promotions(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn identical_deletions(&self) -> u64 {
        self.identical_pruned.values().sum()
    }

    /// `Done` once any attribute value was cleaned up, otherwise the
    /// "nothing to clean up" message. NULL pruning alone does not count.
    pub fn status(&self) -> &'static str {
        if self.counts.is_empty() && self.identical_pruned.is_empty() {
            STATUS_CLEAN
        } else {
            STATUS_DONE
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    dry_run: bool,
    tables: Vec<TableReport>,
}

impl ReconciliationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            tables: Vec::new(),
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Register `table` so it appears in the report (and gets a status
    /// line) even when nothing is recorded for it.
    pub fn begin_table(&mut self, table: &str) {
        self.entry(table);
    }

    fn entry(&mut self, table: &str) -> &mut TableReport {
        let index = match self.tables.iter().rposition(|t| t.table == table) {
            Some(index) => index,
            None => {
                self.tables.push(TableReport::new(table));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    pub fn record_promotion(&mut self, table: &str, attribute_id: AttributeId) {
        *self.entry(table).counts.entry(attribute_id).or_insert(0) += 1;
    }

    pub fn record_null_prune(&mut self, table: &str, n: u64) {
        self.entry(table).null_pruned += n;
    }

    pub fn record_identical_prune(&mut self, table: &str, attribute_id: AttributeId) {
        *self
            .entry(table)
            .identical_pruned
            .entry(attribute_id)
            .or_insert(0) += 1;
    }

    pub fn tables(&self) -> &[TableReport] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total_promotions(&self) -> u64 {
        self.tables.iter().map(TableReport::promotions).sum()
    }

    pub fn total_null_pruned(&self) -> u64 {
        self.tables.iter().map(|t| t.null_pruned).sum()
    }

    pub fn total_identical_pruned(&self) -> u64 {
        self.tables.iter().map(TableReport::identical_deletions).sum()
    }

    /// Nothing promoted, pruned or deleted anywhere.
    pub fn is_clean(&self) -> bool {
        self.total_promotions() == 0
            && self.total_null_pruned() == 0
            && self.total_identical_pruned() == 0
    }

    /// Human-readable per-table summary.
    pub fn summarize(&self) -> String {
        let mut out = String::new();
        if self.dry_run {
            out.push_str("Dry run: no changes were written.\n");
        }
        for t in &self.tables {
            if t.status() == STATUS_CLEAN {
                let _ = write!(out, "{}: {}", t.table, STATUS_CLEAN);
                if t.null_pruned > 0 {
                    let _ = write!(out, " ({} NULL value(s) pruned)", t.null_pruned);
                }
                out.push('\n');
                continue;
            }

            let _ = write!(
                out,
                "{}: {} ({} promotion(s) across {} attribute(s); {} NULL value(s) pruned",
                t.table,
                STATUS_DONE,
                t.promotions(),
                t.counts.len(),
                t.null_pruned
            );
            if !t.identical_pruned.is_empty() {
                let _ = write!(
                    out,
                    "; {} identical override(s) removed",
                    t.identical_deletions()
                );
            }
            out.push_str(")\n");
            for (attribute_id, n) in &t.counts {
                let _ = writeln!(out, "  attribute {attribute_id}: {n}");
            }
            for (attribute_id, n) in &t.identical_pruned {
                let _ = writeln!(out, "  attribute {attribute_id}: {n} identical");
            }
        }
        out
    }
}
