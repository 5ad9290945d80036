//! Integration tests for the complete reconciliation pipeline
//!
//! These tests drive both backends through the public API:
//! - Descriptor set → run driver → audit transcript
//! - MemoryStore and SqliteStore agree on the same seed
//! - Cursor reads interleaved with writes
//!
//! Run with: cargo test --test integration_tests

use eavclean_core::*;
use tempfile::tempdir;

fn text(v: &str) -> Option<AttrValue> {
    Some(AttrValue::text(v))
}

fn varchar() -> ValueTableDescriptor {
    ValueTableDescriptor::named("attr_varchar", TableCategory::Varchar, StorageEdition::Community)
        .unwrap()
}

// ============================================================================
// Single-table scenario
// ============================================================================

#[test]
fn test_override_is_promoted_into_default_row() {
    let store = MemoryStore::with_scopes([7]);
    let table = varchar();
    store.create_table(&table);
    store.insert(&table, ValueRow::new(1, 3, 9, 0, text("Red")));
    store.insert(&table, ValueRow::new(2, 3, 9, 7, text("Blue")));

    let mut lines = Vec::new();
    let report = run_reconciliation(
        &store,
        std::slice::from_ref(&table),
        &ReconcileOptions::new(7),
        &mut lines,
    )
    .unwrap();

    assert_eq!(store.row(&table, 1).unwrap().value, text("Blue"));
    assert!(store.row(&table, 2).is_none());
    let summary = report.table("attr_varchar").unwrap();
    assert_eq!(summary.counts.get(&9), Some(&1));
    assert_eq!(summary.status(), "Done");
    assert_eq!(lines.last().map(String::as_str), Some("Done"));
}

#[test]
fn test_reconciler_and_pruner_compose_by_hand() {
    let store = MemoryStore::with_scopes([4]);
    let table = varchar();
    store.create_table(&table);
    store.insert(&table, ValueRow::new(1, 1, 5, 0, text("a")));
    store.insert(&table, ValueRow::new(2, 1, 5, 4, text("b")));
    store.insert(&table, ValueRow::new(3, 2, 5, 4, None));

    let options = ReconcileOptions::new(4);
    let mut lines = Vec::new();
    let mut report = ReconciliationReport::new(false);
    ScopeReconciler::new(&store, options.clone())
        .unwrap()
        .reconcile_table(&table, &mut report, &mut lines)
        .unwrap();
    let pruned = NullOverridePruner::new(&store, options)
        .unwrap()
        .prune(&table, &mut report, &mut lines)
        .unwrap();

    assert_eq!(pruned, 1);
    assert_eq!(report.total_promotions(), 1);
    assert_eq!(report.total_null_pruned(), 1);
    assert_eq!(store.rows(&table).len(), 1);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "Deleting 1 NULL value(s) from attr_varchar");
}

// ============================================================================
// Backend parity
// ============================================================================

fn seed(rows: &mut dyn FnMut(usize, ValueRow)) {
    // (table index, value_id, entity, attribute, scope, value)
    let seed: [(usize, ValueId, EntityKey, AttributeId, ScopeId, Option<AttrValue>); 9] = [
        (0, 1, 10, 71, 0, text("Blue Shirt")),
        (0, 2, 10, 71, 2, text("blue shirt")),
        (0, 3, 11, 71, 0, text("Socks")),
        (0, 4, 11, 71, 2, text("Socks")),
        (0, 5, 11, 71, 3, text("Sokken")),
        (1, 1, 10, 99, 0, Some(AttrValue::Integer(1))),
        (1, 2, 10, 99, 2, Some(AttrValue::Integer(0))),
        (1, 3, 11, 99, 2, None),
        (3, 1, 12, 75, 2, text("orphan override")),
    ];
    for (index, value_id, entity, attribute, scope, value) in seed {
        rows(index, ValueRow::new(value_id, entity, attribute, scope, value));
    }
}

#[test]
fn test_memory_and_sqlite_backends_agree() {
    let tables =
        ValueTableDescriptor::all_for(EntityType::Product, StorageEdition::Community, "").unwrap();

    let memory = MemoryStore::with_scopes([2, 3]);
    for table in &tables {
        memory.create_table(table);
    }
    seed(&mut |i, row| memory.insert(&tables[i], row));

    let dir = tempdir().unwrap();
    let sqlite = SqliteStore::open(
        dir.path().join("parity.sqlite"),
        &SqliteOptions {
            must_exist: false,
            ..SqliteOptions::default()
        },
    )
    .unwrap();
    sqlite.install_schema(&tables).unwrap();
    sqlite.add_scope(2, "de").unwrap();
    sqlite.add_scope(3, "nl").unwrap();
    seed(&mut |i, row| sqlite.insert_row(&tables[i], &row).unwrap());

    let options = ReconcileOptions::new(2).page_size(2);
    let mut memory_lines = Vec::new();
    let mut sqlite_lines = Vec::new();
    let memory_report = run_reconciliation(&memory, &tables, &options, &mut memory_lines).unwrap();
    let sqlite_report = run_reconciliation(&sqlite, &tables, &options, &mut sqlite_lines).unwrap();

    assert_eq!(memory_lines, sqlite_lines);
    assert_eq!(memory_report, sqlite_report);
    assert_eq!(memory_report.total_promotions(), 2);
    assert_eq!(memory_report.total_null_pruned(), 1);

    for table in &tables {
        let sqlite_rows: Vec<ValueRow> = memory
            .rows(table)
            .iter()
            .filter_map(|r| sqlite.row(table, r.value_id).unwrap())
            .collect();
        assert_eq!(memory.rows(table), sqlite_rows, "table {}", table.name());
    }
    // Override with no default row is left alone.
    assert!(sqlite.row(&tables[3], 1).unwrap().is_some());
    // Other scope untouched.
    assert_eq!(memory.row(&tables[0], 5).unwrap().value, text("Sokken"));
}

// ============================================================================
// Cursor
// ============================================================================

#[test]
fn test_cursor_survives_deletes_between_pages_on_sqlite() {
    let store = SqliteStore::open_in_memory().unwrap();
    let table = ValueTableDescriptor::all_for(EntityType::Category, StorageEdition::Community, "")
        .unwrap()
        .remove(0);
    store.install_schema(std::slice::from_ref(&table)).unwrap();
    for i in 1..=10 {
        store
            .insert_row(&table, &ValueRow::new(i, i, 1, 5, text("x")))
            .unwrap();
    }

    let mut seen = Vec::new();
    let cursor = ScopedRowCursor::open(&store, &table, RowQuery::overrides(5), "scan", 1);
    for row in cursor {
        let row = row.unwrap();
        seen.push(row.value_id);
        // Next page is read after this delete.
        store.delete_row(&table, row.value_id + 1).unwrap();
    }

    assert_eq!(seen, vec![1, 3, 5, 7, 9]);
}

#[test]
fn test_dry_run_transcript_matches_execute_on_sqlite() {
    let tables =
        ValueTableDescriptor::all_for(EntityType::Product, StorageEdition::Enterprise, "m2_")
            .unwrap();
    let build = || {
        let store = SqliteStore::from_connection(
            rusqlite::Connection::open_in_memory().unwrap(),
            &SqliteOptions {
                table_prefix: "m2_".to_string(),
                ..SqliteOptions::default()
            },
        )
        .unwrap();
        store.install_schema(&tables).unwrap();
        store.add_scope(2, "de").unwrap();
        seed(&mut |i, row| store.insert_row(&tables[i], &row).unwrap());
        store
    };
    let preview = build();
    let execute = build();

    let mut dry_lines = Vec::new();
    let mut exec_lines = Vec::new();
    let dry = run_reconciliation(
        &preview,
        &tables,
        &ReconcileOptions::new(2).dry_run(true),
        &mut dry_lines,
    )
    .unwrap();
    let exec =
        run_reconciliation(&execute, &tables, &ReconcileOptions::new(2), &mut exec_lines).unwrap();

    assert_eq!(dry_lines, exec_lines);
    assert_eq!(dry.tables(), exec.tables());
    assert!(dry.summarize().starts_with("Dry run: no changes were written."));
    assert_eq!(
        preview.row(&tables[0], 1).unwrap().unwrap().value,
        text("Blue Shirt")
    );
    assert_eq!(
        execute.row(&tables[0], 1).unwrap().unwrap().value,
        text("blue shirt")
    );
}
