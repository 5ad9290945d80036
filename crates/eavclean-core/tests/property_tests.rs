//! Property-based tests for the reconciliation passes
//!
//! 1. A second execute run changes nothing
//! 2. Dry-run and execute produce the same transcript; dry-run writes nothing
//! 3. No NULL override of the target scope survives an execute run
//! 4. Default rows are never deleted
//! 5. Surviving overrides never differ from an existing default

use eavclean_core::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

const TARGET: ScopeId = 2;

fn table() -> ValueTableDescriptor {
    ValueTableDescriptor::named("attr_varchar", TableCategory::Varchar, StorageEdition::Community)
        .unwrap()
}

// ============================================================================
// Strategies
// ============================================================================

fn value_strategy() -> impl Strategy<Value = Option<AttrValue>> {
    prop_oneof![
        1 => Just(None::<AttrValue>),
        4 => prop_oneof![
            Just("Red"),
            Just("red"),
            Just("Blue"),
            Just("Blue "),
            Just(""),
        ]
        .prop_map(|s| Some(AttrValue::text(s))),
    ]
}

/// Rows unique per (entity, attribute, scope); defaults never NULL.
fn rows_strategy() -> impl Strategy<Value = Vec<ValueRow>> {
    prop::collection::btree_map((0i64..6, 0u32..3, 0u32..4), value_strategy(), 0..40).prop_map(
        |cells: BTreeMap<(EntityKey, AttributeId, ScopeId), Option<AttrValue>>| {
            cells
                .into_iter()
                .enumerate()
                .map(|(i, ((entity, attr, scope), value))| {
                    let value = if scope == DEFAULT_SCOPE {
                        value.or_else(|| Some(AttrValue::text("Red")))
                    } else {
                        value
                    };
                    ValueRow::new(i as ValueId + 1, entity, attr, scope, value)
                })
                .collect()
        },
    )
}

fn load(rows: &[ValueRow]) -> MemoryStore {
    let store = MemoryStore::with_scopes([1, 2, 3]);
    let t = table();
    store.create_table(&t);
    for row in rows {
        store.insert(&t, row.clone());
    }
    store
}

fn run(store: &MemoryStore, dry_run: bool, page_size: usize) -> (ReconciliationReport, Vec<String>) {
    let options = ReconcileOptions::new(TARGET)
        .dry_run(dry_run)
        .page_size(page_size);
    let mut lines = Vec::new();
    let report = run_reconciliation(store, &[table()], &options, &mut lines).unwrap();
    (report, lines)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_second_run_is_idempotent(rows in rows_strategy(), page_size in 1usize..8) {
        let store = load(&rows);
        run(&store, false, page_size);
        let after_first = store.rows(&table());

        let (second, _) = run(&store, false, page_size);

        prop_assert_eq!(second.total_promotions(), 0);
        prop_assert_eq!(second.total_null_pruned(), 0);
        prop_assert_eq!(store.rows(&table()), after_first);
    }

    #[test]
    fn prop_dry_run_matches_execute_transcript(rows in rows_strategy()) {
        let preview = load(&rows);
        let execute = load(&rows);

        let (dry, dry_lines) = run(&preview, true, 3);
        let (exec, exec_lines) = run(&execute, false, 3);

        prop_assert_eq!(dry_lines, exec_lines);
        prop_assert_eq!(dry.tables(), exec.tables());
        prop_assert_eq!(preview.rows(&table()), rows);
    }

    #[test]
    fn prop_execute_leaves_no_null_overrides_in_target_scope(rows in rows_strategy()) {
        let store = load(&rows);
        run(&store, false, 4);

        prop_assert!(store
            .rows(&table())
            .iter()
            .all(|r| !(r.scope_id == TARGET && r.value.is_none())));
    }

    #[test]
    fn prop_default_rows_are_never_deleted(rows in rows_strategy()) {
        let store = load(&rows);
        run(&store, false, 2);

        let after = store.rows(&table());
        for before in rows.iter().filter(|r| r.is_default_scope()) {
            let kept = after.iter().find(|r| r.value_id == before.value_id);
            prop_assert!(kept.is_some(), "default row {} deleted", before.value_id);
            let kept = kept.unwrap();
            prop_assert_eq!(kept.entity_key, before.entity_key);
            prop_assert_eq!(kept.attribute_id, before.attribute_id);
            prop_assert!(kept.value.is_some());
        }
    }

    #[test]
    fn prop_surviving_overrides_agree_with_their_default(rows in rows_strategy()) {
        let store = load(&rows);
        run(&store, false, 5);

        let after = store.rows(&table());
        for r in after.iter().filter(|r| r.scope_id == TARGET) {
            for d in after.iter().filter(|d| {
                d.is_default_scope() && d.entity_key == r.entity_key && d.attribute_id == r.attribute_id
            }) {
                prop_assert_eq!(&d.value, &r.value);
            }
        }
    }

    #[test]
    fn prop_other_scopes_are_untouched(rows in rows_strategy()) {
        let store = load(&rows);
        run(&store, false, 3);

        let after = store.rows(&table());
        let others = |rs: &[ValueRow]| {
            rs.iter()
                .filter(|r| r.scope_id != TARGET && !r.is_default_scope())
                .cloned()
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(others(&after), others(&rows));
    }
}
