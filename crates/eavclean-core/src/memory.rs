//! In-process [`ValueStore`], keyed by table name then `value_id`.
//!
//! Used by tests and previews. Pages are served with the same keyset
//! contract as the SQL backend, so cursors behave identically.

use crate::descriptor::ValueTableDescriptor;
use crate::store::{RowQuery, StoreError, ValueStore};
use crate::value::{AttrValue, ScopeId, ValueId, ValueRow, DEFAULT_SCOPE};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

type Table = BTreeMap<ValueId, ValueRow>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, Table>>,
    scopes: RefCell<BTreeSet<ScopeId>>,
}

impl MemoryStore {
    /// A store that knows the default scope only.
    pub fn new() -> Self {
        Self::with_scopes([DEFAULT_SCOPE])
    }

    pub fn with_scopes(scopes: impl IntoIterator<Item = ScopeId>) -> Self {
        let mut known: BTreeSet<ScopeId> = scopes.into_iter().collect();
        known.insert(DEFAULT_SCOPE);
        Self {
            tables: RefCell::new(BTreeMap::new()),
            scopes: RefCell::new(known),
        }
    }

    pub fn add_scope(&self, scope: ScopeId) {
        self.scopes.borrow_mut().insert(scope);
    }

    /// Create `table` empty if it does not exist yet.
    pub fn create_table(&self, table: &ValueTableDescriptor) {
        self.tables
            .borrow_mut()
            .entry(table.name().to_string())
            .or_default();
    }

    /// Insert or replace a row.
    pub fn insert(&self, table: &ValueTableDescriptor, row: ValueRow) {
        self.tables
            .borrow_mut()
            .entry(table.name().to_string())
            .or_default()
            .insert(row.value_id, row);
    }

    pub fn row(&self, table: &ValueTableDescriptor, value_id: ValueId) -> Option<ValueRow> {
        self.tables
            .borrow()
            .get(table.name())
            .and_then(|t| t.get(&value_id).cloned())
    }

    /// All rows of `table`, ordered by `value_id`.
    pub fn rows(&self, table: &ValueTableDescriptor) -> Vec<ValueRow> {
        self.tables
            .borrow()
            .get(table.name())
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &ValueTableDescriptor) -> usize {
        self.tables
            .borrow()
            .get(table.name())
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &ValueTableDescriptor) -> bool {
        self.len(table) == 0
    }

    fn missing(table: &ValueTableDescriptor) -> StoreError {
        StoreError::Backend(format!("no such table: {}", table.name()))
    }
}

impl ValueStore for MemoryStore {
    fn fetch_page(
        &self,
        table: &ValueTableDescriptor,
        query: &RowQuery,
        after: Option<ValueId>,
        limit: usize,
    ) -> Result<Vec<ValueRow>, StoreError> {
        let tables = self.tables.borrow();
        let Some(rows) = tables.get(table.name()) else {
            return Err(Self::missing(table));
        };
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(rows
            .range((lower, Bound::Unbounded))
            .map(|(_, row)| row)
            .filter(|row| query.matches(row, table.comparison()))
            .take(limit)
            .cloned()
            .collect())
    }

    fn update_value(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
        value: &AttrValue,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| Self::missing(table))?;
        Ok(match rows.get_mut(&value_id) {
            Some(row) => {
                row.value = Some(value.clone());
                1
            }
            None => 0,
        })
    }

    fn delete_row(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| Self::missing(table))?;
        Ok(usize::from(rows.remove(&value_id).is_some()))
    }

    fn count_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError> {
        let query = RowQuery::null_overrides(scope);
        let tables = self.tables.borrow();
        let rows = tables.get(table.name()).ok_or_else(|| Self::missing(table))?;
        Ok(rows
            .values()
            .filter(|row| query.matches(row, table.comparison()))
            .count() as u64)
    }

    fn delete_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError> {
        let query = RowQuery::null_overrides(scope);
        let mut tables = self.tables.borrow_mut();
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| Self::missing(table))?;
        let before = rows.len();
        rows.retain(|_, row| !query.matches(row, table.comparison()));
        Ok((before - rows.len()) as u64)
    }

    fn scope_exists(&self, scope: ScopeId) -> Result<bool, StoreError> {
        Ok(self.scopes.borrow().contains(&scope))
    }
}
