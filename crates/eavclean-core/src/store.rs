//! The storage seam.
//!
//! A [`ValueStore`] answers paged row queries and performs the two writes the
//! engine ever makes (overwrite a value, delete a row) plus the bulk NULL
//! prune. All methods take `&self`: reads and writes share one logical
//! connection and writes happen between cursor pages.

use crate::descriptor::{Comparison, ValueTableDescriptor};
use crate::value::{AttrValue, AttributeId, EntityKey, ScopeId, ValueId, ValueRow, DEFAULT_SCOPE};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(String),
}

/// Condition on the `value` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFilter {
    NotNull,
    IsNull,
    /// `value <> v` under the table's comparison. NULL never matches.
    Differs(AttrValue),
    /// `value = v` under the table's comparison. NULL never matches.
    Equals(AttrValue),
}

/// A conjunctive row filter over one value table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub scope_id: ScopeId,
    pub attribute_id: Option<AttributeId>,
    pub entity_key: Option<EntityKey>,
    pub value: ValueFilter,
}

impl RowQuery {
    /// Non-NULL rows of `scope`.
    pub fn overrides(scope: ScopeId) -> Self {
        Self {
            scope_id: scope,
            attribute_id: None,
            entity_key: None,
            value: ValueFilter::NotNull,
        }
    }

    /// NULL rows of `scope`.
    pub fn null_overrides(scope: ScopeId) -> Self {
        Self {
            scope_id: scope,
            attribute_id: None,
            entity_key: None,
            value: ValueFilter::IsNull,
        }
    }

    /// Default rows paired with `row` whose value differs from `value`.
    pub fn mismatching_default(row: &ValueRow, value: &AttrValue) -> Self {
        Self {
            scope_id: DEFAULT_SCOPE,
            attribute_id: Some(row.attribute_id),
            entity_key: Some(row.entity_key),
            value: ValueFilter::Differs(value.clone()),
        }
    }

    /// Default rows paired with `row` holding exactly `value`.
    pub fn matching_default(row: &ValueRow, value: &AttrValue) -> Self {
        Self {
            scope_id: DEFAULT_SCOPE,
            attribute_id: Some(row.attribute_id),
            entity_key: Some(row.entity_key),
            value: ValueFilter::Equals(value.clone()),
        }
    }

    /// In-process evaluation with SQL NULL semantics; value filters use
    /// `comparison`.
    pub fn matches(&self, row: &ValueRow, comparison: Comparison) -> bool {
        if row.scope_id != self.scope_id {
            return false;
        }
        if self.attribute_id.is_some_and(|a| a != row.attribute_id) {
            return false;
        }
        if self.entity_key.is_some_and(|e| e != row.entity_key) {
            return false;
        }
        match (&self.value, &row.value) {
            (ValueFilter::NotNull, v) => v.is_some(),
            (ValueFilter::IsNull, v) => v.is_none(),
            (ValueFilter::Differs(want), Some(v)) => !comparison.same(v, want),
            (ValueFilter::Equals(want), Some(v)) => comparison.same(v, want),
            (ValueFilter::Differs(_) | ValueFilter::Equals(_), None) => false,
        }
    }
}

pub trait ValueStore {
    /// Up to `limit` rows matching `query` with `value_id > after`, ordered by
    /// `value_id`.
    fn fetch_page(
        &self,
        table: &ValueTableDescriptor,
        query: &RowQuery,
        after: Option<ValueId>,
        limit: usize,
    ) -> Result<Vec<ValueRow>, StoreError>;

    /// Overwrite the value of one row. Returns the number of rows changed.
    fn update_value(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
        value: &AttrValue,
    ) -> Result<usize, StoreError>;

    /// Delete one row. Returns the number of rows removed.
    fn delete_row(&self, table: &ValueTableDescriptor, value_id: ValueId)
        -> Result<usize, StoreError>;

    fn count_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError>;

    /// Bulk-delete every NULL row of `scope`. Returns the number removed.
    fn delete_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError>;

    /// Whether `scope` is a known scope of the host system.
    fn scope_exists(&self, scope: ScopeId) -> Result<bool, StoreError>;
}
