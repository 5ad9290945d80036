//! Lazy, forward-only row scans.
//!
//! A [`ScopedRowCursor`] pages through a table by keyset
//! (`value_id > last_seen ORDER BY value_id LIMIT n`): at most one page is
//! held in memory, and nothing is borrowed from the backend between pages,
//! so the caller may write through the same store while iterating. Dropping
//! the cursor releases everything it holds.

use crate::descriptor::ValueTableDescriptor;
use crate::error::ReconcileError;
use crate::store::{RowQuery, ValueStore};
use crate::value::{ValueId, ValueRow};
use std::iter::FusedIterator;
use std::vec;

pub struct ScopedRowCursor<'s, S: ValueStore + ?Sized> {
    store: &'s S,
    table: &'s ValueTableDescriptor,
    query: RowQuery,
    operation: &'static str,
    page_size: usize,
    page: vec::IntoIter<ValueRow>,
    last_seen: Option<ValueId>,
    exhausted: bool,
}

impl<'s, S: ValueStore + ?Sized> ScopedRowCursor<'s, S> {
    /// Nothing is read until the first call to `next`.
    pub fn open(
        store: &'s S,
        table: &'s ValueTableDescriptor,
        query: RowQuery,
        operation: &'static str,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            table,
            query,
            operation,
            page_size: page_size.max(1),
            page: Vec::new().into_iter(),
            last_seen: None,
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<bool, ReconcileError> {
        let rows = self
            .store
            .fetch_page(self.table, &self.query, self.last_seen, self.page_size)
            .map_err(|source| ReconcileError::storage(self.table, self.operation, source))?;
        tracing::debug!(
            table = self.table.name(),
            operation = self.operation,
            after = ?self.last_seen,
            rows = rows.len(),
            "fetched page"
        );
        if rows.len() < self.page_size {
            self.exhausted = true;
        }
        let got_rows = !rows.is_empty();
        self.page = rows.into_iter();
        Ok(got_rows)
    }
}

impl<S: ValueStore + ?Sized> Iterator for ScopedRowCursor<'_, S> {
    type Item = Result<ValueRow, ReconcileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.page.next() {
                self.last_seen = Some(row.value_id);
                return Some(Ok(row));
            }
            if self.exhausted {
                return None;
            }
            match self.fill() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<S: ValueStore + ?Sized> FusedIterator for ScopedRowCursor<'_, S> {}
