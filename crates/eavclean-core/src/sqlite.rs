//! SQLite-backed [`ValueStore`].
//!
//! Queries are built from validated identifiers only (table names and
//! column names come from [`ValueTableDescriptor`]); all values are bound
//! as parameters. Value comparisons use the descriptor's collation
//! (`BINARY` for exact tables) so text is never matched case-insensitively.
//! Values keep their storage class on the way out and back in: a BLOB is
//! read and bound as a BLOB, TEXT as raw TEXT bytes.

use crate::descriptor::{validate_table_prefix, ValueTableDescriptor, SCOPE_COLUMN};
use crate::store::{RowQuery, StoreError, ValueFilter, ValueStore};
use crate::value::{AttrValue, ScopeId, ValueId, ValueKind, ValueRow};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, ToSql};
use std::path::Path;
use std::time::Duration;

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub busy_timeout_ms: u64,
    /// Prefix of the scope table (`{prefix}store`).
    pub table_prefix: String,
    /// Fail instead of creating a missing database file.
    pub must_exist: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            table_prefix: String::new(),
            must_exist: true,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
    scope_table: String,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, options: &SqliteOptions) -> Result<Self, StoreError> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if !options.must_exist {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(path, flags)?;
        Self::from_connection(conn, options)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, &SqliteOptions::default())
    }

    pub fn from_connection(conn: Connection, options: &SqliteOptions) -> Result<Self, StoreError> {
        validate_table_prefix(&options.table_prefix)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        Ok(Self {
            conn,
            scope_table: format!("{}store", options.table_prefix),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the scope table and the given value tables if missing.
    ///
    /// Decimal and datetime values are declared `TEXT` so stored text is
    /// returned verbatim and compared exactly.
    pub fn install_schema(&self, tables: &[ValueTableDescriptor]) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n\
             \x20 store_id INTEGER PRIMARY KEY,\n\
             \x20 code TEXT NOT NULL DEFAULT ''\n\
             );\n\
             INSERT OR IGNORE INTO \"{}\" (store_id, code) VALUES (0, 'admin');",
            self.scope_table, self.scope_table
        ))?;
        for table in tables {
            let value_type = match table.value_kind() {
                ValueKind::Integer => "INTEGER",
                ValueKind::Text => "TEXT",
            };
            let entity = table.entity_column();
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (\n\
                 \x20 value_id INTEGER PRIMARY KEY AUTOINCREMENT,\n\
                 \x20 attribute_id INTEGER NOT NULL,\n\
                 \x20 {SCOPE_COLUMN} INTEGER NOT NULL DEFAULT 0,\n\
                 \x20 {entity} INTEGER NOT NULL,\n\
                 \x20 value {value_type} NULL,\n\
                 \x20 UNIQUE ({entity}, attribute_id, {SCOPE_COLUMN})\n\
                 );",
                name = table.name(),
            ))?;
        }
        Ok(())
    }

    pub fn add_scope(&self, scope: ScopeId, code: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO \"{}\" (store_id, code) VALUES (?1, ?2)",
                self.scope_table
            ),
            params![scope, code],
        )?;
        Ok(())
    }

    /// Insert a row with an explicit `value_id`.
    pub fn insert_row(&self, table: &ValueTableDescriptor, row: &ValueRow) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (value_id, attribute_id, {SCOPE_COLUMN}, {}, value) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                table.name(),
                table.entity_column()
            ),
            params![
                row.value_id,
                row.attribute_id,
                row.scope_id,
                row.entity_key,
                row.value
            ],
        )?;
        Ok(())
    }

    pub fn row(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
    ) -> Result<Option<ValueRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT value_id, {}, attribute_id, {SCOPE_COLUMN}, value FROM \"{}\" WHERE value_id = ?1",
            table.entity_column(),
            table.name()
        ))?;
        let mut rows = stmt.query_map(params![value_id], read_row)?;
        let row = rows.next().transpose()?;
        Ok(row)
    }
}

fn select_sql(table: &ValueTableDescriptor, query: &RowQuery, paged: bool) -> String {
    let mut sql = format!(
        "SELECT value_id, {}, attribute_id, {SCOPE_COLUMN}, value FROM \"{}\" WHERE {SCOPE_COLUMN} = ?",
        table.entity_column(),
        table.name()
    );
    if query.attribute_id.is_some() {
        sql.push_str(" AND attribute_id = ?");
    }
    if query.entity_key.is_some() {
        sql.push_str(&format!(" AND {} = ?", table.entity_column()));
    }
    let collation = table.comparison().collation();
    match query.value {
        ValueFilter::NotNull => sql.push_str(" AND value IS NOT NULL"),
        ValueFilter::IsNull => sql.push_str(" AND value IS NULL"),
        ValueFilter::Differs(_) => sql.push_str(&format!(" AND value <> ? COLLATE {collation}")),
        ValueFilter::Equals(_) => sql.push_str(&format!(" AND value = ? COLLATE {collation}")),
    }
    if paged {
        sql.push_str(" AND value_id > ? ORDER BY value_id LIMIT ?");
    }
    sql
}

fn query_params(query: &RowQuery) -> rusqlite::Result<Vec<ToSqlOutput<'_>>> {
    let mut out = vec![ToSqlOutput::from(i64::from(query.scope_id))];
    if let Some(attribute_id) = query.attribute_id {
        out.push(ToSqlOutput::from(i64::from(attribute_id)));
    }
    if let Some(entity_key) = query.entity_key {
        out.push(ToSqlOutput::from(entity_key));
    }
    if let ValueFilter::Differs(v) | ValueFilter::Equals(v) = &query.value {
        out.push(v.to_sql()?);
    }
    Ok(out)
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ValueRow> {
    let value = match row.get_ref(4)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(AttrValue::Integer(i)),
        ValueRef::Real(r) => Some(AttrValue::real(r)),
        ValueRef::Text(bytes) => Some(AttrValue::Text(bytes.to_vec())),
        ValueRef::Blob(bytes) => Some(AttrValue::Blob(bytes.to_vec())),
    };
    Ok(ValueRow {
        value_id: row.get(0)?,
        entity_key: row.get(1)?,
        attribute_id: row.get(2)?,
        scope_id: row.get(3)?,
        value,
    })
}

impl ToSql for AttrValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            AttrValue::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            AttrValue::Real(bits) => ToSqlOutput::Borrowed(ValueRef::Real(f64::from_bits(*bits))),
            AttrValue::Text(bytes) => ToSqlOutput::Borrowed(ValueRef::Text(bytes)),
            AttrValue::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

impl ValueStore for SqliteStore {
    fn fetch_page(
        &self,
        table: &ValueTableDescriptor,
        query: &RowQuery,
        after: Option<ValueId>,
        limit: usize,
    ) -> Result<Vec<ValueRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&select_sql(table, query, true))?;
        let mut bound = query_params(query)?;
        bound.push(ToSqlOutput::from(after.unwrap_or(i64::MIN)));
        bound.push(ToSqlOutput::from(i64::try_from(limit).unwrap_or(i64::MAX)));
        let rows = stmt
            .query_map(params_from_iter(bound.iter()), read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn update_value(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
        value: &AttrValue,
    ) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "UPDATE \"{}\" SET value = ?1 WHERE value_id = ?2",
            table.name()
        ))?;
        Ok(stmt.execute(params![value, value_id])?)
    }

    fn delete_row(
        &self,
        table: &ValueTableDescriptor,
        value_id: ValueId,
    ) -> Result<usize, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("DELETE FROM \"{}\" WHERE value_id = ?1", table.name()))?;
        Ok(stmt.execute(params![value_id])?)
    }

    fn count_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM \"{}\" WHERE {SCOPE_COLUMN} = ?1 AND value IS NULL",
                table.name()
            ),
            params![scope],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn delete_null_overrides(
        &self,
        table: &ValueTableDescriptor,
        scope: ScopeId,
    ) -> Result<u64, StoreError> {
        let deleted = self.conn.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE {SCOPE_COLUMN} = ?1 AND value IS NULL",
                table.name()
            ),
            params![scope],
        )?;
        Ok(deleted as u64)
    }

    fn scope_exists(&self, scope: ScopeId) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE store_id = ?1)",
                self.scope_table
            ),
            params![scope],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
