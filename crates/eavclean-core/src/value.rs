//! Rows and values as the engine sees them.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ValueId = i64;
pub type EntityKey = i64;
pub type AttributeId = u32;
pub type ScopeId = u32;

/// The default/global scope. Never reconciled as an override.
pub const DEFAULT_SCOPE: ScopeId = 0;

/// Declared type of a table's `value` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Text,
}

/// A non-NULL stored value, tagged with its SQLite storage class.
///
/// Equality is exact: text and blobs compare byte-for-byte, so case and
/// trailing whitespace are significant, and a TEXT value never equals a
/// BLOB with the same bytes. Text is not required to be UTF-8. Decimal and
/// datetime columns are carried in their stored text form (`"12.500000"`,
/// `"2024-01-01 00:00:00"`) and are never normalised before comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    Integer(i64),
    /// IEEE-754 bits of a REAL value.
    Real(u64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

impl AttrValue {
    pub fn text(s: impl Into<Vec<u8>>) -> Self {
        AttrValue::Text(s.into())
    }

    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        AttrValue::Blob(bytes.into())
    }

    pub fn real(r: f64) -> Self {
        AttrValue::Real(r.to_bits())
    }

    /// Raw bytes of a TEXT or BLOB value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttrValue::Text(b) | AttrValue::Blob(b) => Some(b),
            AttrValue::Integer(_) | AttrValue::Real(_) => None,
        }
    }
}

/// Audit rendering. Bytes that are not UTF-8 are shown lossily; the value
/// itself is never rewritten.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(i) => write!(f, "{i}"),
            AttrValue::Real(bits) => write!(f, "{}", f64::from_bits(*bits)),
            AttrValue::Text(b) | AttrValue::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::text(s)
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Integer(i)
    }
}

impl From<f64> for AttrValue {
    fn from(r: f64) -> Self {
        AttrValue::real(r)
    }
}

/// One physical row of a value table.
///
/// `entity_key` is the semantic entity identity; its physical column name
/// depends on the storage edition (see [`crate::StorageEdition`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRow {
    pub value_id: ValueId,
    pub entity_key: EntityKey,
    pub attribute_id: AttributeId,
    pub scope_id: ScopeId,
    /// `None` is SQL NULL ("inherit the default").
    pub value: Option<AttrValue>,
}

impl ValueRow {
    pub fn new(
        value_id: ValueId,
        entity_key: EntityKey,
        attribute_id: AttributeId,
        scope_id: ScopeId,
        value: Option<AttrValue>,
    ) -> Self {
        Self {
            value_id,
            entity_key,
            attribute_id,
            scope_id,
            value,
        }
    }

    pub fn is_default_scope(&self) -> bool {
        self.scope_id == DEFAULT_SCOPE
    }
}
