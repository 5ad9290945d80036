//! Static description of the physical value tables.
//!
//! Table and column names are resolved once, from closed enumerations, so
//! the passes are written against a single schema shape:
//!
//! | edition    | entity key column |
//! |------------|-------------------|
//! | community  | `entity_id`       |
//! | enterprise | `row_id`          |
//!
//! Physical table name: `{prefix}catalog_{entity}_entity_{category}`.

use crate::error::{ReconcileError, Result};
use crate::value::{AttrValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column holding the scope id in every value table.
pub const SCOPE_COLUMN: &str = "store_id";

// ============================================================================
// Closed enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Product,
    Category,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Product, EntityType::Category];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Category => "category",
        }
    }
}

impl FromStr for EntityType {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "product" => Ok(EntityType::Product),
            "category" => Ok(EntityType::Category),
            other => Err(ReconcileError::UnknownEntityType(other.to_string())),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value table category. [`TableCategory::ORDERED`] is the processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableCategory {
    Varchar,
    Int,
    Decimal,
    Text,
    Datetime,
}

impl TableCategory {
    pub const ORDERED: [TableCategory; 5] = [
        TableCategory::Varchar,
        TableCategory::Int,
        TableCategory::Decimal,
        TableCategory::Text,
        TableCategory::Datetime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableCategory::Varchar => "varchar",
            TableCategory::Int => "int",
            TableCategory::Decimal => "decimal",
            TableCategory::Text => "text",
            TableCategory::Datetime => "datetime",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            TableCategory::Int => ValueKind::Integer,
            _ => ValueKind::Text,
        }
    }
}

impl fmt::Display for TableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageEdition {
    #[default]
    Community,
    Enterprise,
}

impl StorageEdition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageEdition::Community => "community",
            StorageEdition::Enterprise => "enterprise",
        }
    }

    /// Column correlating a value row with its entity instance.
    pub fn entity_column(&self) -> &'static str {
        match self {
            StorageEdition::Community => "entity_id",
            StorageEdition::Enterprise => "row_id",
        }
    }
}

impl FromStr for StorageEdition {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "community" | "ce" => Ok(StorageEdition::Community),
            "enterprise" | "ee" | "commerce" => Ok(StorageEdition::Enterprise),
            _ => Err(ReconcileError::UnknownEdition(s.to_string())),
        }
    }
}

impl fmt::Display for StorageEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How override and default values are compared. Both backends take the
/// comparison from the descriptor: SQLite through [`Comparison::collation`],
/// in-process evaluation through [`Comparison::same`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// Byte-for-byte, case-sensitive, storage class included.
    Exact,
}

impl Comparison {
    /// SQLite collation used for `value = ?` / `value <> ?`.
    pub fn collation(&self) -> &'static str {
        match self {
            Comparison::Exact => "BINARY",
        }
    }

    pub fn same(&self, a: &AttrValue, b: &AttrValue) -> bool {
        match self {
            Comparison::Exact => a == b,
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueTableDescriptor {
    table_name: String,
    entity: Option<EntityType>,
    category: TableCategory,
    edition: StorageEdition,
    comparison: Comparison,
}

impl ValueTableDescriptor {
    /// Descriptor for one `catalog_{entity}_entity_{category}` table.
    pub fn for_entity(
        entity: EntityType,
        category: TableCategory,
        edition: StorageEdition,
        table_prefix: &str,
    ) -> Result<Self> {
        validate_table_prefix(table_prefix)?;
        Ok(Self {
            table_name: format!(
                "{table_prefix}catalog_{}_entity_{}",
                entity.as_str(),
                category.as_str()
            ),
            entity: Some(entity),
            category,
            edition,
            comparison: Comparison::Exact,
        })
    }

    /// Descriptor for an arbitrarily named table with the standard columns.
    pub fn named(name: &str, category: TableCategory, edition: StorageEdition) -> Result<Self> {
        if name.is_empty() || !is_identifier(name) {
            return Err(ReconcileError::InvalidTableName(name.to_string()));
        }
        Ok(Self {
            table_name: name.to_string(),
            entity: None,
            category,
            edition,
            comparison: Comparison::Exact,
        })
    }

    /// All value tables of `entity`, in processing order.
    pub fn all_for(
        entity: EntityType,
        edition: StorageEdition,
        table_prefix: &str,
    ) -> Result<Vec<Self>> {
        TableCategory::ORDERED
            .iter()
            .map(|category| Self::for_entity(entity, *category, edition, table_prefix))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.table_name
    }

    pub fn entity(&self) -> Option<EntityType> {
        self.entity
    }

    pub fn category(&self) -> TableCategory {
        self.category
    }

    pub fn edition(&self) -> StorageEdition {
        self.edition
    }

    pub fn entity_column(&self) -> &'static str {
        self.edition.entity_column()
    }

    pub fn value_kind(&self) -> ValueKind {
        self.category.value_kind()
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl fmt::Display for ValueTableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name)
    }
}

/// Table prefixes are spliced into SQL, so only `[A-Za-z0-9_]` is accepted.
pub fn validate_table_prefix(prefix: &str) -> Result<()> {
    if is_identifier(prefix) {
        Ok(())
    } else {
        Err(ReconcileError::InvalidTablePrefix(prefix.to_string()))
    }
}

fn is_identifier(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
