//! # Entity Capabilities
//!
//! Repositories are generic over entity types implementing [`Entity`].
//! The trait replaces struct-tag reflection with explicit, static metadata:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Capability     Provided by                                            │
//! │  ─────────────  ─────────────────────────────────────────────────────  │
//! │  identifiable   PRIMARY_KEY                                            │
//! │  orderable      columns()  (names usable in ORDER BY / expressions)    │
//! │  queryable      NAME / TABLE + values() (+ FromRow in dbutil-sql)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use dbutil_core::{Column, ColumnType, Entity, Value};
//!
//! struct Account { id: i64, owner: String }
//!
//! impl Entity for Account {
//!     const NAME: &'static str = "Account";
//!
//!     fn columns() -> &'static [Column] {
//!         const COLUMNS: &[Column] = &[
//!             Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
//!             Column::new("owner", ColumnType::Text),
//!         ];
//!         COLUMNS
//!     }
//!
//!     fn values(&self) -> Vec<Value> {
//!         vec![self.id.into(), self.owner.clone().into()]
//!     }
//! }
//! ```

use crate::naming::NamingStrategy;
use crate::value::Value;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Blob,
}

impl ColumnType {
    /// SQL type name used by schema synchronization.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Blob => "BLOB",
        }
    }

    /// Literal default used when a NOT NULL column is added to an existing table.
    pub fn zero_literal(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "0",
            ColumnType::Real => "0.0",
            ColumnType::Text => "''",
            ColumnType::Timestamp => "'1970-01-01T00:00:00Z'",
            ColumnType::Blob => "X''",
        }
    }
}

/// Static column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Column {
            name,
            kind,
            nullable: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// An entity type that repositories can store and query.
pub trait Entity: Send + Sync + Unpin + 'static {
    /// Type name fed to the naming strategy (`"UserAccount"`).
    const NAME: &'static str;

    /// Explicit table/collection name, bypassing the naming strategy.
    const TABLE: Option<&'static str> = None;

    /// Primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Column definitions, in the same order as [`Entity::values`].
    fn columns() -> &'static [Column];

    /// Row values, in the same order as [`Entity::columns`].
    fn values(&self) -> Vec<Value>;

    /// Resolves the table name under a naming strategy.
    fn table_name(naming: &NamingStrategy) -> String {
        match Self::TABLE {
            Some(table) => table.to_string(),
            None => naming.table_name(Self::NAME),
        }
    }

    /// Column names, for expression and order validation.
    fn column_names() -> Vec<&'static str> {
        Self::columns().iter().map(|c| c.name).collect()
    }

    /// Column/value pairs to insert: auto-increment columns holding a zero
    /// value are left for the database to fill.
    fn insert_pairs(&self) -> Vec<(&'static str, Value)> {
        Self::columns()
            .iter()
            .zip(self.values())
            .filter(|(col, value)| !(col.auto_increment && value.is_zero()))
            .map(|(col, value)| (col.name, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        id: i64,
        label: String,
    }

    impl Entity for Widget {
        const NAME: &'static str = "StockWidget";

        fn columns() -> &'static [Column] {
            const COLUMNS: &[Column] = &[
                Column::new("id", ColumnType::Integer).primary_key().auto_increment(),
                Column::new("label", ColumnType::Text),
            ];
            COLUMNS
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.into(), self.label.clone().into()]
        }
    }

    struct Legacy;

    impl Entity for Legacy {
        const NAME: &'static str = "Legacy";
        const TABLE: Option<&'static str> = Some("tbl_legacy");

        fn columns() -> &'static [Column] {
            &[]
        }

        fn values(&self) -> Vec<Value> {
            Vec::new()
        }
    }

    #[test]
    fn test_table_name() {
        assert_eq!(Widget::table_name(&NamingStrategy::singular()), "stock_widget");
        assert_eq!(Widget::table_name(&NamingStrategy::plural()), "stock_widgets");
        assert_eq!(Legacy::table_name(&NamingStrategy::plural()), "tbl_legacy");
    }

    #[test]
    fn test_insert_pairs_skip_zero_auto_increment() {
        let fresh = Widget { id: 0, label: "a".into() };
        let pairs = fresh.insert_pairs();
        assert_eq!(pairs, vec![("label", Value::from("a"))]);

        let explicit = Widget { id: 9, label: "b".into() };
        assert_eq!(explicit.insert_pairs().len(), 2);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(Widget::column_names(), vec!["id", "label"]);
    }
}
