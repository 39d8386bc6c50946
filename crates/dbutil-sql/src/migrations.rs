//! # Schema Synchronization
//!
//! Additive schema sync for registered entity types.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Schema Sync Process                                │
//! │                                                                         │
//! │  Schema::new().register::<Account>().register::<Entry>()               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each entity:                                                      │
//! │       │                                                                 │
//! │       ├── table missing?  ──► CREATE TABLE with every column           │
//! │       │                                                                 │
//! │       └── table exists?   ──► PRAGMA table_info                        │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                               ALTER TABLE ADD COLUMN for each          │
//! │                               column the table lacks                   │
//! │                                                                         │
//! │  Columns are never dropped or altered.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! NOT NULL columns added to an existing table get the zero value of their
//! type as default, since SQLite refuses NOT NULL additions without one.

use dbutil_core::entity::{Column, ColumnType};
use dbutil_core::filter::quote_identifier;
use dbutil_core::{Entity, NamingStrategy};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// One registered entity type.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub entity: &'static str,
    pub table_name: fn(&NamingStrategy) -> String,
    pub columns: &'static [Column],
}

/// Registry of entity types whose tables should be synchronized.
///
/// ## Example
/// ```rust,ignore
/// let schema = Schema::new()
///     .register::<Account>()
///     .register::<Entry>();
/// db.must_migrate(&schema).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<TableDef>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Registers an entity type.
    pub fn register<T: Entity>(mut self) -> Self {
        self.tables.push(TableDef {
            entity: T::NAME,
            table_name: T::table_name,
            columns: T::columns(),
        });
        self
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Creates missing tables and adds missing columns.
pub async fn sync_schema(pool: &SqlitePool, naming: &NamingStrategy, schema: &Schema) -> DbResult<()> {
    for def in schema.tables() {
        let table = (def.table_name)(naming);
        let result = if has_table(pool, &table).await? {
            add_missing_columns(pool, &table, def.columns).await
        } else {
            create_table(pool, &table, def.columns).await
        };
        result.map_err(|e| DbError::MigrationFailed(format!("{} ({table}): {e}", def.entity)))?;
    }
    Ok(())
}

/// Returns whether a table exists.
pub async fn has_table(pool: &SqlitePool, table: &str) -> DbResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(table)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Lists the column names of an existing table.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> DbResult<Vec<String>> {
    let columns = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(columns)
}

async fn create_table(pool: &SqlitePool, table: &str, columns: &[Column]) -> DbResult<()> {
    let sql = create_table_sql(table, columns)?;
    debug!(sql = %sql, "Creating table");
    sqlx::query(&sql).execute(pool).await?;
    info!(table = %table, "Table created");
    Ok(())
}

async fn add_missing_columns(pool: &SqlitePool, table: &str, columns: &[Column]) -> DbResult<()> {
    let existing = table_columns(pool, table).await?;

    for column in columns {
        if existing.iter().any(|name| name.eq_ignore_ascii_case(column.name)) {
            continue;
        }
        if column.primary_key {
            return Err(DbError::MigrationFailed(format!(
                "primary key column '{}' can't be added to an existing table",
                column.name
            )));
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_identifier(table)?,
            added_column_sql(column)?
        );
        debug!(sql = %sql, "Adding column");
        sqlx::query(&sql).execute(pool).await?;
        info!(table = %table, column = column.name, "Column added");
    }

    Ok(())
}

/// Renders `CREATE TABLE` for a column list.
pub fn create_table_sql(table: &str, columns: &[Column]) -> DbResult<String> {
    let primary: Vec<&Column> = columns.iter().filter(|c| c.primary_key).collect();
    let inline_pk = primary.len() == 1;

    let mut parts = Vec::with_capacity(columns.len() + 1);
    for column in columns {
        let mut part = format!("{} {}", quote_identifier(column.name)?, column.kind.sql_type());
        if column.primary_key && inline_pk {
            part.push_str(" PRIMARY KEY");
            if column.auto_increment && column.kind == ColumnType::Integer {
                part.push_str(" AUTOINCREMENT");
            }
        } else if !column.nullable {
            part.push_str(" NOT NULL");
        }
        parts.push(part);
    }

    if primary.len() > 1 {
        let keys = primary
            .iter()
            .map(|c| quote_identifier(c.name))
            .collect::<Result<Vec<_>, _>>()?;
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table)?,
        parts.join(", ")
    ))
}

fn added_column_sql(column: &Column) -> DbResult<String> {
    let mut sql = format!("{} {}", quote_identifier(column.name)?, column.kind.sql_type());
    if !column.nullable {
        sql.push_str(" NOT NULL DEFAULT ");
        sql.push_str(column.kind.zero_literal());
    }
    Ok(sql)
}

// =============================================================================
// Unit Tests
// =============================================================================
