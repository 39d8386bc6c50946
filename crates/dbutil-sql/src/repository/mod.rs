//! # Repository Module
//!
//! One generic repository for every entity type.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Generic Repository                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.repository::<Account>()                                    │
//! │       │    .with_option("owner", "ann")                                │
//! │       │    .first().await?                                             │
//! │       ▼                                                                 │
//! │  Repository<Account>                                                   │
//! │  ├── first / find / count          ← SearchOptions (equality)         │
//! │  ├── find_by_page / list           ← ListOptions (paging + order)      │
//! │  ├── create / update / delete      ← writes                           │
//! │  ├── expr                          ← atomic column arithmetic         │
//! │  ├── tx_create / tx_update / ...   ← same, inside a transaction        │
//! │  └── find_by_raw                   ← raw SQL escape hatch              │
//! │       │                                                                 │
//! │       │  QueryBuilder (bound values only)                              │
//! │       ▼                                                                 │
//! │  SqlitePool (borrowed from Database)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entity types implement [`dbutil_core::Entity`] for metadata,
//! `sqlx::FromRow` for decoding, and [`Record`] (usually empty) to opt in.

mod generic;
mod query;

#[cfg(test)]
mod tests;

pub use generic::Repository;

use async_trait::async_trait;
use dbutil_core::Entity;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::error::{DbError, DbResult};

/// An entity the SQL repository can read and write.
///
/// ## Example
/// ```rust,ignore
/// #[derive(sqlx::FromRow)]
/// struct Account { id: i64, owner: String }
///
/// impl Entity for Account { /* columns, values */ }
///
/// impl Record for Account {}
/// ```
#[async_trait]
pub trait Record: Entity + for<'r> FromRow<'r, SqliteRow> {
    /// Eager-loads a named relation into `self`.
    ///
    /// Called by [`Repository::first`] when a preload relation is set.
    /// The default knows no relations.
    async fn preload(&mut self, relation: &str, pool: &SqlitePool) -> DbResult<()> {
        let _ = pool;
        Err(DbError::unknown_relation(Self::NAME, relation))
    }
}
