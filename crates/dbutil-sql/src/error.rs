//! # Database Error Types
//!
//! Error types for relational repository operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  OptionsError (dbutil-core)  ──► DbError::Options    (before any I/O)  │
//! │                                                                         │
//! │  sqlx::Error::RowNotFound    ──► normalized to None / [] / 0           │
//! │                                   at every read path                    │
//! │                                                                         │
//! │  any other sqlx::Error       ──► DbError::Sqlx       (verbatim)        │
//! │                                                                         │
//! │  pool / schema setup         ──► ConnectionFailed / MigrationFailed    │
//! │                                   (fatal via must_connect/must_migrate) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backend errors are not rewrapped or retried. Callers that need to branch
//! on constraint failures use the classification helpers on [`DbError`].

use dbutil_core::OptionsError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - Malformed connection URL
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema synchronization failed.
    ///
    /// ## When This Occurs
    /// - CREATE TABLE rejected
    /// - New column can't be added (e.g. a missing primary key column)
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Configuration value could not be parsed.
    #[error("Invalid configuration value for {0}")]
    Config(String),

    /// Options could not be translated into SQL.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// A delete was issued with no filters configured.
    #[error("Refusing to delete from {table} without conditions")]
    MissingWhereConditions { table: String },

    /// Preload requested for a relation the entity doesn't know.
    #[error("Unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },

    /// Any other backend error, propagated unchanged.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Creates an UnknownRelation error.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        DbError::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }

    /// UNIQUE constraint violation reported by the backend.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::Database(e)) if e.is_unique_violation())
    }

    /// FOREIGN KEY constraint violation reported by the backend.
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::Database(e)) if e.is_foreign_key_violation())
    }

    /// All pool connections were busy for the whole acquire timeout.
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Converts "no rows" into the empty value of the read's result type.
///
/// ```text
/// Option<T> → None      Vec<T> → []      i64 → 0
/// ```
pub(crate) fn not_found_as_empty<V: Default>(result: Result<V, sqlx::Error>) -> DbResult<V> {
    match result {
        Ok(value) => Ok(value),
        Err(sqlx::Error::RowNotFound) => Ok(V::default()),
        Err(e) => Err(e.into()),
    }
}
