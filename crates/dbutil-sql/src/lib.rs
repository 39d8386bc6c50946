//! # dbutil-sql: Relational Data Access
//!
//! Generic repositories over SQLite, driven by the options model in
//! `dbutil-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        dbutil Data Flow                                 │
//! │                                                                         │
//! │  Service code (handlers, jobs, CLIs)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    dbutil-sql (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ Repository<T> │    │    Schema    │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/) │    │(migrations.rs│  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ options → SQL │    │ create table │  │   │
//! │  │   │ naming        │    │ tx variants   │    │ add columns  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and lifecycle
//! - [`migrations`] - Additive schema synchronization
//! - [`error`] - Database error types
//! - [`repository`] - The generic repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbutil_sql::{Database, DbConfig, Schema};
//!
//! let db = Database::must_connect(DbConfig::from_env()?).await;
//! db.must_migrate(&Schema::new().register::<Account>()).await;
//!
//! let page = db.repository::<Account>()
//!     .find_by_page(&ListOptions::new(1, 20).desc(None))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::Schema;
pub use pool::{Database, DbConfig};
pub use repository::{Record, Repository};
