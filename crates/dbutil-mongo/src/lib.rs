//! # dbutil-mongo: Document-store Data Access
//!
//! The document-store counterpart of `dbutil-sql`: the same options model,
//! translated into filter and sort documents.
//!
//! ## Differences From the SQL Backend
//! ```text
//! ┌──────────────────────────┬──────────────────────┬──────────────────────┐
//! │                          │ dbutil-sql           │ dbutil-mongo         │
//! ├──────────────────────────┼──────────────────────┼──────────────────────┤
//! │ equality filters         │ WHERE col = ?        │ { field: value }     │
//! │ compound `fields`        │ AND-ed predicate     │ ignored              │
//! │ ordering                 │ ORDER BY             │ sort document        │
//! │ primary key              │ row id (i64)         │ ObjectId (hex)       │
//! │ update                   │ patch columns        │ replace document     │
//! │ connection checkout      │ pool per statement   │ session per op       │
//! └──────────────────────────┴──────────────────────┴──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbutil_mongo::{DocRepository, DocStore, MongoConfig};
//!
//! let store = DocStore::must_connect(MongoConfig::from_env()?).await;
//! let notes = DocRepository::<Note>::new(&store, "note");
//! let page = notes.find(&ListOptions::new(1, 20)).await?;
//! ```

pub mod convert;
pub mod error;
pub mod pool;
pub mod repository;

pub use error::{DocError, DocResult};
pub use pool::{DocStore, MongoConfig};
pub use repository::DocRepository;
