//! # dbutil-core: Query Options Model
//!
//! Backend-independent description of *what* a repository call should
//! return. Both backend crates translate these types into driver calls.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        dbutil Data Flow                                 │
//! │                                                                         │
//! │  Caller builds ListOptions / SearchOptions                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ dbutil-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  options  │  │  filter   │  │   order   │  │  entity   │  │   │
//! │  │   │ ListOpts  │  │ Predicate │  │  Order    │  │  Entity   │  │   │
//! │  │   │ Page<T>   │  │ Filter    │  │ Direction │  │  Column   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DRIVERS • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  dbutil-sql (sqlx)               dbutil-mongo (mongodb)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`options`] - `SearchOptions`, `ListOptions`, `Page<T>`
//! - [`filter`] - Predicate translation and identifier/expression validation
//! - [`order`] - Order expression parsing
//! - [`entity`] - The `Entity` capability trait
//! - [`naming`] - Table naming strategy
//! - [`value`] - Scalar filter values
//! - [`error`] - `OptionsError`

// =============================================================================
// Module Declarations
// =============================================================================

pub mod entity;
pub mod error;
pub mod filter;
pub mod naming;
pub mod options;
pub mod order;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use entity::{Column, ColumnType, Entity};
pub use error::{OptionsError, OptionsResult};
pub use filter::{Filter, Predicate};
pub use naming::NamingStrategy;
pub use options::{ListOptions, Page, SearchOptions};
pub use order::{Direction, Order, OrderTerm};
pub use value::{FieldMap, Value};
