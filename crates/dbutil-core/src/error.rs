//! # Error Types
//!
//! Errors raised while translating options into backend queries.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dbutil-core errors (this file)                                        │
//! │  └── OptionsError  - Malformed filters, ordering or expressions        │
//! │                                                                         │
//! │  dbutil-sql errors (separate crate)                                    │
//! │  └── DbError       - SQL backend failures (wraps OptionsError)         │
//! │                                                                         │
//! │  dbutil-mongo errors (separate crate)                                  │
//! │  └── DocError      - Document-store failures (wraps OptionsError)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Options errors are always raised *before* anything reaches a backend.

use thiserror::Error;

/// Errors produced by the query options model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// A column, table or field name is not a plain identifier.
    ///
    /// ## When This Occurs
    /// - Filter key like `name; DROP TABLE x`
    /// - Update attribute with spaces or quotes
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A raw predicate fragment contains statement separators or comments.
    #[error("Unsafe predicate fragment: '{0}'")]
    UnsafeFragment(String),

    /// Placeholder count in a predicate does not match the bound values.
    #[error("Predicate '{clause}' expects {expected} value(s), got {found}")]
    PlaceholderMismatch {
        clause: String,
        expected: usize,
        found: usize,
    },

    /// Order expression could not be parsed.
    ///
    /// ## When This Occurs
    /// - Direction other than ASC/DESC
    /// - Field name that is not an identifier
    #[error("Invalid order expression: '{0}'")]
    InvalidOrder(String),

    /// Column update expression rejected.
    #[error("Invalid expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    /// JSON value that has no scalar counterpart (arrays, objects).
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),
}

impl OptionsError {
    /// Creates an InvalidExpression error.
    pub fn expression(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        OptionsError::InvalidExpression {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for options translation.
pub type OptionsResult<T> = Result<T, OptionsError>;
