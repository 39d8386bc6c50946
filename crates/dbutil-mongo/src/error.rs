//! # Document Store Error Types
//!
//! ```text
//! OptionsError (dbutil-core)    ──► DocError::Options   (before any I/O)
//! malformed ObjectId string     ──► DocError::InvalidId
//! mongodb::error::Error         ──► DocError::Mongo     (verbatim)
//! ```
//!
//! "No matching document" is not an error: reads return `None` / `[]` / 0.

use dbutil_core::OptionsError;
use mongodb::bson::oid;
use thiserror::Error;

/// Document store operation errors.
#[derive(Debug, Error)]
pub enum DocError {
    /// Client could not be built or the server didn't answer the ping.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Configuration value could not be parsed.
    #[error("Invalid configuration value for {0}")]
    Config(String),

    /// The id string is not a 24-character hex ObjectId.
    #[error("Invalid document id '{id}'")]
    InvalidId {
        id: String,
        #[source]
        source: oid::Error,
    },

    /// A replace was issued with an empty selector.
    #[error("Refusing to replace in {collection} without a selector")]
    MissingSelector { collection: String },

    /// Options could not be translated into a filter or sort document.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// Any other driver error, propagated unchanged.
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Result type for document store operations.
pub type DocResult<T> = Result<T, DocError>;

/// Parses a hex ObjectId, keeping the offending input in the error.
pub fn parse_object_id(id: &str) -> DocResult<oid::ObjectId> {
    oid::ObjectId::parse_str(id).map_err(|source| DocError::InvalidId {
        id: id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        let id = parse_object_id("64b7f0c2a1b2c3d4e5f60718").unwrap();
        assert_eq!(id.to_hex(), "64b7f0c2a1b2c3d4e5f60718");
    }

    #[test]
    fn test_malformed_id_is_invalid_id() {
        for bad in ["", "not-an-id", "64b7f0c2a1b2c3d4e5f6071"] {
            let err = parse_object_id(bad).unwrap_err();
            assert!(matches!(&err, DocError::InvalidId { id, .. } if id == bad));
        }
    }
}
