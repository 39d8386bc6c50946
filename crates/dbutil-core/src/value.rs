//! # Filter Values
//!
//! Scalar values that can be bound into a query, independent of backend.
//!
//! ```text
//! Rust value ──► Value ──► sqlx bind        (dbutil-sql)
//!                     └──► bson::Bson       (dbutil-mongo)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OptionsError;

/// A scalar/comparable value used in filters, updates and inserts.
///
/// Serialized untagged, so `{"age": 30, "name": "bob"}` maps naturally.
/// Strings always deserialize as [`Value::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

/// Ordered field-to-value mapping used for equality filters and updates.
///
/// Ordered by key so the generated SQL is deterministic.
pub type FieldMap = BTreeMap<String, Value>;

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values an auto-increment key treats as "unset".
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(n) => *n == 0,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the string slice for [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = OptionsError;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .ok_or_else(|| OptionsError::UnsupportedValue(n.to_string())),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            other => Err(OptionsError::UnsupportedValue(other.to_string())),
        }
    }
}
