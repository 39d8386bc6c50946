//! Options → BSON translation.
//!
//! ```text
//! FieldMap { "owner": "ann", "id": "64b7…" }
//!     → { "_id": ObjectId("64b7…"), "owner": "ann" }
//!
//! order_by "balance DESC, id"
//!     → { "balance": -1, "_id": 1 }
//! ```
//!
//! `id` is an alias for `_id` in both directions. Keys are validated as
//! plain or dotted identifiers, so operator keys (`$where`, `$gt`) can't be
//! smuggled in through a field map.

use dbutil_core::filter::validate_identifier;
use dbutil_core::{Direction, FieldMap, ListOptions, Order, Value};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, DateTime, Document};

use crate::error::DocResult;

/// Primary key field of every collection.
pub const ID_FIELD: &str = "_id";

/// Converts a filter value to BSON.
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(n) => Bson::Int64(*n),
        Value::Float(x) => Bson::Double(*x),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Timestamp(ts) => Bson::DateTime(DateTime::from_millis(ts.timestamp_millis())),
        Value::Uuid(id) => Bson::String(id.to_string()),
    }
}

/// Maps the `id` alias to `_id`; other names pass through after validation.
pub fn field_name(key: &str) -> DocResult<String> {
    let key = key.trim();
    if key == "id" {
        return Ok(ID_FIELD.to_string());
    }
    validate_identifier(key)?;
    Ok(key.to_string())
}

/// Equality filter document from a field map.
///
/// Hex strings under `_id` become ObjectIds; anything else under `_id` is
/// matched as-is.
pub fn filter_document(fields: &FieldMap) -> DocResult<Document> {
    let mut filter = Document::new();
    for (key, value) in fields {
        let name = field_name(key)?;
        let bson = match value {
            Value::Text(s) if name == ID_FIELD => match ObjectId::parse_str(s) {
                Ok(oid) => Bson::ObjectId(oid),
                Err(_) => Bson::String(s.clone()),
            },
            other => to_bson(other),
        };
        filter.insert(name, bson);
    }
    Ok(filter)
}

/// Sort document from an order expression; `None` when the expression is blank.
pub fn sort_document(order_by: &str) -> DocResult<Option<Document>> {
    let Some(order) = Order::parse(order_by)? else {
        return Ok(None);
    };

    let mut sort = Document::new();
    for term in order.terms {
        let direction = match term.direction {
            Direction::Asc => 1,
            Direction::Desc => -1,
        };
        sort.insert(field_name(&term.field)?, Bson::Int32(direction));
    }
    Ok(Some(sort))
}

/// Filter, sort and window of one paged `find`.
#[derive(Debug, Clone, PartialEq)]
pub struct FindPlan {
    pub filter: Document,
    pub sort: Option<Document>,
    pub skip: u64,
    pub limit: i64,
}

impl FindPlan {
    /// Translates list options. Compound `fields` have no document form and
    /// are left out; only `field_map` filters.
    pub fn from_options(options: &ListOptions) -> DocResult<Self> {
        Ok(FindPlan {
            filter: filter_document(&options.field_map)?,
            sort: sort_document(&options.order_by)?,
            skip: options.offset(),
            limit: i64::try_from(options.limit).unwrap_or(i64::MAX),
        })
    }
}
