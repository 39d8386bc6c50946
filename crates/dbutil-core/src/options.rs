//! # Query Options
//!
//! Declarative descriptions of what a repository call should match,
//! how it should be ordered and which page to return.
//!
//! ## Pagination Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ListOptions::new(page, limit)                                         │
//! │                                                                         │
//! │    page  = 0 → 1        limit = 0 → 10        (no upper bound)         │
//! │                                                                         │
//! │    offset = (page - 1) * limit                                         │
//! │                                                                         │
//! │    page=1 limit=10 → rows  0..10                                       │
//! │    page=3 limit=10 → rows 20..30                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers are responsible for clamping `limit`; a huge limit is a full scan.
//! Options types do no locking. Repositories serialize access to them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::value::{FieldMap, Value};

/// Page used when a caller passes zero.
pub const DEFAULT_PAGE: u64 = 1;

/// Limit used when a caller passes zero.
pub const DEFAULT_LIMIT: u64 = 10;

/// Field used by [`ListOptions::asc`] / [`ListOptions::desc`] when none is given.
pub const DEFAULT_ORDER_FIELD: &str = "id";

// =============================================================================
// SearchOptions
// =============================================================================

/// Equality filters applied by `first`, `find`, `count` and `delete`.
///
/// Keys are backend column/field names. They are not checked against a
/// schema, only validated as identifiers when translated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub fields: FieldMap,
}

impl SearchOptions {
    /// Creates search options from an existing field map.
    pub fn new(fields: FieldMap) -> Self {
        SearchOptions { fields }
    }

    /// Adds or replaces one equality filter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`SearchOptions::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// ListOptions
// =============================================================================

/// Pagination request with filters and ordering.
///
/// ## Example
/// ```rust
/// use dbutil_core::ListOptions;
///
/// let opts = ListOptions::new(2, 20)
///     .filter("status", "active")
///     .with_fields(vec!["age > ?".into(), 18.into()])
///     .desc(Some("created_at"));
///
/// assert_eq!(opts.offset(), 20);
/// assert_eq!(opts.order_by, "created_at DESC");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOptions {
    /// Equality filters, one predicate per entry.
    pub field_map: FieldMap,

    /// Flat `key, value, key, value, ...` sequence combined into one
    /// AND predicate. A trailing unmatched key is dropped.
    pub fields: Vec<Value>,

    /// Raw order expression, e.g. `"id ASC"`. Empty means unordered.
    pub order_by: String,

    /// Page size. Always positive after construction.
    pub limit: u64,

    /// 1-based page number. Always positive after construction.
    pub page: u64,
}

impl ListOptions {
    /// Creates list options, substituting defaults for zero values.
    pub fn new(page: u64, limit: u64) -> Self {
        ListOptions {
            field_map: FieldMap::new(),
            fields: Vec::new(),
            order_by: String::new(),
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
            page: if page == 0 { DEFAULT_PAGE } else { page },
        }
    }

    /// Orders ascending by `field`, or by `id` when absent/empty.
    pub fn asc(mut self, field: Option<&str>) -> Self {
        self.order_by = format!("{} ASC", order_field(field));
        self
    }

    /// Orders descending by `field`, or by `id` when absent/empty.
    pub fn desc(mut self, field: Option<&str>) -> Self {
        self.order_by = format!("{} DESC", order_field(field));
        self
    }

    /// Attaches the flat key/value sequence. Length is not validated here.
    pub fn with_fields(mut self, fields: Vec<Value>) -> Self {
        self.fields = fields;
        self
    }

    /// Replaces the equality filter map.
    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Adds one equality filter.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field_map.insert(key.into(), value.into());
        self
    }

    /// Rows to skip for paginated reads: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

fn order_field(field: Option<&str>) -> &str {
    match field {
        Some(f) if !f.is_empty() => f,
        _ => DEFAULT_ORDER_FIELD,
    }
}

/// Wire form of [`ListOptions`]; every field optional.
#[derive(Deserialize)]
struct RawListOptions {
    #[serde(default)]
    field_map: FieldMap,
    #[serde(default)]
    fields: Vec<Value>,
    #[serde(default)]
    order_by: String,
    #[serde(default)]
    limit: u64,
    #[serde(default)]
    page: u64,
}

impl<'de> Deserialize<'de> for ListOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawListOptions::deserialize(deserializer)?;
        let mut opts = ListOptions::new(raw.page, raw.limit);
        opts.field_map = raw.field_map;
        opts.fields = raw.fields;
        opts.order_by = raw.order_by;
        Ok(opts)
    }
}

// =============================================================================
// Page
// =============================================================================

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, options: &ListOptions) -> Self {
        Page {
            items,
            total,
            page: options.page,
            limit: options.limit,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
