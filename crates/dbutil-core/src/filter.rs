//! # Filter Translation
//!
//! Turns [`SearchOptions`] / [`ListOptions`] into backend-neutral predicates.
//!
//! ## Key Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  field key                 value        predicate                      │
//! │  ───────────────────────   ──────────   ───────────────────────────    │
//! │  "owner"                   "ann"        "owner" = ?        ['ann']     │
//! │  "deleted_at"              NULL         "deleted_at" IS NULL           │
//! │  "balance > ?"             100          balance > ?        [100]       │
//! │                                                                         │
//! │  fields: ["age > ?", 18, "owner", "ann"]                               │
//! │          └────────► (age > ? AND "owner" = ?)   [18, 'ann']            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys containing `?` are trusted fragments written by the caller, never
//! end-user input. They are still rejected when they contain `;`, `--` or
//! `/*`.

use crate::error::{OptionsError, OptionsResult};
use crate::options::{ListOptions, SearchOptions};
use crate::value::{FieldMap, Value};

/// Placeholder used in fragments and expression templates.
pub const PLACEHOLDER: char = '?';

/// Functions allowed inside column update expressions.
pub const EXPRESSION_FUNCTIONS: &[&str] = &["COALESCE", "IFNULL", "ABS", "MAX", "MIN", "ROUND"];

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a plain or dotted identifier (`name`, `account.name`).
pub fn validate_identifier(ident: &str) -> OptionsResult<()> {
    let valid = !ident.is_empty()
        && ident.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(OptionsError::InvalidIdentifier(ident.to_string()))
    }
}

/// Quotes a validated identifier for SQL: `a.b` → `"a"."b"`.
pub fn quote_identifier(ident: &str) -> OptionsResult<String> {
    validate_identifier(ident)?;
    Ok(ident
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}

fn validate_fragment(fragment: &str) -> OptionsResult<()> {
    if fragment.contains(';') || fragment.contains("--") || fragment.contains("/*") {
        return Err(OptionsError::UnsafeFragment(fragment.to_string()));
    }
    Ok(())
}

fn placeholder_count(fragment: &str) -> usize {
    fragment.chars().filter(|c| *c == PLACEHOLDER).count()
}

// =============================================================================
// Predicate
// =============================================================================

/// One condition of a WHERE clause / filter document.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`, or `column IS NULL` for [`Value::Null`].
    Eq { column: String, value: Value },

    /// Caller-written fragment with `?` placeholders bound positionally.
    Expr { sql: String, binds: Vec<Value> },
}

impl Predicate {
    /// Translates one field-map entry.
    pub fn from_entry(key: &str, value: &Value) -> OptionsResult<Self> {
        let key = key.trim();
        if key.contains(PLACEHOLDER) {
            Predicate::expr(key, vec![value.clone()])
        } else {
            validate_identifier(key)?;
            Ok(Predicate::Eq {
                column: key.to_string(),
                value: value.clone(),
            })
        }
    }

    /// Builds a fragment predicate, checking placeholders against binds.
    ///
    /// Placeholders are counted textually: a `?` inside a string literal
    /// (`name = '?'`) counts too and yields `PlaceholderMismatch`. Bind such
    /// literals as values instead.
    pub fn expr(sql: &str, binds: Vec<Value>) -> OptionsResult<Self> {
        validate_fragment(sql)?;
        let expected = placeholder_count(sql);
        if expected != binds.len() {
            return Err(OptionsError::PlaceholderMismatch {
                clause: sql.to_string(),
                expected,
                found: binds.len(),
            });
        }
        Ok(Predicate::Expr {
            sql: sql.to_string(),
            binds,
        })
    }

    /// Renders SQL with `?` placeholders; returns the values to bind in order.
    pub fn to_sql(&self) -> OptionsResult<(String, Vec<Value>)> {
        match self {
            Predicate::Eq { column, value } if value.is_null() => {
                Ok((format!("{} IS NULL", quote_identifier(column)?), Vec::new()))
            }
            Predicate::Eq { column, value } => {
                Ok((format!("{} = ?", quote_identifier(column)?), vec![value.clone()]))
            }
            Predicate::Expr { sql, binds } => Ok((format!("({sql})"), binds.clone())),
        }
    }
}

/// Equality predicates, one per field-map entry.
pub fn equality(fields: &FieldMap) -> OptionsResult<Vec<Predicate>> {
    fields
        .iter()
        .map(|(key, value)| Predicate::from_entry(key, value))
        .collect()
}

/// Combines the flat `key, value, ...` sequence into one AND predicate.
///
/// Pairs are taken two at a time; a trailing unmatched key is dropped, and so
/// is any pair whose key is not text. Bare identifiers expand to `col = ?`,
/// or `col IS NULL` when the value is [`Value::Null`].
/// Returns `None` when no pair survives.
pub fn compound(fields: &[Value]) -> OptionsResult<Option<Predicate>> {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    for pair in fields.chunks_exact(2) {
        let Some(key) = pair[0].as_str() else {
            continue;
        };
        let key = key.trim();
        if key.contains(PLACEHOLDER) {
            clauses.push(key.to_string());
        } else if pair[1].is_null() {
            clauses.push(format!("{} IS NULL", quote_identifier(key)?));
            continue;
        } else {
            clauses.push(format!("{} = ?", quote_identifier(key)?));
        }
        binds.push(pair[1].clone());
    }

    if clauses.is_empty() {
        return Ok(None);
    }

    Predicate::expr(&clauses.join(" AND "), binds).map(Some)
}

// =============================================================================
// Filter
// =============================================================================

/// The full set of predicates for one repository call, AND-ed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    /// Equality filter from search options.
    pub fn from_search(options: &SearchOptions) -> OptionsResult<Self> {
        Ok(Filter {
            predicates: equality(&options.fields)?,
        })
    }

    /// Equality filters from `field_map` plus the compound `fields` predicate.
    pub fn from_list(options: &ListOptions) -> OptionsResult<Self> {
        let mut predicates = equality(&options.field_map)?;
        if let Some(combined) = compound(&options.fields)? {
            predicates.push(combined);
        }
        Ok(Filter { predicates })
    }

    /// Equality filters from `field_map` only.
    pub fn from_field_map(options: &ListOptions) -> OptionsResult<Self> {
        Ok(Filter {
            predicates: equality(&options.field_map)?,
        })
    }

    /// A filter with exactly one condition.
    pub fn single(key: &str, value: &Value) -> OptionsResult<Self> {
        Ok(Filter {
            predicates: vec![Predicate::from_entry(key, value)?],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

// =============================================================================
// Expression Templates
// =============================================================================

/// Validates a column update template such as `stock + ?`.
///
/// Allowed: identifiers listed in `columns`, functions in
/// [`EXPRESSION_FUNCTIONS`], integer literals, `+ - * / %`, parentheses,
/// commas, whitespace and exactly one `?`.
pub fn validate_expression(template: &str, columns: &[&str]) -> OptionsResult<()> {
    if template.trim().is_empty() {
        return Err(OptionsError::expression(template, "empty template"));
    }
    if template.contains("--") || template.contains("/*") {
        return Err(OptionsError::expression(template, "comments are not allowed"));
    }
    if placeholder_count(template) != 1 {
        return Err(OptionsError::expression(template, "exactly one '?' placeholder required"));
    }

    let mut chars = template.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = i + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &template[start..end];
            let known = columns.contains(&word)
                || EXPRESSION_FUNCTIONS
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(word));
            if !known {
                return Err(OptionsError::expression(
                    template,
                    format!("unknown identifier '{word}'"),
                ));
            }
        } else if !(c.is_ascii_digit() || c.is_ascii_whitespace() || "+-*/%(),?".contains(c)) {
            return Err(OptionsError::expression(
                template,
                format!("character '{c}' is not allowed"),
            ));
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
