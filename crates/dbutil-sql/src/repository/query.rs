//! SQL statement assembly on top of `sqlx::QueryBuilder`.
//!
//! Every value goes through `push_bind`; only validated, quoted identifiers
//! and caller-written fragments are pushed as text.

use dbutil_core::filter::{quote_identifier, PLACEHOLDER};
use dbutil_core::{Filter, Order, Value};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::DbResult;

pub(crate) fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => builder.push_bind(None::<String>),
        Value::Bool(b) => builder.push_bind(*b),
        Value::Int(n) => builder.push_bind(*n),
        Value::Float(x) => builder.push_bind(*x),
        Value::Text(s) => builder.push_bind(s.clone()),
        Value::Timestamp(ts) => builder.push_bind(*ts),
        Value::Uuid(id) => builder.push_bind(id.to_string()),
    };
}

/// Pushes a fragment, replacing each `?` with the next bound value.
///
/// Callers guarantee the placeholder count matches `binds`.
pub(crate) fn push_fragment(builder: &mut QueryBuilder<'_, Sqlite>, sql: &str, binds: &[Value]) {
    let mut parts = sql.split(PLACEHOLDER);
    if let Some(head) = parts.next() {
        builder.push(head);
    }
    for (part, value) in parts.zip(binds) {
        push_value(builder, value);
        builder.push(part);
    }
}

pub(crate) fn push_where(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) -> DbResult<()> {
    for (i, predicate) in filter.predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        let (sql, binds) = predicate.to_sql()?;
        push_fragment(builder, &sql, &binds);
    }
    Ok(())
}

pub(crate) fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, order_by: &str) -> DbResult<()> {
    if let Some(order) = Order::parse(order_by)? {
        builder.push(" ORDER BY ");
        builder.push(order.to_sql()?);
    }
    Ok(())
}

pub(crate) fn push_limit_offset(builder: &mut QueryBuilder<'_, Sqlite>, limit: u64, offset: u64) {
    builder.push(" LIMIT ");
    builder.push_bind(clamp_i64(limit));
    builder.push(" OFFSET ");
    builder.push_bind(clamp_i64(offset));
}

pub(crate) fn select_from(table: &str) -> DbResult<QueryBuilder<'static, Sqlite>> {
    Ok(QueryBuilder::new(format!("SELECT * FROM {}", quote_identifier(table)?)))
}

pub(crate) fn count_from(table: &str) -> DbResult<QueryBuilder<'static, Sqlite>> {
    Ok(QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?)))
}

pub(crate) fn delete_from(table: &str) -> DbResult<QueryBuilder<'static, Sqlite>> {
    Ok(QueryBuilder::new(format!("DELETE FROM {}", quote_identifier(table)?)))
}

/// `INSERT INTO t ("a", "b") VALUES (?, ?)`, or `DEFAULT VALUES` for no columns.
pub(crate) fn insert_into(table: &str, pairs: &[(&str, Value)]) -> DbResult<QueryBuilder<'static, Sqlite>> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {}", quote_identifier(table)?));

    if pairs.is_empty() {
        builder.push(" DEFAULT VALUES");
        return Ok(builder);
    }

    let columns = pairs
        .iter()
        .map(|(column, _)| quote_identifier(column))
        .collect::<Result<Vec<_>, _>>()?;
    builder.push(format!(" ({}) VALUES (", columns.join(", ")));
    for (i, (_, value)) in pairs.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(")");

    Ok(builder)
}

/// `UPDATE t SET "a" = ?, "b" = ?` (WHERE pushed by the caller).
pub(crate) fn update_set<'a, I>(table: &str, attrs: I) -> DbResult<QueryBuilder<'static, Sqlite>>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", quote_identifier(table)?));
    for (i, (column, value)) in attrs.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format!("{} = ", quote_identifier(column)?));
        push_value(&mut builder, value);
    }
    Ok(builder)
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
