//! # Ordering
//!
//! Parses raw order expressions (`"id ASC"`, `"created_at DESC, id"`) into
//! validated terms so they can be rendered for SQL or a document store.

use std::fmt;
use std::str::FromStr;

use crate::error::{OptionsError, OptionsResult};
use crate::filter::{quote_identifier, validate_identifier};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(OptionsError::InvalidOrder(s.to_string()))
        }
    }
}

/// One `field direction` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: String,
    pub direction: Direction,
}

/// A validated order expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub terms: Vec<OrderTerm>,
}

impl Order {
    /// Parses an order expression. Blank input yields `None`.
    pub fn parse(expr: &str) -> OptionsResult<Option<Self>> {
        if expr.trim().is_empty() {
            return Ok(None);
        }

        let terms = expr
            .split(',')
            .map(|term| {
                let mut parts = term.split_whitespace();
                let field = parts
                    .next()
                    .ok_or_else(|| OptionsError::InvalidOrder(expr.to_string()))?;
                validate_identifier(field)
                    .map_err(|_| OptionsError::InvalidOrder(expr.to_string()))?;
                let direction = match parts.next() {
                    Some(dir) => dir
                        .parse()
                        .map_err(|_| OptionsError::InvalidOrder(expr.to_string()))?,
                    None => Direction::Asc,
                };
                if parts.next().is_some() {
                    return Err(OptionsError::InvalidOrder(expr.to_string()));
                }
                Ok(OrderTerm {
                    field: field.to_string(),
                    direction,
                })
            })
            .collect::<OptionsResult<Vec<_>>>()?;

        Ok(Some(Order { terms }))
    }

    /// Renders `"a" ASC, "b" DESC`.
    pub fn to_sql(&self) -> OptionsResult<String> {
        let rendered = self
            .terms
            .iter()
            .map(|t| Ok(format!("{} {}", quote_identifier(&t.field)?, t.direction.as_sql())))
            .collect::<OptionsResult<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", t.field, t.direction.as_sql())?;
        }
        Ok(())
    }
}
