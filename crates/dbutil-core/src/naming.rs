//! # Table Naming
//!
//! Maps entity type names to table/collection names.
//!
//! ```text
//! "UserAccount"  ── singular ──►  "user_account"
//!                └─ plural ───►  "user_accounts"
//! "Category"     ── plural ───►  "categories"
//! ```

/// Naming strategy applied to [`crate::Entity::NAME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingStrategy {
    /// Use singular table names. Default: true
    pub singular_table: bool,

    /// Prefix prepended to every table name. Default: empty
    pub table_prefix: String,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy {
            singular_table: true,
            table_prefix: String::new(),
        }
    }
}

impl NamingStrategy {
    pub fn singular() -> Self {
        NamingStrategy::default()
    }

    pub fn plural() -> Self {
        NamingStrategy {
            singular_table: false,
            ..NamingStrategy::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Table name for an entity type name.
    pub fn table_name(&self, entity: &str) -> String {
        let snake = to_snake_case(entity);
        let name = if self.singular_table {
            snake
        } else {
            pluralize(&snake)
        };
        format!("{}{}", self.table_prefix, name)
    }
}

/// `UserAccount` → `user_account`, `HTTPServer` → `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

fn pluralize(word: &str) -> String {
    let ends_with_consonant_y = word.ends_with('y')
        && word
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| !"aeiou".contains(c));

    if ends_with_consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}
