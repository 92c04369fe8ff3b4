//! Column-name case conversion for API-shaped rows.
//!
//! Databases commonly report column names in upper snake case
//! (`CURRENT_USER`); JSON consumers usually want `currentUser`.

/// How row keys are rendered by [`Row::to_json`](crate::Row::to_json).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Use column names exactly as reported.
    #[default]
    Preserve,
    /// Lower-case column names.
    Lower,
    /// `CREATED_AT` becomes `createdAt`.
    Camel,
    /// `createdAt` becomes `created_at`.
    Snake,
}

impl KeyCase {
    /// Render a column name in this case.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Preserve => name.to_string(),
            Self::Lower => name.to_lowercase(),
            Self::Camel => to_camel_case(name),
            Self::Snake => to_snake_case(name),
        }
    }
}

/// Convert a `SNAKE_CASE` or `snake_case` name to `camelCase`.
///
/// The name is lower-cased first, then every `_x` becomes `X`.
#[must_use]
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().flat_map(char::to_lowercase).peekable();

    while let Some(c) = chars.next() {
        if c == '_' && chars.peek().is_some_and(char::is_ascii_lowercase) {
            if let Some(next) = chars.next() {
                out.push(next.to_ascii_uppercase());
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Convert a `camelCase` name to `snake_case`.
///
/// Every upper-case letter becomes `_` followed by its lower-case form.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("CURRENT_USER"), "currentUser");
        assert_eq!(to_camel_case("db_name"), "dbName");
        assert_eq!(to_camel_case("ID"), "id");
        assert_eq!(to_camel_case("total_2"), "total_2");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("name"), "name");
    }

    #[test]
    fn test_key_case_apply() {
        assert_eq!(KeyCase::Preserve.apply("DB_NAME"), "DB_NAME");
        assert_eq!(KeyCase::Lower.apply("DB_NAME"), "db_name");
        assert_eq!(KeyCase::Camel.apply("DB_NAME"), "dbName");
    }
}
