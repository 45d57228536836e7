use crate::DbError;
use serde::{Deserialize, Serialize};

/// Escape an identifier by doubling the quote character.
fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}

fn is_safe_identifier(part: &str) -> bool {
    !part.is_empty()
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Reference to a table (optional schema + name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse a caller-supplied table name, optionally schema-qualified.
    ///
    /// Every part must match `[A-Za-z0-9_]+`. Identifiers that would need
    /// quoting to be safe are rejected outright rather than escaped, so a
    /// raw string from outside the engine can never smuggle SQL into an
    /// interpolated query. Names discovered through `table_names()` are
    /// constructed with `new`/`with_schema` and bypass this gate.
    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let table = match raw.split_once('.') {
            Some((schema, name)) => Self::with_schema(schema, name),
            None => Self::new(raw),
        };

        let schema_ok = table.schema.as_deref().is_none_or(is_safe_identifier);
        if !schema_ok || !is_safe_identifier(&table.name) {
            return Err(DbError::InvalidTableName(raw.to_string()));
        }

        Ok(table)
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }

    /// Double-quoted form, valid for both PostgreSQL and SQLite.
    /// Embedded quote characters are doubled.
    pub fn quoted(&self) -> String {
        let name = escape_identifier(&self.name);
        match &self.schema {
            Some(s) => format!("\"{}\".\"{}\"", escape_identifier(s), name),
            None => format!("\"{}\"", name),
        }
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quoted())
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Pagination window for table browsing.
///
/// Offset-based only; keyset pagination can be added later for better
/// performance on large tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Offset { limit: u32, offset: u64 },
}

impl Default for Pagination {
    fn default() -> Self {
        Self::Offset {
            limit: 100,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self::Offset { limit, offset }
    }

    pub fn limit(&self) -> u32 {
        match self {
            Self::Offset { limit, .. } => *limit,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Self::Offset { offset, .. } => *offset,
        }
    }

    pub fn next_page(&self) -> Self {
        match self {
            Self::Offset { limit, offset } => Self::Offset {
                limit: *limit,
                offset: offset + u64::from(*limit),
            },
        }
    }

    pub fn prev_page(&self) -> Option<Self> {
        match self {
            Self::Offset { limit, offset } => {
                if *offset == 0 {
                    None
                } else {
                    Some(Self::Offset {
                        limit: *limit,
                        offset: offset.saturating_sub(u64::from(*limit)),
                    })
                }
            }
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.offset() == 0
    }

    /// Build the page query for this window.
    pub fn select_sql(&self, table: &TableRef) -> String {
        format!(
            "SELECT * FROM {} LIMIT {} OFFSET {}",
            table.quoted(),
            self.limit(),
            self.offset()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_and_qualified_names() {
        let t = TableRef::parse("users").unwrap();
        assert_eq!(t.name, "users");
        assert_eq!(t.schema, None);

        let t = TableRef::parse("public.users").unwrap();
        assert_eq!(t.schema.as_deref(), Some("public"));
        assert_eq!(t.qualified_name(), "public.users");
    }

    #[test]
    fn parse_rejects_unsafe_names() {
        for raw in [
            "users; DROP TABLE users",
            "users--",
            "\"users\"",
            "us ers",
            "",
            "public.",
            ".users",
            "a.b.c",
        ] {
            let err = TableRef::parse(raw).unwrap_err();
            assert!(
                matches!(err, DbError::InvalidTableName(_)),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn quoted_doubles_embedded_quotes() {
        let t = TableRef::new("my\"table");
        assert_eq!(t.quoted(), "\"my\"\"table\"");
    }

    #[test]
    fn count_sql_quotes_the_table() {
        let t = TableRef::with_schema("public", "users");
        assert_eq!(t.count_sql(), "SELECT COUNT(*) FROM \"public\".\"users\"");
    }

    #[test]
    fn select_sql_applies_window() {
        let t = TableRef::new("orders");
        let page = Pagination::new(100, 50);
        assert_eq!(
            page.select_sql(&t),
            "SELECT * FROM \"orders\" LIMIT 50 OFFSET 100"
        );
    }

    #[test]
    fn pagination_next_prev() {
        let p = Pagination::new(0, 100);
        assert!(p.is_first_page());
        assert!(p.prev_page().is_none());

        let p2 = p.next_page();
        assert_eq!(p2.offset(), 100);

        let back = p2.prev_page().unwrap();
        assert_eq!(back.offset(), 0);
    }
}
