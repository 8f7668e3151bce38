//! Statement kinds and leading-keyword classification.

use std::fmt;

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// from a SQL string to find the first meaningful keyword.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Case-insensitive keyword test that requires a word boundary after the keyword.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(..keyword.len()) {
        Some(head) if head.eq_ignore_ascii_case(keyword) => s[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_')),
        _ => false,
    }
}

/// Leading keywords of statements that return rows.
const READ_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA", "VALUES",
];

/// The shape of statement being built or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Select,
    Count,
    /// Caller-supplied text that returns rows.
    RawRead,
    /// Caller-supplied text that changes data or schema.
    RawWrite,
}

impl StatementKind {
    /// Classify caller-supplied SQL by its leading keyword.
    ///
    /// Read statements go through the query path, everything else through
    /// the mutate path. INSERT/UPDATE/DELETE are reported as such so the
    /// mutate result is classified the same way as for built statements.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "INSERT") || starts_with_keyword(trimmed, "REPLACE") {
            StatementKind::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            StatementKind::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            StatementKind::Delete
        } else if READ_KEYWORDS
            .iter()
            .any(|kw| starts_with_keyword(trimmed, kw))
        {
            StatementKind::RawRead
        } else {
            StatementKind::RawWrite
        }
    }

    /// Whether this kind goes through the query (row-returning) path.
    pub fn returns_rows(self) -> bool {
        matches!(
            self,
            StatementKind::Select | StatementKind::Count | StatementKind::RawRead
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Select => "SELECT",
            StatementKind::Count => "COUNT",
            StatementKind::RawRead => "RAW_READ",
            StatementKind::RawWrite => "RAW_WRITE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
