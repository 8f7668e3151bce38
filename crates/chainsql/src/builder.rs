//! Statement builder.
//!
//! Composes clause fragments into one statement per kind, in a fixed order:
//!
//! - SELECT: `DISTINCT` → fields → table → join → `WHERE` → `GROUP BY` → `HAVING` → `ORDER BY` → `LIMIT`
//! - COUNT: count expression → table → join → `WHERE`
//! - DELETE: table → `WHERE` → `ORDER BY` → `LIMIT`
//! - UPDATE: table → `SET` data → `WHERE` → `ORDER BY` → `LIMIT`
//! - INSERT: table → data
//!
//! The builder only reads the [`OptionStore`]; clearing it is the caller's job.
//!
//! # Example
//!
//! ```
//! use chainsql::{builder, OptionStore};
//! use serde_json::json;
//!
//! let mut opts = OptionStore::new();
//! opts.data(json!({"user_name": "zhangsan"}));
//! assert_eq!(
//!     builder::insert("user", &opts).unwrap(),
//!     r#"INSERT INTO `user` (`user_name`) VALUES ("zhangsan")"#
//! );
//! ```

use crate::clause;
use crate::error::ChainResult;
use crate::ident::quote_ident;
use crate::options::OptionStore;
use crate::sql::StatementKind;

/// Default column counted by [`count`] when the caller does not name one.
pub const DEFAULT_COUNT_KEY: &str = "id";

/// Build a statement of the given kind.
///
/// `count_key` is only used for [`StatementKind::Count`]. Raw kinds have no
/// builder and return the empty string.
pub fn build(
    kind: StatementKind,
    table: &str,
    count_key: &str,
    opts: &OptionStore,
) -> ChainResult<String> {
    match kind {
        StatementKind::Insert => insert(table, opts),
        StatementKind::Update => update(table, opts),
        StatementKind::Delete => delete(table, opts),
        StatementKind::Select => select(table, opts),
        StatementKind::Count => count(table, count_key, opts),
        StatementKind::RawRead | StatementKind::RawWrite => Ok(String::new()),
    }
}

/// `INSERT INTO <table> (<cols>) VALUES (...)[,(...)]`
pub fn insert(table: &str, opts: &OptionStore) -> ChainResult<String> {
    let data = clause::data_for_insert(opts)?;
    Ok(assemble(["INSERT INTO".to_string(), quote_table(table), data]))
}

/// `UPDATE <table> SET ... [WHERE] [ORDER BY] [LIMIT n]`
pub fn update(table: &str, opts: &OptionStore) -> ChainResult<String> {
    let data = clause::data_for_update(opts)?;
    let limit = clause::limit_for_mutation(opts)?;
    let mut parts = vec!["UPDATE".to_string(), quote_table(table), "SET".to_string(), data];
    parts.extend(clause::where_clause(opts));
    parts.extend(clause::order(opts));
    parts.extend(limit);
    Ok(assemble(parts))
}

/// `DELETE FROM <table> [WHERE] [ORDER BY] [LIMIT n]`
pub fn delete(table: &str, opts: &OptionStore) -> ChainResult<String> {
    let limit = clause::limit_for_mutation(opts)?;
    let mut parts = vec!["DELETE FROM".to_string(), quote_table(table)];
    parts.extend(clause::where_clause(opts));
    parts.extend(clause::order(opts));
    parts.extend(limit);
    Ok(assemble(parts))
}

/// `SELECT [DISTINCT] <fields> FROM <table> [join] [WHERE] [GROUP BY] [HAVING] [ORDER BY] [LIMIT]`
pub fn select(table: &str, opts: &OptionStore) -> ChainResult<String> {
    let mut parts = vec!["SELECT".to_string()];
    parts.extend(clause::distinct(opts).map(str::to_string));
    parts.push(clause::fields(opts));
    parts.push("FROM".to_string());
    parts.push(quote_table(table));
    parts.extend(clause::join(opts));
    parts.extend(clause::where_clause(opts));
    parts.extend(clause::group(opts));
    parts.extend(clause::having(opts));
    parts.extend(clause::order(opts));
    parts.extend(clause::limit(opts));
    Ok(assemble(parts))
}

/// `SELECT COUNT([DISTINCT ]<key>) FROM <table> [join] [WHERE]`
///
/// Grouping, ordering and limits do not apply to a row count.
pub fn count(table: &str, key: &str, opts: &OptionStore) -> ChainResult<String> {
    let distinct = clause::distinct(opts)
        .map(|d| format!("{d} "))
        .unwrap_or_default();
    let mut parts = vec![
        format!("SELECT COUNT({distinct}{})", quote_ident(key)),
        "FROM".to_string(),
        quote_table(table),
    ];
    parts.extend(clause::join(opts));
    parts.extend(clause::where_clause(opts));
    Ok(assemble(parts))
}

/// Quote a table name. Tokens with whitespace (`user u`) are passed through.
pub fn quote_table(table: &str) -> String {
    let table = table.trim();
    if table.contains(char::is_whitespace) {
        table.to_string()
    } else {
        quote_ident(table)
    }
}

fn assemble(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
