//! Clause parsers.
//!
//! One function per clause. Each reads an [`OptionStore`] and returns the
//! clause's SQL fragment, or nothing when the clause was not set. Fragments
//! carry no surrounding whitespace; the statement builder joins them.

use crate::error::{ChainError, ChainResult};
use crate::ident::{quote_ident, quote_ident_list, split_fields};
use crate::literal::{quote_literal, quote_literal_list};
use crate::options::{Filter, Limit, OptionStore, Tokens};
use crate::validate;
use serde_json::Value;

/// `DISTINCT` when the flag is set.
pub fn distinct(opts: &OptionStore) -> Option<&'static str> {
    opts.distinct.then_some("DISTINCT")
}

/// Output field list, `*` when unset.
pub fn fields(opts: &OptionStore) -> String {
    match &opts.field {
        Some(tokens) if !tokens.is_blank() => match tokens {
            Tokens::Text(text) => quote_ident_list(&split_fields(text)),
            Tokens::List(items) => quote_ident_list(items),
        },
        _ => "*".to_string(),
    }
}

/// Join text, verbatim.
pub fn join(opts: &OptionStore) -> Option<String> {
    opts.join.clone().filter(|j| !j.is_empty())
}

/// `WHERE ...`
pub fn where_clause(opts: &OptionStore) -> Option<String> {
    condition("WHERE", opts.filter.as_ref())
}

/// `HAVING ...`
pub fn having(opts: &OptionStore) -> Option<String> {
    condition("HAVING", opts.having.as_ref())
}

/// Shared `WHERE`/`HAVING` rendering.
///
/// Text is emitted verbatim after the keyword. An object renders as
/// `` `col`="val" AND `col2`="val2" `` in the object's key order. Any other
/// structured shape renders nothing.
pub fn condition(keyword: &str, filter: Option<&Filter>) -> Option<String> {
    let filter = filter.filter(|f| !f.is_blank())?;
    match filter {
        Filter::Text(text) => Some(format!("{keyword} {text}")),
        Filter::Structured(Value::Object(map)) => {
            let tests = map
                .iter()
                .map(|(col, val)| format!("{}={}", quote_ident(col), quote_literal(val)))
                .collect::<Vec<_>>()
                .join(" AND ");
            Some(format!("{keyword} {tests}"))
        }
        Filter::Structured(_) => None,
    }
}

/// `GROUP BY ...`: text verbatim, lists joined with commas.
pub fn group(opts: &OptionStore) -> Option<String> {
    let tokens = opts.group.as_ref().filter(|g| !g.is_blank())?;
    let body = match tokens {
        Tokens::Text(text) => text.clone(),
        Tokens::List(items) => items.join(","),
    };
    Some(format!("GROUP BY {body}"))
}

/// `ORDER BY ...`
pub fn order(opts: &OptionStore) -> Option<String> {
    let order = opts.order.as_deref().filter(|o| !o.is_empty())?;
    Some(format!("ORDER BY {order}"))
}

/// `LIMIT ...` for read statements: any form.
pub fn limit(opts: &OptionStore) -> Option<String> {
    match opts.limit.as_ref()? {
        Limit::Text(text) if text.is_empty() => None,
        value => Some(format!("LIMIT {value}")),
    }
}

/// `LIMIT n` for UPDATE/DELETE.
///
/// Single-value limit syntax on these statements cannot carry an offset, so
/// only a non-negative row count is accepted.
pub fn limit_for_mutation(opts: &OptionStore) -> ChainResult<Option<String>> {
    match opts.limit.as_ref() {
        None => Ok(None),
        Some(Limit::Text(text)) if text.is_empty() => Ok(None),
        Some(Limit::Rows(n)) if *n >= 0 => Ok(Some(format!("LIMIT {n}"))),
        Some(Limit::Rows(_)) => Err(ChainError::LimitNotInteger),
        Some(Limit::Text(_)) => Err(ChainError::LimitNotInteger),
    }
}

/// `SET` body for UPDATE: `` `col`="val", `col2`="val2" ``.
pub fn data_for_update(opts: &OptionStore) -> ChainResult<String> {
    let row = validate::single_row(opts.data.as_ref())?;
    Ok(row
        .iter()
        .map(|(col, val)| format!("{}={}", quote_ident(col), quote_literal(val)))
        .collect::<Vec<_>>()
        .join(", "))
}

/// Column list and `VALUES` for INSERT.
///
/// Single row: `` (`a`,`b`) VALUES ("1","x") ``.
/// Multi row: `` (`a`,`b`) VALUES ("1","x"),("2","y") ``.
pub fn data_for_insert(opts: &OptionStore) -> ChainResult<String> {
    validate::primary(opts.data.as_ref())?;
    let Some(payload) = opts.data.as_ref().filter(|p| p.has_rows()) else {
        return data_for_insert_single(opts);
    };

    let (columns, rows) = validate::multi_rows(payload)?;
    let columns = columns.iter().map(column_name).collect::<Vec<_>>();
    let values = rows
        .iter()
        .map(|row| format!("({})", quote_literal_list(row.iter())))
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("({}) VALUES {values}", quote_ident_list(&columns)))
}

fn data_for_insert_single(opts: &OptionStore) -> ChainResult<String> {
    let row = validate::single_row(opts.data.as_ref())?;
    let columns = row.keys().map(String::as_str).collect::<Vec<_>>();
    Ok(format!(
        "({}) VALUES ({})",
        quote_ident_list(&columns),
        quote_literal_list(row.values())
    ))
}

fn column_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> OptionStore {
        OptionStore::new()
    }

    #[test]
    fn fields_default_to_wildcard() {
        assert_eq!(fields(&store()), "*");
        assert_eq!(fields(store().field("")), "*");
    }

    #[test]
    fn fields_from_text_are_split_and_quoted() {
        assert_eq!(fields(store().field("id, user_name")), "`id`,`user_name`");
    }

    #[test]
    fn fields_from_list_keep_expressions() {
        assert_eq!(
            fields(store().field(vec!["u.id", "count(*) as n", "name"])),
            "u.id,count(*) as n,`name`"
        );
    }

    #[test]
    fn where_object_renders_equalities() {
        assert_eq!(
            where_clause(store().where_(json!({"a": 1, "b": "x"}))).as_deref(),
            Some(r#"WHERE `a`="1" AND `b`="x""#)
        );
    }

    #[test]
    fn where_text_is_verbatim() {
        assert_eq!(
            where_clause(store().where_("user_name in ('a','b')")).as_deref(),
            Some("WHERE user_name in ('a','b')")
        );
    }

    #[test]
    fn where_list_renders_nothing() {
        assert_eq!(where_clause(store().where_(json!(["a", "b"]))), None);
    }

    #[test]
    fn having_shares_where_logic() {
        assert_eq!(
            having(store().having("count(id) > 1")).as_deref(),
            Some("HAVING count(id) > 1")
        );
    }

    #[test]
    fn group_text_and_list() {
        assert_eq!(
            group(store().group("user_name")).as_deref(),
            Some("GROUP BY user_name")
        );
        assert_eq!(
            group(store().group(["a", "b"])).as_deref(),
            Some("GROUP BY a,b")
        );
    }

    #[test]
    fn read_limit_accepts_text() {
        assert_eq!(limit(store().limit("20,10")).as_deref(), Some("LIMIT 20,10"));
        assert_eq!(limit(store().limit(5)).as_deref(), Some("LIMIT 5"));
    }

    #[test]
    fn mutation_limit_requires_integer() {
        assert_eq!(
            limit_for_mutation(store().limit(1)).unwrap().as_deref(),
            Some("LIMIT 1")
        );
        assert!(matches!(
            limit_for_mutation(store().limit("2,1")),
            Err(ChainError::LimitNotInteger)
        ));
        assert!(matches!(
            limit_for_mutation(store().limit("3")),
            Err(ChainError::LimitNotInteger)
        ));
    }

    #[test]
    fn mutation_limit_rejects_negative_counts() {
        assert!(matches!(
            limit_for_mutation(store().limit(-1)),
            Err(ChainError::LimitNotInteger)
        ));
        assert_eq!(
            limit_for_mutation(store().limit(0)).unwrap().as_deref(),
            Some("LIMIT 0")
        );
    }

    #[test]
    fn update_data_renders_assignments() {
        assert_eq!(
            data_for_update(store().data(json!({"a": 1, "b": "x"}))).unwrap(),
            r#"`a`="1", `b`="x""#
        );
    }

    #[test]
    fn insert_single_row() {
        assert_eq!(
            data_for_insert(store().data(json!({"user_name": "zhangsan"}))).unwrap(),
            r#"(`user_name`) VALUES ("zhangsan")"#
        );
    }

    #[test]
    fn insert_multi_row_keeps_row_order() {
        assert_eq!(
            data_for_insert(
                store().data_rows(json!(["id", "user_name"]), json!([[1, "zhangsan"], [2, "lisi"]]))
            )
            .unwrap(),
            r#"(`id`,`user_name`) VALUES ("1","zhangsan"),("2","lisi")"#
        );
    }
}
