//! Option store: the clause fragments accumulated by chain calls.
//!
//! Each setter records one clause and hands back the store for further calls.
//! A terminal statement call reads the store once and clears it, whether the
//! statement succeeded or not.
//!
//! Clause values that accept more than one shape (text or structured) are
//! tagged variants; the clause parsers in [`crate::clause`] match on them.

use serde_json::Value;
use std::fmt;

/// A token list given either as comma separated text or as separate items.
///
/// Used for the field list and `GROUP BY`.
#[derive(Debug, Clone, PartialEq)]
pub enum Tokens {
    Text(String),
    List(Vec<String>),
}

impl Tokens {
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Tokens::Text(s) => s.trim().is_empty(),
            Tokens::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for Tokens {
    fn from(value: &str) -> Self {
        Tokens::Text(value.to_string())
    }
}

impl From<String> for Tokens {
    fn from(value: String) -> Self {
        Tokens::Text(value)
    }
}

impl From<Vec<String>> for Tokens {
    fn from(value: Vec<String>) -> Self {
        Tokens::List(value)
    }
}

impl From<Vec<&str>> for Tokens {
    fn from(value: Vec<&str>) -> Self {
        Tokens::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Tokens {
    fn from(value: &[&str]) -> Self {
        Tokens::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Tokens {
    fn from(value: [&str; N]) -> Self {
        Tokens::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// A `WHERE`/`HAVING` condition.
///
/// Text is emitted verbatim. A structured value renders as equality tests
/// joined by `AND` when it is a JSON object; any other structured shape
/// renders nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Text(String),
    Structured(Value),
}

impl Filter {
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Filter::Text(s) => s.trim().is_empty(),
            Filter::Structured(v) => json_is_empty(v),
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::Text(value.to_string())
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Filter::Text(value)
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Filter::Text(s),
            other => Filter::Structured(other),
        }
    }
}

/// A `LIMIT` value.
///
/// SELECT accepts either form (`10`, `"20,10"`); UPDATE and DELETE only accept
/// [`Limit::Rows`].
#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Rows(i64),
    Text(String),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Rows(n) => write!(f, "{n}"),
            Limit::Text(s) => f.write_str(s),
        }
    }
}

// Unsigned counts past `i64::MAX` saturate instead of wrapping negative.
macro_rules! limit_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Limit {
                fn from(value: $t) -> Self {
                    Limit::Rows(i64::try_from(value).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

limit_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for Limit {
    fn from(value: &str) -> Self {
        Limit::Text(value.trim().to_string())
    }
}

impl From<String> for Limit {
    fn from(value: String) -> Self {
        Limit::Text(value.trim().to_string())
    }
}

/// Row data for INSERT/UPDATE, stored as given and validated at build time.
///
/// - single row: `primary` is an object of column → value
/// - multi row: `primary` is the column list, `rows` the list of value lists
#[derive(Debug, Clone, PartialEq)]
pub struct DataPayload {
    pub primary: Value,
    pub rows: Option<Value>,
}

impl DataPayload {
    pub fn single(primary: Value) -> Self {
        Self {
            primary,
            rows: None,
        }
    }

    pub fn multi(columns: Value, rows: Value) -> Self {
        Self {
            primary: columns,
            rows: Some(rows),
        }
    }

    /// Whether a second component was supplied (and is not empty).
    pub fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|r| !json_is_empty(r))
    }
}

/// Names of the clauses an [`OptionStore`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClauseKey {
    Distinct,
    Field,
    Join,
    Where,
    Group,
    Having,
    Order,
    Limit,
    Data,
}

impl ClauseKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ClauseKey::Distinct => "distinct",
            ClauseKey::Field => "field",
            ClauseKey::Join => "join",
            ClauseKey::Where => "where",
            ClauseKey::Group => "group",
            ClauseKey::Having => "having",
            ClauseKey::Order => "order",
            ClauseKey::Limit => "limit",
            ClauseKey::Data => "data",
        }
    }
}

/// Clause values recorded by chain calls.
///
/// Not synchronized: one caller owns a store's in-flight chain at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionStore {
    pub(crate) distinct: bool,
    pub(crate) field: Option<Tokens>,
    pub(crate) join: Option<String>,
    pub(crate) filter: Option<Filter>,
    pub(crate) group: Option<Tokens>,
    pub(crate) having: Option<Filter>,
    pub(crate) order: Option<String>,
    pub(crate) limit: Option<Limit>,
    pub(crate) data: Option<DataPayload>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select distinct rows.
    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    /// Output fields: `"id,user_name"` or `["id", "user_name"]`.
    pub fn field(&mut self, field: impl Into<Tokens>) -> &mut Self {
        self.field = Some(field.into());
        self
    }

    /// Full join syntax, emitted verbatim (`LEFT JOIN roles r ON u.role_id = r.id`).
    pub fn join(&mut self, join: impl Into<String>) -> &mut Self {
        self.join = Some(join.into().trim().to_string());
        self
    }

    /// `WHERE` condition: raw text or a JSON object of column → value equalities.
    pub fn where_(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.filter = Some(filter.into());
        self
    }

    /// `GROUP BY`: text or a column list.
    pub fn group(&mut self, group: impl Into<Tokens>) -> &mut Self {
        self.group = Some(group.into());
        self
    }

    /// `HAVING` condition, same shapes as [`OptionStore::where_`].
    pub fn having(&mut self, having: impl Into<Filter>) -> &mut Self {
        self.having = Some(having.into());
        self
    }

    /// `ORDER BY` text, emitted verbatim.
    pub fn order(&mut self, order: impl Into<String>) -> &mut Self {
        self.order = Some(order.into().trim().to_string());
        self
    }

    /// `LIMIT` value. Text is trimmed.
    pub fn limit(&mut self, limit: impl Into<Limit>) -> &mut Self {
        self.limit = Some(limit.into());
        self
    }

    /// Single-row payload (INSERT/UPDATE): a JSON object of column → value.
    pub fn data(&mut self, data: impl Into<Value>) -> &mut Self {
        self.data = Some(DataPayload::single(data.into()));
        self
    }

    /// Multi-row payload (INSERT): a column list and a list of value lists.
    pub fn data_rows(&mut self, columns: impl Into<Value>, rows: impl Into<Value>) -> &mut Self {
        self.data = Some(DataPayload::multi(columns.into(), rows.into()));
        self
    }

    /// Keys currently set, in clause order.
    pub fn keys(&self) -> Vec<ClauseKey> {
        let mut keys = Vec::new();
        if self.distinct {
            keys.push(ClauseKey::Distinct);
        }
        let present = [
            (ClauseKey::Field, self.field.is_some()),
            (ClauseKey::Join, self.join.is_some()),
            (ClauseKey::Where, self.filter.is_some()),
            (ClauseKey::Group, self.group.is_some()),
            (ClauseKey::Having, self.having.is_some()),
            (ClauseKey::Order, self.order.is_some()),
            (ClauseKey::Limit, self.limit.is_some()),
            (ClauseKey::Data, self.data.is_some()),
        ];
        keys.extend(present.into_iter().filter(|(_, set)| *set).map(|(k, _)| k));
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Drop every recorded clause.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Take the recorded clauses, leaving the store empty.
    pub fn take(&mut self) -> OptionStore {
        std::mem::take(self)
    }
}

pub(crate) fn json_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_store_is_empty() {
        assert!(OptionStore::new().is_empty());
    }

    #[test]
    fn setters_chain_and_record_keys() {
        let mut store = OptionStore::new();
        store
            .distinct()
            .field("user_name")
            .where_(json!({"id": 1}))
            .order("id desc ")
            .limit(" 10 ");

        assert_eq!(
            store.keys(),
            vec![
                ClauseKey::Distinct,
                ClauseKey::Field,
                ClauseKey::Where,
                ClauseKey::Order,
                ClauseKey::Limit
            ]
        );
        assert_eq!(store.order.as_deref(), Some("id desc"));
        assert_eq!(store.limit, Some(Limit::Text("10".to_string())));
    }

    #[test]
    fn take_clears() {
        let mut store = OptionStore::new();
        store.limit(5).data(json!({"a": 1}));
        let taken = store.take();
        assert!(store.is_empty());
        assert_eq!(taken.limit, Some(Limit::Rows(5)));
    }

    #[test]
    fn oversized_unsigned_limits_saturate() {
        assert_eq!(Limit::from(u64::MAX), Limit::Rows(i64::MAX));
        assert_eq!(Limit::from(usize::MAX), Limit::Rows(i64::MAX));
        assert_eq!(Limit::from(42u64), Limit::Rows(42));
        assert_eq!(Limit::from(-3i32), Limit::Rows(-3));
    }

    #[test]
    fn json_string_becomes_text_filter() {
        assert_eq!(
            Filter::from(json!("id > 3")),
            Filter::Text("id > 3".to_string())
        );
    }

    #[test]
    fn empty_rows_count_as_absent() {
        assert!(!DataPayload::multi(json!(["id"]), json!([])).has_rows());
        assert!(DataPayload::multi(json!(["id"]), json!([[1]])).has_rows());
    }
}
