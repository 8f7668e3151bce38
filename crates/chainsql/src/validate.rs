//! Data payload shape checks.
//!
//! A payload is validated when a statement is built, not when it is recorded.
//! Single-row INSERT and UPDATE need an object (column → value). Multi-row
//! INSERT needs a plain column list and a plain list of plain value lists;
//! every row is checked and the first bad one aborts the build.

use crate::error::{ChainError, ChainResult};
use crate::options::{DataPayload, json_is_empty};
use serde_json::{Map, Value};

pub(crate) const FIRST: &str = "the first";
pub(crate) const SECOND: &str = "the second";
pub(crate) const ROW: &str = "the element of the second";

/// Fail unless `value` is an array or an object.
pub fn ensure_array(value: &Value, location: &'static str) -> ChainResult<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Ok(()),
        _ => Err(ChainError::must_be_array(location)),
    }
}

/// Fail unless `value` is an object.
pub fn ensure_assoc<'a>(value: &'a Value, location: &'static str) -> ChainResult<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ChainError::must_be_assoc(location)),
    }
}

/// Fail unless `value` is a plain (positional) array.
pub fn ensure_list<'a>(value: &'a Value, location: &'static str) -> ChainResult<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ChainError::must_be_list(location)),
    }
}

/// A validated single-row payload.
pub(crate) fn single_row(payload: Option<&DataPayload>) -> ChainResult<&Map<String, Value>> {
    let primary = primary(payload)?;
    ensure_assoc(primary, FIRST)
}

/// A validated multi-row payload: column list and rows.
pub(crate) fn multi_rows(payload: &DataPayload) -> ChainResult<(&[Value], Vec<&[Value]>)> {
    let columns = ensure_list(&payload.primary, FIRST)?;
    let rows = payload.rows.as_ref().unwrap_or(&Value::Null);
    ensure_array(rows, SECOND)?;
    let rows = ensure_list(rows, SECOND)?;
    let rows = rows
        .iter()
        .map(|row| ensure_list(row, ROW))
        .collect::<ChainResult<Vec<_>>>()?;
    Ok((columns, rows))
}

/// The primary component, required to be present and array-shaped.
pub(crate) fn primary(payload: Option<&DataPayload>) -> ChainResult<&Value> {
    let Some(payload) = payload else {
        return Err(ChainError::MissingData);
    };
    if json_is_empty(&payload.primary) {
        return Err(ChainError::MissingData);
    }
    ensure_array(&payload.primary, FIRST)?;
    Ok(&payload.primary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_payload() {
        let err = single_row(None).unwrap_err();
        assert!(matches!(err, ChainError::MissingData));
    }

    #[test]
    fn empty_primary_is_missing() {
        let payload = DataPayload::single(json!({}));
        assert!(matches!(
            single_row(Some(&payload)).unwrap_err(),
            ChainError::MissingData
        ));
    }

    #[test]
    fn scalar_primary_must_be_array() {
        let payload = DataPayload::single(json!("zhangsan"));
        assert_eq!(
            single_row(Some(&payload)).unwrap_err().to_string(),
            "Data type error, the first parameter must be an array."
        );
    }

    #[test]
    fn positional_primary_must_be_assoc() {
        let payload = DataPayload::single(json!([{"user_name": "zhangsan"}]));
        assert_eq!(
            single_row(Some(&payload)).unwrap_err().to_string(),
            "Data type error, the first parameter must be an associative array."
        );
    }

    #[test]
    fn multi_columns_must_be_list() {
        let payload = DataPayload::multi(json!({"user_name": "zhangsan"}), json!(["a", "b"]));
        assert_eq!(
            multi_rows(&payload).unwrap_err().to_string(),
            "Data type error, the first parameter must be a normal array."
        );
    }

    #[test]
    fn multi_rows_must_be_array() {
        let payload = DataPayload::multi(json!(["id", "user_name"]), json!("zhangsan"));
        assert_eq!(
            multi_rows(&payload).unwrap_err().to_string(),
            "Data type error, the second parameter must be an array."
        );
    }

    #[test]
    fn multi_rows_must_be_list() {
        let payload = DataPayload::multi(json!(["id", "user_name"]), json!({"user_name": "x"}));
        assert_eq!(
            multi_rows(&payload).unwrap_err().to_string(),
            "Data type error, the second parameter must be a normal array."
        );
    }

    #[test]
    fn every_row_is_checked() {
        let payload = DataPayload::multi(
            json!(["id", "user_name"]),
            json!([[1, "zhangsan"], {"id": 2, "user_name": "lisi"}]),
        );
        assert_eq!(
            multi_rows(&payload).unwrap_err().to_string(),
            "Data type error, the element of the second parameter must be a normal array."
        );
    }

    #[test]
    fn valid_multi_rows() {
        let payload = DataPayload::multi(json!(["id"]), json!([[1], [2]]));
        let (columns, rows) = multi_rows(&payload).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(rows.len(), 2);
    }
}
