//! Identifier quoting for generated SQL.
//!
//! Column and table tokens are wrapped in backticks unless they already look
//! like something the caller formatted themselves:
//!
//! - the wildcard `*`
//! - anything containing a backtick (already quoted)
//! - qualified names (`u.name`)
//! - expressions and function calls (`count(id)`)
//! - aliased tokens (`name as n`)
//!
//! Those are passed through unchanged (apart from trimming).
//!
//! # Example
//! ```
//! use chainsql::ident::quote_ident;
//!
//! assert_eq!(quote_ident("user_name"), "`user_name`");
//! assert_eq!(quote_ident("u.user_name"), "u.user_name");
//! assert_eq!(quote_ident("count(id)"), "count(id)");
//! ```

/// Identifier quote character.
pub const IDENT_QUOTE: char = '`';

/// Quote a single column/table token.
pub fn quote_ident(token: &str) -> String {
    let name = token.trim();
    if is_preformatted(name) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push(IDENT_QUOTE);
    out.push_str(name);
    out.push(IDENT_QUOTE);
    out
}

/// Quote every token and join them with commas.
pub fn quote_ident_list<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote_ident(t.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a comma separated field string into tokens.
///
/// Commas inside parentheses do not split, so `concat(a,b)` stays one token.
pub fn split_fields(fields: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in fields.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => out.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    out.push(current);
    out
}

fn is_preformatted(token: &str) -> bool {
    token == "*"
        || token.contains(IDENT_QUOTE)
        || token.contains('.')
        || token.contains('(')
        || has_alias(token)
}

fn has_alias(token: &str) -> bool {
    token
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("as"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_name() {
        assert_eq!(quote_ident("user_name"), "`user_name`");
    }

    #[test]
    fn trims_before_quoting() {
        assert_eq!(quote_ident(" user_name "), "`user_name`");
    }

    #[test]
    fn wildcard_passes_through() {
        assert_eq!(quote_ident("*"), "*");
    }

    #[test]
    fn already_quoted_passes_through() {
        assert_eq!(quote_ident("`order`"), "`order`");
    }

    #[test]
    fn qualified_name_passes_through() {
        assert_eq!(quote_ident("u.id"), "u.id");
        assert_eq!(quote_ident("u.*"), "u.*");
    }

    #[test]
    fn expression_passes_through() {
        assert_eq!(quote_ident("count(id)"), "count(id)");
    }

    #[test]
    fn alias_passes_through() {
        assert_eq!(quote_ident("user_name as name"), "user_name as name");
        assert_eq!(quote_ident("user_name AS name"), "user_name AS name");
    }

    #[test]
    fn alias_marker_must_be_a_word() {
        assert_eq!(quote_ident("alias"), "`alias`");
        assert_eq!(quote_ident("has_access"), "`has_access`");
    }

    #[test]
    fn list_joins_with_commas() {
        assert_eq!(quote_ident_list(&["id", "user_name"]), "`id`,`user_name`");
    }

    #[test]
    fn split_respects_parentheses() {
        assert_eq!(
            split_fields("id,concat(a,b),name"),
            vec!["id", "concat(a,b)", "name"]
        );
    }
}
