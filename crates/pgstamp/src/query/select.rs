//! Select list normalization.

use crate::builder::SelectColumn;
use crate::columns::Expression;
use regex::Regex;
use std::sync::OnceLock;

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?)(?i:\s+as\s+|\s+)([\w\-_\.]+)$").expect("invalid built-in alias regex")
    })
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+$").expect("invalid built-in word regex"))
}

/// Input accepted by [`Query::select`](super::Query::select).
///
/// A string is split on top-level commas. List items, tuples and expressions are taken
/// as single entries.
pub trait IntoSelect {
    fn into_select(self) -> Vec<SelectColumn>;
}

impl IntoSelect for &str {
    fn into_select(self) -> Vec<SelectColumn> {
        split_top_level(self)
            .into_iter()
            .map(normalize_entry)
            .collect()
    }
}

impl IntoSelect for String {
    fn into_select(self) -> Vec<SelectColumn> {
        self.as_str().into_select()
    }
}

impl IntoSelect for Vec<&str> {
    fn into_select(self) -> Vec<SelectColumn> {
        self.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(normalize_entry)
            .collect()
    }
}

impl<const N: usize> IntoSelect for [&str; N] {
    fn into_select(self) -> Vec<SelectColumn> {
        self.to_vec().into_select()
    }
}

/// `(alias, expr)` pairs.
impl IntoSelect for Vec<(&str, &str)> {
    fn into_select(self) -> Vec<SelectColumn> {
        self.into_iter()
            .map(|(alias, expr)| SelectColumn::aliased(alias, expr))
            .collect()
    }
}

impl IntoSelect for Expression {
    fn into_select(self) -> Vec<SelectColumn> {
        vec![SelectColumn {
            alias: None,
            expr: self.sql,
            params: self.params,
        }]
    }
}

/// An aliased expression.
impl IntoSelect for (&str, Expression) {
    fn into_select(self) -> Vec<SelectColumn> {
        vec![SelectColumn {
            alias: Some(self.0.to_string()),
            expr: self.1.sql,
            params: self.1.params,
        }]
    }
}

impl IntoSelect for SelectColumn {
    fn into_select(self) -> Vec<SelectColumn> {
        vec![self]
    }
}

impl IntoSelect for Vec<SelectColumn> {
    fn into_select(self) -> Vec<SelectColumn> {
        self
    }
}

/// Key a single select entry.
///
/// `expr AS alias` and `expr alias` are keyed by the alias, unless the alias is all
/// digits or dotted. A bare word is keyed by itself. Anything else stays positional.
pub fn normalize_entry(entry: &str) -> SelectColumn {
    let entry = entry.trim();
    if let Some(caps) = alias_re().captures(entry) {
        let alias = &caps[2];
        if !alias.bytes().all(|b| b.is_ascii_digit()) && !alias.contains('.') {
            return SelectColumn::aliased(alias, caps[1].trim());
        }
    }
    if word_re().is_match(entry) {
        return SelectColumn::aliased(entry, entry);
    }
    SelectColumn::positional(entry)
}

/// Merge `additions` into `list`. A keyed entry replaces an earlier entry with the same
/// key in place.
pub(crate) fn merge_select(list: &mut Vec<SelectColumn>, additions: Vec<SelectColumn>) {
    for column in additions {
        let slot = column
            .key()
            .and_then(|key| list.iter().position(|c| c.key() == Some(key)));
        match slot {
            Some(i) => list[i] = column,
            None => list.push(column),
        }
    }
}

/// Split on commas outside parentheses and quotes. Empty parts are dropped.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(cols: &[SelectColumn]) -> Vec<(Option<&str>, &str)> {
        cols.iter().map(|c| (c.key(), c.expr.as_str())).collect()
    }

    #[test]
    fn splits_and_keys_entries() {
        let cols = "id, title AS t".into_select();
        assert_eq!(keys(&cols), vec![(Some("id"), "id"), (Some("t"), "title")]);
    }

    #[test]
    fn alias_without_as() {
        let cols = "COUNT(*) total".into_select();
        assert_eq!(keys(&cols), vec![(Some("total"), "COUNT(*)")]);
    }

    #[test]
    fn numeric_and_dotted_aliases_stay_positional() {
        let cols = "x 1, a b.c, e.title".into_select();
        assert_eq!(
            keys(&cols),
            vec![(None, "x 1"), (None, "a b.c"), (None, "e.title")]
        );
    }

    #[test]
    fn commas_inside_calls_do_not_split() {
        let cols = "COALESCE(a, b) AS v, 'x,y' lit".into_select();
        assert_eq!(
            keys(&cols),
            vec![(Some("v"), "COALESCE(a, b)"), (Some("lit"), "'x,y'")]
        );
    }

    #[test]
    fn empty_parts_dropped() {
        assert!(" , ,".into_select().is_empty());
        assert_eq!("id,,".into_select().len(), 1);
    }

    #[test]
    fn list_items_are_not_split() {
        let cols = vec!["COALESCE(a, b)", "id"].into_select();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].key(), None);
    }

    #[test]
    fn merge_replaces_same_key() {
        let mut list = "id, title".into_select();
        merge_select(&mut list, "slug, title AS title2, t2.x AS title".into_select());
        assert_eq!(
            keys(&list),
            vec![
                (Some("id"), "id"),
                (Some("title"), "t2.x"),
                (Some("slug"), "slug"),
                (Some("title2"), "title"),
            ]
        );
    }
}
