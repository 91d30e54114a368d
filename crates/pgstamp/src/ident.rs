//! Safe SQL identifier handling.
//!
//! This module provides [`Ident`] which represents a SQL identifier (schema/table/column),
//! supporting dotted notation and quoted identifiers.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`
//!
//! Every part is rendered quoted, since audit columns such as `dateCreated` are
//! case-sensitive in Postgres.
//!
//! # Example
//! ```ignore
//! use pgstamp::Ident;
//!
//! let t = Ident::parse("public.entries")?;
//! assert_eq!(t.to_sql(), r#""public"."entries""#);
//! # Ok::<(), pgstamp::DbError>(())
//! ```

use crate::error::{DbError, DbResult};

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> DbResult<Self> {
        if s.is_empty() {
            return Err(DbError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(DbError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(DbError::validation("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(DbError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            // "" escapes a quote
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(DbError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(DbError::validation("Empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(DbError::validation(format!(
                        "Invalid character in identifier '{s}': '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(DbError::validation("Empty identifier segment"));
            }
            parts.push(name);
        }

        Ok(Self { parts })
    }

    /// The last part of the identifier (`entries` for `public.entries`).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// The schema qualifier, if any.
    pub fn schema(&self) -> Option<&str> {
        if self.parts.len() > 1 {
            self.parts.get(self.parts.len() - 2).map(String::as_str)
        } else {
            None
        }
    }

    /// Dotted form with quotes only where a part needs them (`archive.entries`,
    /// `public."My Table"`). Schema lookups key on this.
    pub fn to_name(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            if is_plain(part) {
                out.push_str(part);
            } else {
                push_quoted(&mut out, part);
            }
        }
        out
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            push_quoted(out, part);
        }
    }
}

fn is_plain(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn push_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Quote a bare name as a single identifier part.
pub fn quote_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    push_quoted(&mut out, name);
    out
}

/// Quote a column reference appearing in a condition or select list.
///
/// Dotted references are quoted part by part and `*` is left alone. Anything that does
/// not parse as an identifier (function calls, casts, arithmetic) is treated as a SQL
/// expression and passed through untouched.
pub fn quote_column_name(column: &str) -> String {
    let column = column.trim();
    if column == "*" {
        return column.to_string();
    }
    if let Some(prefix) = column.strip_suffix(".*") {
        if let Ok(ident) = Ident::parse(prefix) {
            return format!("{}.*", ident.to_sql());
        }
        return column.to_string();
    }
    match Ident::parse(column) {
        Ok(ident) => ident.to_sql(),
        Err(_) => column.to_string(),
    }
}

/// Quote a table reference, keeping an optional alias (`entries e`, `entries AS e`).
///
/// Subqueries and other expressions in parentheses are left alone.
pub fn quote_table_name(table: &str) -> String {
    let table = table.trim();
    if table.starts_with('(') {
        return table.to_string();
    }
    let (name, alias) = split_alias(table);
    let quoted = match Ident::parse(name) {
        Ok(ident) => ident.to_sql(),
        Err(_) => name.to_string(),
    };
    match alias {
        Some(alias) => format!("{quoted} {}", quote_name(alias)),
        None => quoted,
    }
}

/// Split `name alias` / `name AS alias` into its parts.
pub(crate) fn split_alias(table: &str) -> (&str, Option<&str>) {
    let mut words = table.split_whitespace();
    let (Some(name), Some(second)) = (words.next(), words.next()) else {
        return (table.trim(), None);
    };
    let alias = if second.eq_ignore_ascii_case("as") {
        words.next()
    } else {
        Some(second)
    };
    match (alias, words.next()) {
        (Some(alias), None) => (name, Some(alias)),
        _ => (table.trim(), None),
    }
}

/// Convert an input into an [`Ident`].
///
/// This is mainly for ergonomics in builder APIs.
pub trait IntoIdent {
    fn into_ident(self) -> DbResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> DbResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> DbResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> DbResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> DbResult<Ident> {
        Ident::parse(&self)
    }
}
