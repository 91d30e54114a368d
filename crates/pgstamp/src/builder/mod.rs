//! Statement builder.
//!
//! [`QueryBuilder`] turns column maps, conditions and [`QuerySpec`]s into
//! [`Statement`](crate::Statement)s for Postgres.
//!
//! ## Design
//!
//! - Identifiers are always quoted; table and column names given to mutating builders
//!   must parse as identifiers.
//! - Placeholders are managed automatically ($1, $2, ...). `?` in raw fragments bind
//!   from the fragment's own values, or from the statement-level `params`.
//! - UPDATE requires SET; a batch insert requires rows.
//! - Table names may use `{{%name}}` to pick up the configured table prefix.

mod parts;
mod select;
mod write;

#[cfg(test)]
mod tests;

pub use parts::{Join, JoinKind, NullsOrder, OrderItem, QuerySpec, SelectColumn, SortDir};
pub use write::UpdateColumns;

use crate::error::DbResult;
use crate::ident::{Ident, quote_table_name, split_alias};
use regex::Regex;
use std::sync::OnceLock;

/// Postgres statement builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    table_prefix: String,
}

fn braces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{(%?)([\w\-\.]+)\}\}").expect("invalid built-in table regex")
    })
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix substituted for `%` in `{{%name}}` table references.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Resolve `{{%name}}` / `{{name}}` references to plain table names.
    ///
    /// Text without braces is returned unchanged.
    pub fn table_name(&self, table: &str) -> String {
        if !table.contains("{{") {
            return table.trim().to_string();
        }
        braces_re()
            .replace_all(table.trim(), |caps: &regex::Captures<'_>| {
                if caps[1].is_empty() {
                    caps[2].to_string()
                } else {
                    format!("{}{}", self.table_prefix, &caps[2])
                }
            })
            .into_owned()
    }

    /// Resolve and quote a table that a statement writes to. No alias allowed.
    fn target_table(&self, table: &str) -> DbResult<String> {
        Ok(Ident::parse(&self.table_name(table))?.to_sql())
    }

    /// Resolve and quote a table reference in FROM/JOIN position, alias included.
    fn source_table(&self, table: &str) -> String {
        quote_table_name(&self.table_name(table))
    }

    /// Resolve a table reference to the name its schema is looked up under.
    ///
    /// The alias is dropped and a schema qualifier is kept, so `archive.entries`
    /// and `entries` never share a schema.
    pub fn schema_name(&self, table: &str) -> String {
        let resolved = self.table_name(table);
        let (name, _) = split_alias(&resolved);
        match Ident::parse(name) {
            Ok(ident) => ident.to_name(),
            Err(_) => name.to_string(),
        }
    }
}

fn column_ident(name: &str) -> DbResult<String> {
    Ok(Ident::parse(name)?.to_sql())
}
