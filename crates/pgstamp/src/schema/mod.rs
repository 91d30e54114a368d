//! Table schema metadata.
//!
//! Audited commands ask a [`SchemaProvider`] for the target table's columns before every
//! mutating statement: audit columns are only stamped when the table actually has them,
//! and upserts need the primary key and unique constraints for their conflict target.

mod introspect;
mod registry;

pub use introspect::load_table_schema;
pub use registry::{CachedSchema, SchemaRegistry};

use crate::error::DbResult;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    /// Type as printed by `format_type` (`integer`, `timestamp with time zone`, ...).
    pub data_type: String,
    pub is_primary_key: bool,
    pub not_null: bool,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name, without schema qualifier.
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// Primary key columns, in key order.
    pub primary_key: Vec<String>,
    /// Column sets of unique constraints and unique indexes, primary key excluded.
    pub unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    /// Add a nullable column with an unspecified type.
    pub fn with_column(self, name: impl Into<String>) -> Self {
        self.with_typed_column(name, "text", false)
    }

    pub fn with_columns(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.with_column(*name);
        }
        self
    }

    pub fn with_typed_column(
        mut self,
        name: impl Into<String>,
        data_type: impl Into<String>,
        not_null: bool,
    ) -> Self {
        let name = name.into();
        let is_primary_key = self.primary_key.contains(&name);
        self.columns.push(ColumnSchema {
            name,
            data_type: data_type.into(),
            is_primary_key,
            not_null,
        });
        self
    }

    /// Set the primary key, adding missing columns.
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        for pk in columns {
            if !self.has_column(pk) {
                self = self.with_typed_column(*pk, "integer", true);
            }
        }
        for col in &mut self.columns {
            col.is_primary_key = self.primary_key.contains(&col.name);
        }
        self
    }

    pub fn with_unique_key(mut self, columns: &[&str]) -> Self {
        self.unique_keys
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Check if this table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Primary key first, then unique keys.
    pub fn keys(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.primary_key.as_slice())
            .filter(|pk| !pk.is_empty())
            .chain(self.unique_keys.iter().map(Vec::as_slice))
    }
}

/// Source of table metadata.
///
/// `Ok(None)` means the table is unknown; callers treat that as "no audit columns".
pub trait SchemaProvider: Send + Sync {
    fn table_schema(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = DbResult<Option<TableSchema>>> + Send;
}

impl<S: SchemaProvider> SchemaProvider for &S {
    fn table_schema(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = DbResult<Option<TableSchema>>> + Send {
        (**self).table_schema(table)
    }
}

impl<S: SchemaProvider> SchemaProvider for std::sync::Arc<S> {
    fn table_schema(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = DbResult<Option<TableSchema>>> + Send {
        (**self).table_schema(table)
    }
}

impl SchemaProvider for tokio_postgres::Client {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        load_table_schema(self, table).await
    }
}

impl SchemaProvider for tokio_postgres::Transaction<'_> {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        load_table_schema(self, table).await
    }
}
