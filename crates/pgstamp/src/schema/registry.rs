use super::{SchemaProvider, TableSchema};
use crate::error::DbResult;
use crate::ident::Ident;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-memory registry of table schemas.
///
/// Useful for tests and for setups where the schema is known up front.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table schema, replacing any previous one with the same name.
    pub fn register_table(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.register_table(table);
        self
    }

    /// Find a table by name.
    ///
    /// A table registered under the qualified name (`archive.entries`) wins. Otherwise
    /// the qualifier is dropped and the bare name is tried.
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name).or_else(|| {
            let ident = Ident::parse(name).ok()?;
            self.tables.get(ident.name())
        })
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaProvider for SchemaRegistry {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        Ok(self.get_table(table).cloned())
    }
}

/// Memoizing wrapper around another [`SchemaProvider`].
///
/// Lookups, misses included, are cached until [`CachedSchema::refresh`] or
/// [`CachedSchema::clear`]. Call one of them after migrations that change a table.
#[derive(Debug, Default)]
pub struct CachedSchema<S> {
    inner: S,
    cache: Mutex<HashMap<String, Option<TableSchema>>>,
}

impl<S: SchemaProvider> CachedSchema<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn cached(&self, table: &str) -> Option<Option<TableSchema>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(table).cloned()
    }

    fn store(&self, table: &str, schema: Option<TableSchema>) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(table.to_string(), schema);
    }

    /// Drop the cached entry for `table` and load it again.
    pub async fn refresh(&self, table: &str) -> DbResult<Option<TableSchema>> {
        self.invalidate(table);
        self.table_schema(table).await
    }

    /// Forget one table.
    pub fn invalidate(&self, table: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.remove(table);
    }

    /// Forget everything.
    pub fn clear(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
    }
}

impl<S: SchemaProvider> SchemaProvider for CachedSchema<S> {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        if let Some(hit) = self.cached(table) {
            return Ok(hit);
        }
        let schema = self.inner.table_schema(table).await?;
        self.store(table, schema.clone());
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingSchema;

    #[tokio::test]
    async fn registry_lookup_ignores_schema_qualifier() {
        let registry = SchemaRegistry::new().with_table(TableSchema::new("entries"));
        assert!(registry.table_schema("entries").await.unwrap().is_some());
        assert!(registry.table_schema("public.entries").await.unwrap().is_some());
        assert!(registry.table_schema("users").await.unwrap().is_none());
    }

    #[test]
    fn qualified_registration_wins_over_bare() {
        let registry = SchemaRegistry::new()
            .with_table(TableSchema::new("entries").with_columns(&["id", "dateUpdated"]))
            .with_table(TableSchema::new("archive.entries").with_columns(&["id"]));

        let archived = registry.get_table("archive.entries").unwrap();
        assert!(!archived.has_column("dateUpdated"));
        assert!(registry.get_table("entries").unwrap().has_column("dateUpdated"));
        assert!(registry.get_table("public.entries").unwrap().has_column("dateUpdated"));
    }

    #[tokio::test]
    async fn cache_keys_on_qualified_name() {
        let registry = SchemaRegistry::new()
            .with_table(TableSchema::new("entries").with_columns(&["dateUpdated"]))
            .with_table(TableSchema::new("archive.entries"));
        let cached = CachedSchema::new(CountingSchema::new(registry));

        let live = cached.table_schema("entries").await.unwrap().unwrap();
        let archived = cached.table_schema("archive.entries").await.unwrap().unwrap();
        assert!(live.has_column("dateUpdated"));
        assert!(!archived.has_column("dateUpdated"));
        assert_eq!(cached.inner().lookups(), 2);
    }

    #[tokio::test]
    async fn cache_memoizes_until_refresh() {
        let registry = SchemaRegistry::new().with_table(TableSchema::new("entries"));
        let cached = CachedSchema::new(CountingSchema::new(registry));

        cached.table_schema("entries").await.unwrap();
        cached.table_schema("entries").await.unwrap();
        cached.table_schema("missing").await.unwrap();
        cached.table_schema("missing").await.unwrap();
        assert_eq!(cached.inner().lookups(), 2);

        cached.refresh("entries").await.unwrap();
        assert_eq!(cached.inner().lookups(), 3);

        cached.clear();
        cached.table_schema("missing").await.unwrap();
        assert_eq!(cached.inner().lookups(), 4);
    }
}
