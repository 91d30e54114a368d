//! The database handle queries and commands run through.

use crate::builder::QueryBuilder;
use crate::command::{AuditConfig, AuditedCommand};
use crate::events::Events;
use crate::query::Query;
use crate::schema::SchemaProvider;
use crate::transport::Transport;
use std::sync::Arc;

/// Bundles a transport, a schema provider, a statement builder, audit settings and the
/// query listener registry.
///
/// `Db` is cheap to share by reference; [`Query`] and [`AuditedCommand`] values are
/// created per statement.
///
/// ```ignore
/// let db = Db::new(&client, CachedSchema::new(&client))
///     .with_builder(QueryBuilder::new().with_table_prefix("craft_"));
///
/// db.command()
///     .insert("{{%entries}}", columns! { "title" => "Hello" })
///     .await?
///     .execute()
///     .await?;
/// ```
#[derive(Debug)]
pub struct Db<C, S = C> {
    client: C,
    schema: S,
    builder: QueryBuilder,
    audit: AuditConfig,
    events: Arc<Events>,
}

impl<C, S> Db<C, S> {
    pub fn new(client: C, schema: S) -> Self {
        Self {
            client,
            schema,
            builder: QueryBuilder::new(),
            audit: AuditConfig::default(),
            events: Arc::new(Events::new()),
        }
    }

    pub fn with_audit_config(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_events(mut self, events: Events) -> Self {
        self.events = Arc::new(events);
        self
    }

    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn audit_config(&self) -> &AuditConfig {
        &self.audit
    }

    pub fn events(&self) -> &Arc<Events> {
        &self.events
    }

    /// A new query with init listeners applied.
    pub fn query(&self) -> Query {
        Query::with_events(Arc::clone(&self.events))
    }

    pub fn into_parts(self) -> (C, S) {
        (self.client, self.schema)
    }
}

impl<C: Transport, S: SchemaProvider> Db<C, S> {
    /// A new, empty audited command.
    pub fn command(&self) -> AuditedCommand<'_, C, S> {
        AuditedCommand::new(self)
    }
}
