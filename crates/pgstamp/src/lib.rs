//! # pgstamp
//!
//! An audited command and resilient query layer for Postgres.
//!
//! ## Features
//!
//! - **Audit columns**: inserts, batch inserts, upserts and updates stamp `dateCreated`,
//!   `dateUpdated` and `uid` when the table has them and the caller left them blank
//! - **Upserts**: `INSERT ... ON CONFLICT` keyed by the table's primary or unique keys
//! - **Soft delete / restore**, duplicate removal, find-and-replace and small DDL helpers
//! - **Resilient queries**: falsy conditions are dropped, and an aborted statement
//!   degrades each terminal (`all`, `one`, `scalar`, `column`, `exists`, `pairs`, `nth`)
//!   to an empty result instead of an error
//! - **Extension points**: init and define-behaviors listeners on every query
//! - **Query monitoring**: timing, logging, timeouts and hooks that can rewrite or abort
//!   statements
//!
//! ## Commands
//!
//! ```ignore
//! use pgstamp::prelude::*;
//!
//! let db = Db::new(&client, CachedSchema::new(&client));
//!
//! db.command()
//!     .insert("entries", columns! { "title" => "Hello", "sectionId" => 2 })
//!     .await?
//!     .execute()
//!     .await?;
//!
//! db.command()
//!     .soft_delete("entries", Condition::eq("id", 7), &[])
//!     .await?
//!     .execute()
//!     .await?;
//! ```
//!
//! ## Queries
//!
//! ```ignore
//! let mut query = db
//!     .query()
//!     .select("id, title")
//!     .from("entries")
//!     .where_(Condition::is_null("dateDeleted"));
//!
//! let latest = query.one(&db).await?;
//! let titles = query.pairs(&db).await?;
//! ```

pub mod builder;
pub mod columns;
pub mod command;
pub mod condition;
pub mod db;
pub mod error;
pub mod events;
pub mod ident;
pub mod monitor;
pub mod query;
pub mod row;
pub mod schema;
pub mod statement;
pub mod transport;
pub mod value;

pub mod prelude;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{QueryBuilder, QuerySpec, SelectColumn, UpdateColumns};
pub use columns::{ColumnValue, Columns, Expression};
pub use command::{AuditConfig, AuditedCommand};
pub use condition::{Condition, IntoCondition};
pub use db::Db;
pub use error::{DbError, DbResult};
pub use events::{Behavior, DefineBehaviors, Events};
pub use ident::{Ident, IntoIdent};
pub use monitor::{
    AbortHook, CompositeHook, CompositeMonitor, HookAction, InstrumentedTransport,
    LoggingMonitor, MonitorConfig, NoopMonitor, QueryContext, QueryHook, QueryMonitor,
    QueryResult, QueryStats, QueryType, StatsMonitor, TracingSqlHook,
};
pub use query::{IntoSelect, Pairs, Query};
pub use row::{FromRow, FromValue, Row};
pub use schema::{
    CachedSchema, ColumnSchema, SchemaProvider, SchemaRegistry, TableSchema, load_table_schema,
};
pub use statement::Statement;
pub use transport::{Fetched, Transport};
pub use value::Value;
