//! Convenient imports for typical `pgstamp` usage.
//!
//! ```ignore
//! use pgstamp::prelude::*;
//! ```

pub use crate::columns;
pub use crate::{
    AuditConfig, CachedSchema, Columns, Condition, Db, DbError, DbResult, Events, Expression,
    FromRow, Query, QueryBuilder, Row, SchemaProvider, Transport, UpdateColumns, Value,
};
