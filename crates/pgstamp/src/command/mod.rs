//! Audited mutating commands.
//!
//! [`AuditedCommand`] builds one statement at a time. Insert, batch insert, upsert and
//! update stamp the target table's audit columns (see [`AuditConfig`]) before handing the
//! columns to the [`QueryBuilder`](crate::QueryBuilder); the remaining builders are thin
//! wrappers around it.
//!
//! ```ignore
//! let affected = db
//!     .command()
//!     .update("entries", columns! { "title" => "New" }, Condition::eq("id", 4), &[])
//!     .await?
//!     .execute()
//!     .await?;
//! ```

mod audit;

pub use audit::{AuditConfig, new_uid, now};

use crate::builder::UpdateColumns;
use crate::columns::Columns;
use crate::condition::IntoCondition;
use crate::db::Db;
use crate::error::{DbError, DbResult};
use crate::schema::{SchemaProvider, TableSchema};
use crate::statement::Statement;
use crate::transport::{Fetched, Transport};
use crate::value::Value;

/// A mutating statement that maintains audit columns.
///
/// Builders replace the command's statement and return the command, so a command can be
/// built and executed in one chain. Auditing is on by default; [`skip_audit`] turns it
/// off for the rest of the command's builders.
///
/// [`skip_audit`]: AuditedCommand::skip_audit
pub struct AuditedCommand<'a, C, S> {
    db: &'a Db<C, S>,
    statement: Option<Statement>,
    include_audit: bool,
}

impl<'a, C: Transport, S: SchemaProvider> AuditedCommand<'a, C, S> {
    pub fn new(db: &'a Db<C, S>) -> Self {
        Self {
            db,
            statement: None,
            include_audit: true,
        }
    }

    /// Stop stamping audit columns in later builder calls.
    pub fn skip_audit(mut self) -> Self {
        self.include_audit = false;
        self
    }

    pub fn with_audit(mut self, include_audit: bool) -> Self {
        self.include_audit = include_audit;
        self
    }

    fn auditing(&self) -> bool {
        self.include_audit && !self.db.audit_config().is_disabled()
    }

    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        let name = self.db.builder().schema_name(table);
        let schema = self.db.schema().table_schema(&name).await?;
        if schema.is_none() {
            tracing::debug!(target: "pgstamp", table = %name, "no schema for table; audit columns skipped");
        }
        Ok(schema)
    }

    fn set(mut self, statement: Statement) -> Self {
        self.statement = Some(statement);
        self
    }

    /// Insert one row, stamping blank audit columns.
    pub async fn insert(self, table: &str, mut columns: Columns) -> DbResult<Self> {
        if self.auditing() {
            if let Some(schema) = self.table_schema(table).await? {
                self.db
                    .audit_config()
                    .stamp_insert(&schema, &mut columns, now());
            }
        }
        let statement = self.db.builder().insert(table, &columns)?;
        Ok(self.set(statement))
    }

    /// Insert many rows.
    ///
    /// With no rows this does nothing: no schema lookup and no statement, so
    /// [`execute`](Self::execute) returns 0.
    pub async fn batch_insert(
        self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> DbResult<Self> {
        if rows.is_empty() {
            return Ok(self);
        }
        let mut columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let mut rows = rows;
        if self.auditing() {
            if let Some(schema) = self.table_schema(table).await? {
                self.db
                    .audit_config()
                    .stamp_batch(&schema, &mut columns, &mut rows, now());
            }
        }
        let statement = self.db.builder().batch_insert(table, &columns, &rows)?;
        Ok(self.set(statement))
    }

    /// Insert a row, or update the existing one on a primary/unique key conflict.
    ///
    /// The schema is always looked up, since the conflict key comes from it.
    pub async fn upsert(
        self,
        table: &str,
        mut insert: Columns,
        mut update: UpdateColumns,
        params: &[Value],
    ) -> DbResult<Self> {
        let schema = self.table_schema(table).await?;
        if self.auditing() {
            if let Some(schema) = &schema {
                self.db
                    .audit_config()
                    .stamp_upsert(schema, &mut insert, &mut update, now());
            }
        }
        let statement =
            self.db
                .builder()
                .upsert(table, schema.as_ref(), &insert, &update, params)?;
        Ok(self.set(statement))
    }

    /// Update matching rows, stamping the update timestamp unless supplied.
    pub async fn update(
        self,
        table: &str,
        mut columns: Columns,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        if self.auditing() {
            if let Some(schema) = self.table_schema(table).await? {
                self.db
                    .audit_config()
                    .stamp_update(&schema, &mut columns, now());
            }
        }
        let condition = condition.into_condition();
        let statement = self
            .db
            .builder()
            .update(table, &columns, condition.as_ref(), params)?;
        Ok(self.set(statement))
    }

    pub fn delete(
        self,
        table: &str,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        let condition = condition.into_condition();
        let statement = self
            .db
            .builder()
            .delete(table, condition.as_ref(), params)?;
        Ok(self.set(statement))
    }

    /// Delete rows repeating the values of `columns`, keeping one row per group (the
    /// one with the highest `pk`).
    pub fn delete_duplicates(self, table: &str, columns: &[&str], pk: &str) -> DbResult<Self> {
        let statement = self.db.builder().delete_duplicates(table, columns, pk)?;
        Ok(self.set(statement))
    }

    /// Replace `find` with `replace` in `column` of matching rows.
    pub fn replace(
        self,
        table: &str,
        column: &str,
        find: &str,
        replace: &str,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        let condition = condition.into_condition();
        let statement = self.db.builder().replace(
            table,
            column,
            find,
            replace,
            condition.as_ref(),
            params,
        )?;
        Ok(self.set(statement))
    }

    pub fn drop_table_if_exists(self, table: &str) -> DbResult<Self> {
        let statement = self.db.builder().drop_table_if_exists(table)?;
        Ok(self.set(statement))
    }

    pub fn rename_sequence(self, old_name: &str, new_name: &str) -> DbResult<Self> {
        let statement = self.db.builder().rename_sequence(old_name, new_name)?;
        Ok(self.set(statement))
    }

    /// Set the deletion timestamp of matching rows. The update timestamp is not touched.
    pub async fn soft_delete(
        self,
        table: &str,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        let mut columns = Columns::new();
        columns.set(self.db.audit_config().date_deleted.clone(), now());
        self.without_audit(table, columns, condition, params).await
    }

    /// Clear the deletion timestamp of matching rows.
    pub async fn restore(
        self,
        table: &str,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        let mut columns = Columns::new();
        columns.set(self.db.audit_config().date_deleted.clone(), Value::Null);
        self.without_audit(table, columns, condition, params).await
    }

    /// An update with auditing off for this one statement.
    async fn without_audit(
        self,
        table: &str,
        columns: Columns,
        condition: impl IntoCondition,
        params: &[Value],
    ) -> DbResult<Self> {
        let previous = self.include_audit;
        let cmd = self
            .with_audit(false)
            .update(table, columns, condition, params)
            .await?;
        Ok(cmd.with_audit(previous))
    }

    /// Replace the statement with hand-written SQL.
    pub fn set_sql(self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.set(Statement::new(sql, params))
    }

    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    pub fn sql(&self) -> Option<&str> {
        self.statement.as_ref().map(Statement::sql)
    }

    pub fn params(&self) -> &[Value] {
        self.statement.as_ref().map(Statement::params).unwrap_or_default()
    }

    /// The statement with parameters inlined, for logging and debugging.
    pub fn raw_sql(&self) -> Option<String> {
        self.statement.as_ref().map(Statement::raw_sql)
    }

    /// Run the statement and return the number of affected rows.
    ///
    /// A command without a statement (an empty batch insert) returns 0 without touching
    /// the transport. An aborted statement is [`DbError::Aborted`].
    pub async fn execute(&self) -> DbResult<u64> {
        let Some(statement) = &self.statement else {
            return Ok(0);
        };
        match self.db.client().execute(statement).await? {
            Fetched::Done(n) => Ok(n),
            Fetched::Aborted(reason) => {
                tracing::debug!(target: "pgstamp", sql = statement.sql(), %reason, "command aborted");
                Err(DbError::Aborted(reason))
            }
        }
    }
}
