//! Terminal operations.
//!
//! Every terminal that reads rows tolerates an aborted statement:
//!
//! | Operation | On abort |
//! |---|---|
//! | [`all`](Query::all), [`column`](Query::column) | empty vec |
//! | [`one`](Query::one), [`nth`](Query::nth), [`scalar`](Query::scalar) | `None` |
//! | [`exists`](Query::exists) | `false` |
//! | [`pairs`](Query::pairs) | empty map |
//! | [`count`](Query::count) | `0` |
//!
//! Real errors are returned unchanged.

use super::guard::ScopedOverride;
use super::{Pairs, Query};
use crate::db::Db;
use crate::error::{DbError, DbResult};
use crate::ident::quote_column_name;
use crate::row::{FromRow, Row};
use crate::statement::Statement;
use crate::transport::{Fetched, Transport};
use crate::value::Value;

impl Query {
    /// Run `stmt`, mapping an abort to `None`.
    async fn fetch<C: Transport, S>(
        &self,
        db: &Db<C, S>,
        stmt: DbResult<Statement>,
        op: &'static str,
    ) -> DbResult<Option<Vec<Row>>> {
        if let Some(reason) = &self.aborted {
            tracing::debug!(target: "pgstamp", op, %reason, "query aborted before execution");
            return Ok(None);
        }
        let stmt = stmt?;
        match db.client().fetch(&stmt).await? {
            Fetched::Done(rows) => Ok(Some(rows)),
            Fetched::Aborted(reason) => {
                tracing::debug!(target: "pgstamp", op, %reason, sql = stmt.sql(), "query aborted");
                Ok(None)
            }
        }
    }

    /// All rows; empty when aborted.
    pub async fn all<C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<Vec<Row>> {
        let stmt = db.builder().select(&self.spec);
        Ok(self.fetch(db, stmt, "all").await?.unwrap_or_default())
    }

    pub async fn all_as<T: FromRow, C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<Vec<T>> {
        self.all(db).await?.iter().map(T::from_row).collect()
    }

    /// The first row, with the limit forced to 1 for the duration of the call.
    pub async fn one<C: Transport, S>(&mut self, db: &Db<C, S>) -> DbResult<Option<Row>> {
        let guard = ScopedOverride::limit(self, Some(1));
        let stmt = db.builder().select(&guard.spec);
        let rows = guard.fetch(db, stmt, "one").await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }

    pub async fn one_as<T: FromRow, C: Transport, S>(
        &mut self,
        db: &Db<C, S>,
    ) -> DbResult<Option<T>> {
        self.one(db).await?.as_ref().map(T::from_row).transpose()
    }

    /// First column of the first row, with the limit forced to 1 for the duration of the
    /// call. `None` for no rows or an abort.
    pub async fn scalar<C: Transport, S>(&mut self, db: &Db<C, S>) -> DbResult<Option<Value>> {
        let guard = ScopedOverride::limit(self, Some(1));
        let stmt = db.builder().select(&guard.spec);
        let rows = guard.fetch(db, stmt, "scalar").await?;
        Ok(first_value(rows))
    }

    /// First column of every row.
    pub async fn column<C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<Vec<Value>> {
        let stmt = db.builder().select(&self.spec);
        let rows = self.fetch(db, stmt, "column").await?.unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_values().into_iter().next())
            .collect())
    }

    pub async fn exists<C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<bool> {
        let stmt = db.builder().exists(&self.spec);
        let rows = self.fetch(db, stmt, "exists").await?;
        Ok(first_value(rows).and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// First column mapped to second column.
    ///
    /// Fails with [`DbError::InsufficientColumns`](crate::DbError::InsufficientColumns)
    /// when rows come back with fewer than two columns.
    pub async fn pairs<C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<Pairs> {
        let stmt = db.builder().select(&self.spec);
        match self.fetch(db, stmt, "pairs").await? {
            Some(rows) => Pairs::from_rows(rows),
            None => Ok(Pairs::new()),
        }
    }

    /// The row at `offset + n`, counting from zero.
    ///
    /// Fails with a validation error when `offset + n` does not fit a Postgres `bigint`.
    pub async fn nth<C: Transport, S>(&mut self, n: u64, db: &Db<C, S>) -> DbResult<Option<Row>> {
        let offset = self
            .spec
            .offset
            .unwrap_or(0)
            .checked_add(n)
            .filter(|o| i64::try_from(*o).is_ok())
            .ok_or_else(|| DbError::validation(format!("nth({n}) offset out of range")))?;
        let mut guard = ScopedOverride::offset(self, Some(offset));
        guard.one(db).await
    }

    /// Fully interpolated SQL of the statement [`all`](Query::all) would run.
    pub fn raw_sql<C, S>(&self, db: &Db<C, S>) -> DbResult<String> {
        Ok(db.builder().select(&self.spec)?.raw_sql())
    }

    // ==================== aggregates ====================

    async fn aggregate<C: Transport, S>(
        &self,
        db: &Db<C, S>,
        expr: &str,
        op: &'static str,
    ) -> DbResult<Option<Value>> {
        let stmt = db.builder().scalar(&self.spec, expr);
        let rows = self.fetch(db, stmt, op).await?;
        Ok(first_value(rows).filter(|v| !v.is_null()))
    }

    /// `COUNT(*)` over the matching rows; 0 when aborted.
    pub async fn count<C: Transport, S>(&self, db: &Db<C, S>) -> DbResult<i64> {
        let value = self.aggregate(db, "COUNT(*)", "count").await?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    pub async fn sum<C: Transport, S>(&self, column: &str, db: &Db<C, S>) -> DbResult<Option<Value>> {
        let expr = format!("SUM({})", quote_column_name(column));
        self.aggregate(db, &expr, "sum").await
    }

    pub async fn min<C: Transport, S>(&self, column: &str, db: &Db<C, S>) -> DbResult<Option<Value>> {
        let expr = format!("MIN({})", quote_column_name(column));
        self.aggregate(db, &expr, "min").await
    }

    pub async fn max<C: Transport, S>(&self, column: &str, db: &Db<C, S>) -> DbResult<Option<Value>> {
        let expr = format!("MAX({})", quote_column_name(column));
        self.aggregate(db, &expr, "max").await
    }

    pub async fn average<C: Transport, S>(
        &self,
        column: &str,
        db: &Db<C, S>,
    ) -> DbResult<Option<f64>> {
        let expr = format!("AVG({})", quote_column_name(column));
        let value = self.aggregate(db, &expr, "average").await?;
        Ok(value.and_then(|v| v.as_f64()))
    }
}

fn first_value(rows: Option<Vec<Row>>) -> Option<Value> {
    rows?.into_iter().next()?.into_values().into_iter().next()
}
