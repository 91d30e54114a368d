//! Statement transport.
//!
//! [`Transport`] unifies clients and transactions, and carries the recoverable
//! "aborted" signal alongside real errors: a transport (usually a hook on an
//! [`InstrumentedTransport`](crate::monitor::InstrumentedTransport)) may decline to run a
//! statement, and read terminals on [`Query`](crate::Query) degrade instead of failing.

use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::statement::Statement;

/// Outcome of a statement that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The statement ran.
    Done(T),
    /// The statement was not run; carries the reason.
    Aborted(String),
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Done(v) => Fetched::Done(f(v)),
            Fetched::Aborted(reason) => Fetched::Aborted(reason),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Fetched::Aborted(_))
    }

    /// Treat an abort as [`DbError::Aborted`].
    pub fn into_result(self) -> DbResult<T> {
        match self {
            Fetched::Done(v) => Ok(v),
            Fetched::Aborted(reason) => Err(DbError::Aborted(reason)),
        }
    }
}

/// A trait that unifies database clients and transactions.
pub trait Transport: Send + Sync {
    /// Run a statement and return its rows.
    fn fetch(
        &self,
        stmt: &Statement,
    ) -> impl std::future::Future<Output = DbResult<Fetched<Vec<Row>>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        stmt: &Statement,
    ) -> impl std::future::Future<Output = DbResult<Fetched<u64>>> + Send;
}

impl Transport for tokio_postgres::Client {
    async fn fetch(&self, stmt: &Statement) -> DbResult<Fetched<Vec<Row>>> {
        let rows = tokio_postgres::Client::query(self, stmt.sql(), &stmt.params_ref())
            .await
            .map_err(DbError::from_db_error)?;
        Ok(Fetched::Done(Row::from_pg_rows(&rows)?))
    }

    async fn execute(&self, stmt: &Statement) -> DbResult<Fetched<u64>> {
        tokio_postgres::Client::execute(self, stmt.sql(), &stmt.params_ref())
            .await
            .map(Fetched::Done)
            .map_err(DbError::from_db_error)
    }
}

impl Transport for tokio_postgres::Transaction<'_> {
    async fn fetch(&self, stmt: &Statement) -> DbResult<Fetched<Vec<Row>>> {
        let rows = tokio_postgres::Transaction::query(self, stmt.sql(), &stmt.params_ref())
            .await
            .map_err(DbError::from_db_error)?;
        Ok(Fetched::Done(Row::from_pg_rows(&rows)?))
    }

    async fn execute(&self, stmt: &Statement) -> DbResult<Fetched<u64>> {
        tokio_postgres::Transaction::execute(self, stmt.sql(), &stmt.params_ref())
            .await
            .map(Fetched::Done)
            .map_err(DbError::from_db_error)
    }
}

impl<C: Transport> Transport for &C {
    fn fetch(
        &self,
        stmt: &Statement,
    ) -> impl std::future::Future<Output = DbResult<Fetched<Vec<Row>>>> + Send {
        (**self).fetch(stmt)
    }

    fn execute(
        &self,
        stmt: &Statement,
    ) -> impl std::future::Future<Output = DbResult<Fetched<u64>>> + Send {
        (**self).execute(stmt)
    }
}
