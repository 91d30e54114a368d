//! Test doubles shared by unit tests.

use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::schema::{SchemaProvider, TableSchema};
use crate::statement::Statement;
use crate::transport::{Fetched, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    statements: Vec<Statement>,
    results: VecDeque<Vec<Row>>,
    abort: Option<String>,
    fail: Option<String>,
    affected: u64,
}

/// A transport that records statements and replays scripted results.
///
/// Each `fetch` pops the next scripted row set (empty when none is left). While the
/// abort switch is on, every statement is reported as aborted without being recorded
/// as executed.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state().results.push_back(rows);
    }

    pub fn set_affected(&self, n: u64) {
        self.state().affected = n;
    }

    pub fn abort_with(&self, reason: &str) {
        self.state().abort = Some(reason.to_string());
    }

    pub fn resume(&self) {
        self.state().abort = None;
    }

    /// Fail the next statement with [`DbError::Other`].
    pub fn fail_next(&self, message: &str) {
        self.state().fail = Some(message.to_string());
    }

    /// Statements seen so far, aborted ones included.
    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.state().statements.last().map(|s| s.sql().to_string())
    }

    fn check(&self, stmt: &Statement) -> DbResult<Option<String>> {
        let mut state = self.state();
        state.statements.push(stmt.clone());
        if let Some(message) = state.fail.take() {
            return Err(DbError::Other(message));
        }
        Ok(state.abort.clone())
    }
}

impl Transport for MockTransport {
    async fn fetch(&self, stmt: &Statement) -> DbResult<Fetched<Vec<Row>>> {
        if let Some(reason) = self.check(stmt)? {
            return Ok(Fetched::Aborted(reason));
        }
        Ok(Fetched::Done(
            self.state().results.pop_front().unwrap_or_default(),
        ))
    }

    async fn execute(&self, stmt: &Statement) -> DbResult<Fetched<u64>> {
        if let Some(reason) = self.check(stmt)? {
            return Ok(Fetched::Aborted(reason));
        }
        Ok(Fetched::Done(self.state().affected))
    }
}

/// Wraps a provider and counts lookups.
#[derive(Debug, Default)]
pub struct CountingSchema<S> {
    inner: S,
    lookups: AtomicUsize,
}

impl<S> CountingSchema<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<S: SchemaProvider> SchemaProvider for CountingSchema<S> {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.table_schema(table).await
    }
}
