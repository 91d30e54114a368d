#![allow(dead_code)]

use pgstamp::{
    DbError, DbResult, Fetched, Row, SchemaProvider, SchemaRegistry, Statement, TableSchema,
    Transport,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct State {
    statements: Vec<Statement>,
    results: VecDeque<Vec<Row>>,
    abort: Option<String>,
    fail: Option<String>,
}

/// Records statements and replays scripted row sets.
#[derive(Default)]
pub struct Recorder {
    state: Mutex<State>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state().results.push_back(rows);
    }

    pub fn abort_with(&self, reason: &str) {
        self.state().abort = Some(reason.to_string());
    }

    pub fn fail_next(&self, message: &str) {
        self.state().fail = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    pub fn last(&self) -> Statement {
        self.state()
            .statements
            .last()
            .cloned()
            .expect("no statement recorded")
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

impl Transport for Recorder {
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
        Ok(Fetched::Done(1))
    }
}

/// A registry that counts lookups and remembers the names asked for.
pub struct Schemas {
    registry: SchemaRegistry,
    lookups: AtomicUsize,
    asked: Mutex<Vec<String>>,
}

impl Schemas {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            lookups: AtomicUsize::new(0),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SchemaProvider for Schemas {
    async fn table_schema(&self, table: &str) -> DbResult<Option<TableSchema>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(table.to_string());
        self.registry.table_schema(table).await
    }
}

/// `entries` carries every audit column; `tags` carries none.
pub fn craft_schema() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_table(
            TableSchema::new("entries")
                .with_columns(&[
                    "id",
                    "title",
                    "slug",
                    "dateCreated",
                    "dateUpdated",
                    "dateDeleted",
                    "uid",
                ])
                .with_primary_key(&["id"])
                .with_unique_key(&["slug"]),
        )
        .with_table(
            TableSchema::new("tags")
                .with_columns(&["id", "name", "groupId"])
                .with_primary_key(&["id"]),
        )
}
