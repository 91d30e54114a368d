//! Finalized statements and parameter binding.
//!
//! Fragments are written with `?` placeholders; [`Binder`] numbers them as `$n` at build
//! time so no string rewriting of finished SQL is ever needed.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::collections::VecDeque;
use tokio_postgres::types::ToSql;

/// An ordered list of bound parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, value: impl Into<Value>) -> usize {
        self.params.push(value.into());
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.params
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.params
    }
}

/// SQL text plus its ordered parameters, ready to run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    /// Replace the SQL text, keeping the parameters.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// The SQL with every `$n` replaced by the literal form of its parameter.
    ///
    /// Placeholders inside quoted strings or identifiers are left alone, as are numbers
    /// that do not refer to a bound parameter.
    pub fn raw_sql(&self) -> String {
        if self.params.is_empty() {
            return self.sql.clone();
        }
        let mut out = String::with_capacity(self.sql.len() + self.params.len() * 8);
        let mut chars = self.sql.chars().peekable();
        let mut quote: Option<char> = None;

        while let Some(ch) = chars.next() {
            if let Some(q) = quote {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '$' => {
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        digits.push(d);
                        chars.next();
                    }
                    let param = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| self.params.get(i));
                    match param {
                        Some(value) => out.push_str(&value.to_literal()),
                        None => {
                            out.push('$');
                            out.push_str(&digits);
                        }
                    }
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

/// Numbers `?` placeholders while a statement is being built.
///
/// A fragment carrying its own values binds from those. A fragment without values binds
/// from the statement-level queue handed to mutating builders (`update(.., params)`),
/// in order of appearance. Surplus `?` stay literal so Postgres operators such as
/// `jsonb ? 'key'` survive.
#[derive(Debug, Default)]
pub struct Binder {
    params: ParamList,
    pending: VecDeque<Value>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binder that fills value-less fragments from `params`.
    pub fn with_pending(params: &[Value]) -> Self {
        Self {
            params: ParamList::new(),
            pending: params.iter().cloned().collect(),
        }
    }

    /// Bind a value and return its `$n` placeholder.
    pub fn push(&mut self, value: impl Into<Value>) -> String {
        format!("${}", self.params.push(value))
    }

    /// Rewrite `?` placeholders in `sql`.
    pub fn bind_template(&mut self, sql: &str, own: &[Value]) -> String {
        let mut out = String::with_capacity(sql.len() + 4);
        let use_own = !own.is_empty();
        let mut own = own.iter();
        let mut in_string = false;

        for ch in sql.chars() {
            if ch == '\'' {
                in_string = !in_string;
                out.push(ch);
                continue;
            }
            if ch != '?' || in_string {
                out.push(ch);
                continue;
            }
            let next = if use_own {
                own.next().cloned()
            } else {
                self.pending.pop_front()
            };
            match next {
                Some(value) => out.push_str(&self.push(value)),
                None => out.push(ch),
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Finish binding.
    ///
    /// Statement-level params that no placeholder consumed are an error, since they
    /// usually mean a condition and its params got out of step.
    pub fn finish(self, sql: String) -> DbResult<Statement> {
        if !self.pending.is_empty() {
            return Err(DbError::validation(format!(
                "{} parameter(s) were not bound to any placeholder",
                self.pending.len()
            )));
        }
        Ok(Statement::new(sql, self.params.into_vec()))
    }
}
