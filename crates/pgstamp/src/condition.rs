//! Condition trees for WHERE/HAVING/JOIN clauses.
//!
//! [`Condition`] supports:
//! - column hashes (`{"sectionId": 1, "dateDeleted": NULL}`)
//! - comparisons, `IN`, `BETWEEN`, `LIKE`/`ILIKE`, `IS NULL`
//! - AND/OR/NOT grouping
//! - templates with `?` placeholders and raw SQL fragments
//!
//! A condition can be *falsy*: an empty string, an empty hash or an empty group. Falsy
//! conditions never reach the generated SQL.

use crate::columns::{ColumnValue, Columns};
use crate::ident::quote_column_name;
use crate::statement::Binder;
use crate::value::Value;

/// Condition node for building WHERE/HAVING clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `column = value` for every entry, ANDed. `NULL` renders as `IS NULL` and a
    /// list as `IN (...)`.
    Hash(Columns),

    /// Simple comparison: column op $n
    Compare {
        column: String,
        op: &'static str,
        value: Value,
    },

    /// column IS NULL or column IS NOT NULL
    NullCheck { column: String, is_null: bool },

    /// column IN ($1, $2, ...) or column NOT IN (...)
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },

    /// column BETWEEN $n AND $m
    Between {
        column: String,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// SQL with `?` placeholders.
    ///
    /// With no values of its own, a template binds from the statement-level params given
    /// to a mutating command.
    Template { sql: String, params: Vec<Value> },

    /// Raw SQL fragment.
    Raw(String),

    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),

    /// Always true (an empty NOT IN list).
    True,
    /// Always false (an empty IN list).
    False,
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    pub fn hash(columns: Columns) -> Self {
        Condition::Hash(columns)
    }

    fn compare(column: impl Into<String>, op: &'static str, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// column = value
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, "=", value)
    }

    /// column != value
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, "!=", value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, ">", value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, ">=", value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, "<", value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, "<=", value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, "LIKE", pattern)
    }

    /// Case-insensitive LIKE
    pub fn ilike(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, "ILIKE", pattern)
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, "NOT LIKE", pattern)
    }

    pub fn not_ilike(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, "NOT ILIKE", pattern)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Condition::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// column IN (values...); an empty list matches nothing.
    pub fn in_list<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Condition::False;
        }
        Condition::InList {
            column: column.into(),
            values,
            negated: false,
        }
    }

    /// column NOT IN (values...); an empty list matches everything.
    pub fn not_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Condition::True;
        }
        Condition::InList {
            column: column.into(),
            values,
            negated: true,
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    /// A template with `?` placeholders.
    ///
    /// ```ignore
    /// Condition::template("\"postDate\" <= ? OR \"expiryDate\" > ?", [now, now])
    /// ```
    pub fn template<V: Into<Value>>(
        sql: impl Into<String>,
        params: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::Template {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    /// Whether this condition is empty and should be dropped.
    pub fn is_falsy(&self) -> bool {
        match self {
            Condition::Raw(sql) => sql.trim().is_empty(),
            Condition::Template { sql, .. } => sql.trim().is_empty(),
            Condition::Hash(cols) => cols.is_empty(),
            Condition::And(items) | Condition::Or(items) => items.iter().all(Condition::is_falsy),
            Condition::Not(inner) => inner.is_falsy(),
            _ => false,
        }
    }

    /// Combine with `other` using AND, flattening into an existing AND group.
    pub fn and_with(self, other: Condition) -> Condition {
        match self {
            Condition::And(mut items) => {
                items.push(other);
                Condition::And(items)
            }
            this => Condition::And(vec![this, other]),
        }
    }

    /// Combine with `other` using OR, flattening into an existing OR group.
    pub fn or_with(self, other: Condition) -> Condition {
        match self {
            Condition::Or(mut items) => {
                items.push(other);
                Condition::Or(items)
            }
            this => Condition::Or(vec![this, other]),
        }
    }

    /// Build the SQL fragment with `$n` placeholders.
    ///
    /// Returns an empty string for a falsy condition.
    pub fn build(&self, binder: &mut Binder) -> String {
        match self {
            Condition::Hash(cols) => {
                let parts: Vec<String> = cols
                    .iter()
                    .map(|(name, value)| {
                        let column = quote_column_name(name);
                        match value {
                            ColumnValue::Value(Value::Null) => format!("{column} IS NULL"),
                            ColumnValue::Value(v) => {
                                format!("{column} = {}", binder.push(v.clone()))
                            }
                            ColumnValue::Expr(e) => {
                                format!("{column} = {}", binder.bind_template(&e.sql, &e.params))
                            }
                            ColumnValue::List(values) if values.is_empty() => "1=0".to_string(),
                            ColumnValue::List(values) => {
                                let placeholders: Vec<String> =
                                    values.iter().map(|v| binder.push(v.clone())).collect();
                                format!("{column} IN ({})", placeholders.join(", "))
                            }
                        }
                    })
                    .collect();
                parts.join(" AND ")
            }
            Condition::Compare { column, op, value } => {
                let column = quote_column_name(column);
                if value.is_null() {
                    match *op {
                        "=" => return format!("{column} IS NULL"),
                        "!=" => return format!("{column} IS NOT NULL"),
                        _ => {}
                    }
                }
                format!("{column} {op} {}", binder.push(value.clone()))
            }
            Condition::NullCheck { column, is_null } => {
                let column = quote_column_name(column);
                if *is_null {
                    format!("{column} IS NULL")
                } else {
                    format!("{column} IS NOT NULL")
                }
            }
            Condition::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1".into() } else { "1=0".into() };
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| binder.push(v.clone())).collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!(
                    "{} {op} ({})",
                    quote_column_name(column),
                    placeholders.join(", ")
                )
            }
            Condition::Between {
                column,
                from,
                to,
                negated,
            } => {
                let from = binder.push(from.clone());
                let to = binder.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {op} {from} AND {to}", quote_column_name(column))
            }
            Condition::Template { sql, params } => binder.bind_template(sql.trim(), params),
            Condition::Raw(sql) => {
                // Raw fragments may still carry `?` filled from statement-level params.
                binder.bind_template(sql.trim(), &[])
            }
            Condition::And(items) => build_group(items, " AND ", binder),
            Condition::Or(items) => build_group(items, " OR ", binder),
            Condition::Not(inner) => {
                let sql = inner.build(binder);
                if sql.is_empty() {
                    sql
                } else {
                    format!("NOT ({sql})")
                }
            }
            Condition::True => "1=1".into(),
            Condition::False => "1=0".into(),
        }
    }

    fn needs_parens(&self) -> bool {
        match self {
            Condition::Hash(cols) => cols.len() > 1,
            Condition::Template { .. } | Condition::Raw(_) => true,
            Condition::And(items) | Condition::Or(items) => {
                items.iter().filter(|c| !c.is_falsy()).count() > 1
            }
            _ => false,
        }
    }
}

fn build_group(items: &[Condition], sep: &str, binder: &mut Binder) -> String {
    let live: Vec<&Condition> = items.iter().filter(|c| !c.is_falsy()).collect();
    if live.len() == 1 {
        return live[0].build(binder);
    }
    live.iter()
        .map(|c| {
            let sql = c.build(binder);
            if c.needs_parens() {
                format!("({sql})")
            } else {
                sql
            }
        })
        .collect::<Vec<_>>()
        .join(sep)
}

/// Conversion into an optional condition.
///
/// `None` means "no condition": falsy inputs convert to `None`, so passing `""` or an
/// empty [`Columns`] to `where_` clears the filter instead of producing `WHERE ()`.
pub trait IntoCondition {
    fn into_condition(self) -> Option<Condition>;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Option<Condition> {
        if self.is_falsy() { None } else { Some(self) }
    }
}

impl IntoCondition for &str {
    fn into_condition(self) -> Option<Condition> {
        Condition::Raw(self.to_string()).into_condition()
    }
}

impl IntoCondition for String {
    fn into_condition(self) -> Option<Condition> {
        Condition::Raw(self).into_condition()
    }
}

impl IntoCondition for Columns {
    fn into_condition(self) -> Option<Condition> {
        Condition::Hash(self).into_condition()
    }
}

impl IntoCondition for Vec<Condition> {
    fn into_condition(self) -> Option<Condition> {
        Condition::And(self).into_condition()
    }
}

impl<S: Into<String>> IntoCondition for (S, Vec<Value>) {
    fn into_condition(self) -> Option<Condition> {
        Condition::Template {
            sql: self.0.into(),
            params: self.1,
        }
        .into_condition()
    }
}

impl<T: IntoCondition> IntoCondition for Option<T> {
    fn into_condition(self) -> Option<Condition> {
        self.and_then(IntoCondition::into_condition)
    }
}
