//! Ordered column maps for insert, update and upsert.

use crate::value::Value;

/// A raw SQL expression with `?` placeholders, usable as a column value.
///
/// ```ignore
/// let cols = Columns::new().set_expr("sortOrder", Expression::new("\"sortOrder\" + ?", [1]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Expression {
    pub fn new<I, V>(sql: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// An expression without parameters (`now()`, `DEFAULT`).
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// The value side of a column assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Value(Value),
    Expr(Expression),
    /// Several candidate values. Only meaningful in a hash condition, where it
    /// renders as `IN (...)`.
    List(Vec<Value>),
}

impl ColumnValue {
    /// The bound value, or `None` for an expression or a list.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ColumnValue::Value(v) => Some(v),
            ColumnValue::Expr(_) | ColumnValue::List(_) => None,
        }
    }
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        ColumnValue::Value(v)
    }
}

impl From<Expression> for ColumnValue {
    fn from(e: Expression) -> Self {
        ColumnValue::Expr(e)
    }
}

/// An insertion-ordered `column => value` map.
///
/// Setting an existing column replaces its value in place, so the column keeps its
/// original position in generated SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    entries: Vec<(String, ColumnValue)>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.put(name.into(), ColumnValue::Value(value.into()));
        self
    }

    /// Builder form of [`Columns::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a column to a SQL expression.
    pub fn set_expr(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.put(name.into(), ColumnValue::Expr(expr));
        self
    }

    /// Set a column to a list of values, for `column IN (...)` in a hash condition.
    pub fn set_list<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.put(name.into(), ColumnValue::List(values));
        self
    }

    fn put(&mut self, name: String, value: ColumnValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Absent or `NULL`.
    pub fn is_unset(&self, name: &str) -> bool {
        match self.get(name) {
            None => true,
            Some(ColumnValue::Value(v)) => v.is_null(),
            Some(ColumnValue::Expr(_) | ColumnValue::List(_)) => false,
        }
    }

    /// Absent, `NULL` or an empty string.
    pub fn is_blank(&self, name: &str) -> bool {
        match self.get(name) {
            None => true,
            Some(ColumnValue::Value(v)) => v.is_blank(),
            Some(ColumnValue::Expr(_) | ColumnValue::List(_)) => false,
        }
    }

    /// Set `name` unless the caller already gave it a non-null value.
    ///
    /// Returns `true` when the value was written.
    pub fn set_if_unset(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.is_unset(name) {
            self.set(name, value);
            true
        } else {
            false
        }
    }

    /// Set `name` unless the caller already gave it a non-blank value.
    pub fn set_if_blank(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.is_blank(name) {
            self.set(name, value);
            true
        } else {
            false
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Columns {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut cols = Columns::new();
        for (k, v) in iter {
            cols.set(k, v);
        }
        cols
    }
}

impl IntoIterator for Columns {
    type Item = (String, ColumnValue);
    type IntoIter = std::vec::IntoIter<(String, ColumnValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Columns`] map.
///
/// ```ignore
/// let cols = columns! { "title" => "Hello", "authorId" => 3 };
/// ```
#[macro_export]
macro_rules! columns {
    () => { $crate::Columns::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut cols = $crate::Columns::new();
        $( cols.set($name, $value); )+
        cols
    }};
}
