use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::value::Value;
use std::collections::HashMap;

/// First-column to second-column map built by [`Query::pairs`](super::Query::pairs).
///
/// Keys compare by their text form, so `Int(1)` and `Text("1")` are the same key. A
/// repeated key keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairs {
    entries: Vec<(Value, Value)>,
    /// Key text to slot in `entries`.
    index: HashMap<String, usize>,
}

impl Pairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from result rows. Rows need at least two columns.
    pub fn from_rows(rows: Vec<Row>) -> DbResult<Self> {
        let Some(first) = rows.first() else {
            return Ok(Pairs::new());
        };
        if first.len() < 2 {
            return Err(DbError::InsufficientColumns { found: first.len() });
        }
        let mut pairs = Pairs::with_capacity(rows.len());
        for row in rows {
            let mut values = row.into_values().into_iter();
            if let (Some(key), Some(value)) = (values.next(), values.next()) {
                pairs.insert(key, value);
            }
        }
        Ok(pairs)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key.to_string()) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: impl Into<Value>) -> Option<&Value> {
        let slot = *self.index.get(&key.into().to_string())?;
        self.entries.get(slot).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn into_vec(self) -> Vec<(Value, Value)> {
        self.entries
    }
}

impl IntoIterator for Pairs {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_in_first_position() {
        let rows = vec![
            Row::from_pairs([("id", Value::Int(1)), ("title", Value::from("a"))]),
            Row::from_pairs([("id", Value::Int(2)), ("title", Value::from("b"))]),
            Row::from_pairs([("id", Value::from("1")), ("title", Value::from("c"))]),
        ];
        let pairs = Pairs::from_rows(rows).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get(1), Some(&Value::from("c")));
        assert_eq!(pairs.keys().next(), Some(&Value::Int(1)));
    }

    #[test]
    fn large_result_keeps_order_and_overrides() {
        let n = 50_000;
        let mut rows: Vec<Row> = (0..n)
            .map(|i| Row::from_pairs([("id", Value::Int(i)), ("title", Value::from("t"))]))
            .collect();
        rows.push(Row::from_pairs([("id", Value::Int(0)), ("title", Value::from("last"))]));
        let started = std::time::Instant::now();
        let pairs = Pairs::from_rows(rows).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(pairs.len(), n as usize);
        assert_eq!(pairs.get(0), Some(&Value::from("last")));
        assert_eq!(pairs.keys().next(), Some(&Value::Int(0)));
        assert_eq!(pairs.keys().last(), Some(&Value::Int(n - 1)));
    }

    #[test]
    fn single_column_is_an_error() {
        let rows = vec![Row::from_pairs([("id", Value::Int(1))])];
        let err = Pairs::from_rows(rows).unwrap_err();
        assert!(matches!(err, DbError::InsufficientColumns { found: 1 }));
    }
}
