use super::Query;
use std::ops::{Deref, DerefMut};

/// Temporarily overrides a query's limit or offset.
///
/// The previous value is put back when the guard drops, so it is restored on every exit
/// path: success, error, abort, or the enclosing future being dropped.
pub struct ScopedOverride<'q> {
    query: &'q mut Query,
    limit: Option<Option<u64>>,
    offset: Option<Option<u64>>,
}

impl<'q> ScopedOverride<'q> {
    pub fn limit(query: &'q mut Query, limit: Option<u64>) -> Self {
        let previous = std::mem::replace(&mut query.spec.limit, limit);
        Self {
            query,
            limit: Some(previous),
            offset: None,
        }
    }

    pub fn offset(query: &'q mut Query, offset: Option<u64>) -> Self {
        let previous = std::mem::replace(&mut query.spec.offset, offset);
        Self {
            query,
            limit: None,
            offset: Some(previous),
        }
    }
}

impl Deref for ScopedOverride<'_> {
    type Target = Query;

    fn deref(&self) -> &Query {
        self.query
    }
}

impl DerefMut for ScopedOverride<'_> {
    fn deref_mut(&mut self) -> &mut Query {
        self.query
    }
}

impl Drop for ScopedOverride<'_> {
    fn drop(&mut self) {
        if let Some(limit) = self.limit.take() {
            self.query.spec.limit = limit;
        }
        if let Some(offset) = self.offset.take() {
            self.query.spec.offset = offset;
        }
    }
}
