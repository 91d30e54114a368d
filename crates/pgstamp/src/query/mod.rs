//! Resilient SELECT queries.
//!
//! [`Query`] describes a SELECT and runs it through a [`Db`](crate::Db). Compared to
//! building the statement by hand it:
//!
//! - drops falsy conditions (`None`, `""`, empty hashes) instead of emitting `WHERE ()`
//! - degrades when the transport aborts the statement: every terminal has a defined
//!   empty result (see [`Query::all`] and friends)
//! - normalizes select lists into keyed entries (`"id, title AS t"`)
//! - runs init listeners and collects behaviors from an [`Events`] registry
//!
//! ```ignore
//! let titles = db
//!     .query()
//!     .select("id, title")
//!     .from("entries")
//!     .where_(columns! { "sectionId" => 2, "dateDeleted" => Value::Null })
//!     .order_by("postDate DESC")
//!     .pairs(&db)
//!     .await?;
//! ```

mod exec;
mod guard;
mod pairs;
mod select;

#[cfg(test)]
mod tests;

pub use guard::ScopedOverride;
pub use pairs::Pairs;
pub use select::{IntoSelect, normalize_entry};

use crate::builder::{Join, JoinKind, OrderItem, QuerySpec, SelectColumn, SortDir};
use crate::condition::{Condition, IntoCondition};
use crate::events::{Behavior, Events};
use std::fmt;
use std::sync::Arc;

/// A SELECT query with abort-tolerant terminal operations.
#[derive(Clone, Default)]
pub struct Query {
    spec: QuerySpec,
    events: Arc<Events>,
    behaviors: Option<Vec<Arc<dyn Behavior>>>,
    aborted: Option<String>,
}

impl Query {
    /// A query with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// A query bound to `events`; init listeners run before this returns.
    pub fn with_events(events: Arc<Events>) -> Self {
        let query = Self {
            events: Arc::clone(&events),
            ..Self::default()
        };
        if events.has_init_listeners() {
            events.fire_init(query)
        } else {
            query
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut QuerySpec {
        &mut self.spec
    }

    pub fn into_spec(self) -> QuerySpec {
        self.spec
    }

    pub fn events(&self) -> &Arc<Events> {
        &self.events
    }

    // ==================== select ====================

    /// Replace the select list.
    pub fn select(mut self, columns: impl IntoSelect) -> Self {
        let mut list = Vec::new();
        select::merge_select(&mut list, columns.into_select());
        self.spec.select = Some(list);
        self
    }

    /// Replace the select list and set the text placed after `SELECT`.
    pub fn select_with_option(mut self, columns: impl IntoSelect, option: impl Into<String>) -> Self {
        self.spec.select_option = Some(option.into());
        self.select(columns)
    }

    /// Append to the select list, starting one if none is set.
    pub fn add_select(mut self, columns: impl IntoSelect) -> Self {
        let list = self.spec.select.get_or_insert_with(Vec::new);
        select::merge_select(list, columns.into_select());
        self
    }

    pub fn select_columns(&self) -> Option<&[SelectColumn]> {
        self.spec.select.as_deref()
    }

    pub fn distinct(mut self) -> Self {
        self.spec.distinct = true;
        self
    }

    // ==================== from / join ====================

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.spec.from = vec![table.into()];
        self
    }

    pub fn add_from(mut self, table: impl Into<String>) -> Self {
        self.spec.from.push(table.into());
        self
    }

    pub fn join(mut self, kind: JoinKind, table: impl Into<String>, on: impl IntoCondition) -> Self {
        self.spec.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into_condition(),
        });
        self
    }

    pub fn inner_join(self, table: impl Into<String>, on: impl IntoCondition) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: impl Into<String>, on: impl IntoCondition) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    pub fn right_join(self, table: impl Into<String>, on: impl IntoCondition) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Whether a join targets `table` (exact, or a reference starting with it such as
    /// `entries e`).
    pub fn is_joined(&self, table: &str) -> bool {
        self.spec
            .joins
            .iter()
            .any(|j| j.table == table || j.table.starts_with(table))
    }

    // ==================== where ====================

    /// Replace the condition. A falsy condition clears it.
    pub fn where_(mut self, condition: impl IntoCondition) -> Self {
        self.spec.condition = condition.into_condition();
        self
    }

    /// AND `condition` onto the current one. A falsy condition is ignored.
    pub fn and_where(mut self, condition: impl IntoCondition) -> Self {
        if let Some(condition) = condition.into_condition() {
            self.spec.condition = Some(match self.spec.condition.take() {
                Some(existing) => existing.and_with(condition),
                None => condition,
            });
        }
        self
    }

    /// OR `condition` onto the current one. A falsy condition is ignored.
    pub fn or_where(mut self, condition: impl IntoCondition) -> Self {
        if let Some(condition) = condition.into_condition() {
            self.spec.condition = Some(match self.spec.condition.take() {
                Some(existing) => existing.or_with(condition),
                None => condition,
            });
        }
        self
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.spec.condition.as_ref()
    }

    // ==================== grouping / ordering / paging ====================

    /// Group by a comma separated column list.
    pub fn group_by(mut self, columns: &str) -> Self {
        self.spec.group_by = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        self
    }

    pub fn having(mut self, condition: impl IntoCondition) -> Self {
        self.spec.having = condition.into_condition();
        self
    }

    /// Replace the ordering with `"postDate DESC, id"`-style text.
    pub fn order_by(mut self, order: &str) -> Self {
        self.spec.order_by = OrderItem::parse_list(order);
        self
    }

    pub fn add_order_by(mut self, column: impl Into<String>, dir: SortDir) -> Self {
        self.spec.order_by.push(OrderItem::new(column, dir));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.spec.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.spec.offset = Some(offset);
        self
    }

    pub fn clear_limit(mut self) -> Self {
        self.spec.limit = None;
        self
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.spec.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.spec.offset
    }

    // ==================== abort / behaviors ====================

    /// Mark the query as aborted: terminals return their empty result without running
    /// a statement. Meant for init listeners and behaviors that decide a query cannot
    /// match anything.
    pub fn abort_with(mut self, reason: impl Into<String>) -> Self {
        self.aborted = Some(reason.into());
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    /// Attach the behaviors contributed by define-behaviors listeners. Runs once.
    pub fn ensure_behaviors(&mut self) {
        if self.behaviors.is_some() {
            return;
        }
        let defs = self.events.define_behaviors(self).into_vec();
        let mut query = std::mem::take(self);
        query.behaviors = Some(Vec::new());
        for behavior in &defs {
            tracing::debug!(target: "pgstamp", behavior = behavior.name(), "attaching query behavior");
            query = behavior.attach(query);
        }
        query.behaviors = Some(defs);
        *self = query;
    }

    /// Attached behaviors, attaching them first if needed.
    pub fn behaviors(&mut self) -> &[Arc<dyn Behavior>] {
        self.ensure_behaviors();
        self.behaviors.as_deref().unwrap_or_default()
    }

    pub fn get_behavior(&mut self, name: &str) -> Option<Arc<dyn Behavior>> {
        self.behaviors().iter().find(|b| b.name() == name).cloned()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("spec", &self.spec)
            .field(
                "behaviors",
                &self
                    .behaviors
                    .as_ref()
                    .map(|b| b.iter().map(|b| b.name().to_string()).collect::<Vec<_>>()),
            )
            .field("aborted", &self.aborted)
            .finish()
    }
}
