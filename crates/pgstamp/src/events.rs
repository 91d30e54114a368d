//! Extension points for queries.
//!
//! Collaborators register listeners on an [`Events`] registry:
//!
//! - **init** listeners run on every new [`Query`] created through
//!   [`Db::query`](crate::Db::query), in registration order, before the query is handed
//!   out. They can preset conditions, joins or ordering.
//! - **define-behaviors** listeners contribute [`Behavior`]s the first time a query's
//!   behaviors are needed (see [`Query::ensure_behaviors`]).
//!
//! ```ignore
//! let events = Events::new()
//!     .on_init(|q| q.and_where(Condition::is_null("dateDeleted")))
//!     .on_define_behaviors(|_, defs| defs.add(CacheTag::new("entries")));
//! let db = Db::new(client, schema).with_events(events);
//! ```

use crate::query::Query;
use std::fmt;
use std::sync::Arc;

/// A named bundle of behavior attached to a [`Query`].
pub trait Behavior: Send + Sync {
    fn name(&self) -> &str;

    /// Called once when the behavior is attached.
    fn attach(&self, query: Query) -> Query {
        query
    }
}

/// Behaviors collected while firing the define-behaviors signal.
///
/// Adding a behavior whose name is already taken replaces the earlier one in place.
#[derive(Default, Clone)]
pub struct DefineBehaviors {
    behaviors: Vec<Arc<dyn Behavior>>,
}

impl DefineBehaviors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<B: Behavior + 'static>(&mut self, behavior: B) {
        self.add_arc(Arc::new(behavior));
    }

    pub fn add_arc(&mut self, behavior: Arc<dyn Behavior>) {
        match self
            .behaviors
            .iter_mut()
            .find(|b| b.name() == behavior.name())
        {
            Some(slot) => *slot = behavior,
            None => self.behaviors.push(behavior),
        }
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(|b| b.name())
    }

    pub fn into_vec(self) -> Vec<Arc<dyn Behavior>> {
        self.behaviors
    }
}

impl fmt::Debug for DefineBehaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

type InitListener = Arc<dyn Fn(Query) -> Query + Send + Sync>;
type BehaviorsListener = Arc<dyn Fn(&Query, &mut DefineBehaviors) + Send + Sync>;

/// Listener registry shared by every query a [`Db`](crate::Db) creates.
#[derive(Default, Clone)]
pub struct Events {
    init: Vec<InitListener>,
    define_behaviors: Vec<BehaviorsListener>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an init listener.
    pub fn on_init<F>(mut self, listener: F) -> Self
    where
        F: Fn(Query) -> Query + Send + Sync + 'static,
    {
        self.init.push(Arc::new(listener));
        self
    }

    /// Register a define-behaviors listener.
    pub fn on_define_behaviors<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Query, &mut DefineBehaviors) + Send + Sync + 'static,
    {
        self.define_behaviors.push(Arc::new(listener));
        self
    }

    pub fn has_init_listeners(&self) -> bool {
        !self.init.is_empty()
    }

    pub fn has_behavior_listeners(&self) -> bool {
        !self.define_behaviors.is_empty()
    }

    /// Run init listeners against `query`, in registration order.
    pub fn fire_init(&self, query: Query) -> Query {
        self.init.iter().fold(query, |query, listener| listener(query))
    }

    /// Collect behaviors from every define-behaviors listener.
    pub fn define_behaviors(&self, query: &Query) -> DefineBehaviors {
        let mut defs = DefineBehaviors::new();
        for listener in &self.define_behaviors {
            listener(query, &mut defs);
        }
        defs
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("init", &self.init.len())
            .field("define_behaviors", &self.define_behaviors.len())
            .finish()
    }
}
