//! Statement monitoring and hooks.
//!
//! This module provides:
//! - timing and logging of every statement
//! - hooks that can rewrite or abort statements before they run
//! - statement timeouts
//!
//! A hook's [`HookAction::Abort`] is how the aborted-query signal enters the system.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgstamp::monitor::{InstrumentedTransport, LoggingMonitor, MonitorConfig, TracingSqlHook};
//! use std::time::Duration;
//!
//! let config = MonitorConfig::enabled()
//!     .with_statement_timeout(Duration::from_secs(30))
//!     .with_slow_threshold(Duration::from_millis(500));
//!
//! let transport = InstrumentedTransport::new(client)
//!     .with_config(config)
//!     .with_monitor(LoggingMonitor::new())
//!     .add_hook(TracingSqlHook::new());
//! ```

mod instrumented;
mod monitors;
mod tracing_hook;
mod types;


pub use instrumented::{InstrumentedTransport, MonitorConfig};
pub use monitors::{
    AbortHook, CompositeHook, CompositeMonitor, LoggingMonitor, NoopMonitor, QueryStats,
    StatsMonitor,
};
pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
