use super::monitors::{CompositeHook, NoopMonitor};
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};
use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::statement::Statement;
use crate::transport::{Fetched, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Settings for [`InstrumentedTransport`].
///
/// Deserializes from the same config source as [`AuditConfig`](crate::AuditConfig);
/// durations are whole milliseconds:
///
/// ```json
/// { "enabled": true, "statement_timeout_ms": 30000, "slow_statement_ms": 500 }
/// ```
///
/// Hooks run whether or not monitoring is enabled, so an abort hook works on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Report statements to the monitor and to `after_query` hooks.
    pub enabled: bool,
    /// Fail a statement with [`DbError::Timeout`] after this long.
    pub statement_timeout_ms: Option<u64>,
    /// Report statements at least this slow through `on_slow_query`.
    pub slow_statement_ms: Option<u64>,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(millis(timeout));
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_ms = Some(millis(threshold));
        self
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_statement_ms
            .is_some_and(|ms| elapsed >= Duration::from_millis(ms))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A [`Transport`] wrapper that applies hooks, timeouts and monitoring.
///
/// A hook returning [`HookAction::Abort`] turns into [`Fetched::Aborted`]; the inner
/// transport never sees the statement. Monitoring is off until the config enables it.
pub struct InstrumentedTransport<C> {
    client: C,
    monitor: Arc<dyn QueryMonitor>,
    hook: Option<Arc<dyn QueryHook>>,
    config: MonitorConfig,
}

impl<C: Transport> InstrumentedTransport<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            monitor: Arc::new(NoopMonitor),
            hook: None,
            config: MonitorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Add a query hook.
    ///
    /// If a hook is already set, this composes it with the new hook (existing first).
    pub fn add_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_hook_arc(Arc::new(hook))
    }

    pub fn add_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hook = Some(match self.hook.take() {
            None => hook,
            Some(existing) => Arc::new(CompositeHook::new().add_arc(existing).add_arc(hook)),
        });
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Run hooks. `Err(reason)` means the statement must not run.
    fn apply_hook(&self, ctx: &mut QueryContext) -> Result<(), String> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };
        match hook.before_query(ctx) {
            HookAction::Continue => Ok(()),
            HookAction::ModifySql(sql) => {
                ctx.query_type = QueryType::from_sql(&sql);
                ctx.sql = sql;
                Ok(())
            }
            HookAction::Abort(reason) => Err(reason),
        }
    }

    fn report_result(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if !self.config.enabled {
            return;
        }
        if let Some(hook) = &self.hook {
            hook.after_query(ctx, duration, result);
        }
        self.monitor.on_query_complete(ctx, duration, result);
        if self.config.is_slow(duration) {
            self.monitor.on_slow_query(ctx, duration);
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>> + Send,
    {
        match self.config.statement_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, future)
                .await
                .unwrap_or(Err(DbError::Timeout(timeout))),
            None => future.await,
        }
    }

    /// Run hooks and announce the statement.
    ///
    /// Returns the statement to run (rewritten when a hook changed the SQL), or the abort
    /// reason.
    fn prepare(&self, stmt: &Statement) -> (QueryContext, Result<Option<Statement>, String>) {
        let mut ctx = QueryContext::new(stmt.sql(), stmt.params().len());

        if let Err(reason) = self.apply_hook(&mut ctx) {
            tracing::debug!(target: "pgstamp", sql = %ctx.sql, %reason, "statement aborted by hook");
            self.report_result(&ctx, Duration::ZERO, &QueryResult::Aborted(reason.clone()));
            return (ctx, Err(reason));
        }

        if self.config.enabled {
            self.monitor.on_query_start(&ctx);
        }

        let rewritten = (ctx.sql != stmt.sql()).then(|| stmt.clone().with_sql(ctx.sql.clone()));
        (ctx, Ok(rewritten))
    }

    fn finish<T>(
        &self,
        ctx: &QueryContext,
        start: Instant,
        result: &DbResult<Fetched<T>>,
        describe: impl FnOnce(&T) -> QueryResult,
    ) {
        let query_result = match result {
            Ok(Fetched::Done(v)) => describe(v),
            Ok(Fetched::Aborted(reason)) => QueryResult::Aborted(reason.clone()),
            Err(DbError::Timeout(d)) => QueryResult::Error(format!("timeout after {d:?}")),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report_result(ctx, start.elapsed(), &query_result);
    }
}

impl<C: Transport> Transport for InstrumentedTransport<C> {
    async fn fetch(&self, stmt: &Statement) -> DbResult<Fetched<Vec<Row>>> {
        let (ctx, prepared) = self.prepare(stmt);
        let rewritten = match prepared {
            Ok(rewritten) => rewritten,
            Err(reason) => return Ok(Fetched::Aborted(reason)),
        };
        let stmt = rewritten.as_ref().unwrap_or(stmt);

        let start = Instant::now();
        let result = self.with_timeout(self.client.fetch(stmt)).await;
        self.finish(&ctx, start, &result, |rows| QueryResult::Rows(rows.len()));
        result
    }

    async fn execute(&self, stmt: &Statement) -> DbResult<Fetched<u64>> {
        let (ctx, prepared) = self.prepare(stmt);
        let rewritten = match prepared {
            Ok(rewritten) => rewritten,
            Err(reason) => return Ok(Fetched::Aborted(reason)),
        };
        let stmt = rewritten.as_ref().unwrap_or(stmt);

        let start = Instant::now();
        let result = self.with_timeout(self.client.execute(stmt)).await;
        self.finish(&ctx, start, &result, |n| QueryResult::Affected(*n));
        result
    }
}
