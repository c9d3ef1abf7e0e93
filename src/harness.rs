//! Test harness that owns hook configuration and the fake connection.
//!
//! A test assigns the hooks it needs, then obtains the connection and hands
//! it to the code under test. The first connection access locks the harness:
//! from then on the hooks are fixed, and assigning one is an error rather
//! than a silent no-op.

use crate::command::FakeDbCommand;
use crate::config::FakeDbConfig;
use crate::connection::FakeDbConnection;
use crate::error::{FakeDbError, FakeDbResult};
use crate::executor::{
    FakeCommandExecutor, HookFuture, NonQueryAsyncHook, ReaderAsyncHook, ScalarAsyncHook,
};
use crate::provider::DbConnection;
use crate::reader::FakeDbDataReader;
use crate::transaction::FakeDbTransaction;
use crate::types::CommandBehavior;
use crate::value::DbValue;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Owns the three async hooks and lazily builds the connection that routes to them.
///
/// Blocking executions fall back to the matching async hook. Dropping the
/// harness disposes the connection if one was handed out.
///
/// # Example
///
/// ```
/// use qail_fakedb::prelude::*;
///
/// let mut harness = FakeDbHarness::new();
/// harness
///     .set_execute_scalar_async(|_, _| Box::pin(async { Ok(DbValue::from(42)) }))
///     .unwrap();
///
/// let command = harness.connection().create_command();
/// assert_eq!(command.execute_scalar().unwrap(), DbValue::Int32(42));
/// assert!(harness.is_locked());
/// ```
#[derive(Default)]
pub struct FakeDbHarness {
    config: FakeDbConfig,
    locked: AtomicBool,
    connection: OnceCell<FakeDbConnection>,
    non_query_async: Option<NonQueryAsyncHook>,
    scalar_async: Option<ScalarAsyncHook>,
    reader_async: Option<ReaderAsyncHook>,
}

impl FakeDbHarness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Harness whose connection reports the given properties.
    pub fn with_config(config: FakeDbConfig) -> Self {
        let mut harness = Self::default();
        harness.config = config;
        harness
    }

    pub fn config(&self) -> &FakeDbConfig {
        &self.config
    }

    /// True once the connection has been accessed.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn set_execute_non_query_async<F>(&mut self, hook: F) -> FakeDbResult<()>
    where
        F: for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, u64>
            + Send
            + Sync
            + 'static,
    {
        self.ensure_unlocked("execute_non_query_async")?;
        self.non_query_async = Some(Arc::new(hook));
        Ok(())
    }

    pub fn set_execute_scalar_async<F>(&mut self, hook: F) -> FakeDbResult<()>
    where
        F: for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, DbValue>
            + Send
            + Sync
            + 'static,
    {
        self.ensure_unlocked("execute_scalar_async")?;
        self.scalar_async = Some(Arc::new(hook));
        Ok(())
    }

    pub fn set_execute_reader_async<F>(&mut self, hook: F) -> FakeDbResult<()>
    where
        F: for<'a> Fn(&'a FakeDbCommand, CommandBehavior, CancellationToken) -> HookFuture<'a, FakeDbDataReader>
            + Send
            + Sync
            + 'static,
    {
        self.ensure_unlocked("execute_reader_async")?;
        self.reader_async = Some(Arc::new(hook));
        Ok(())
    }

    /// The connection as production code sees it. Locks the harness.
    pub fn connection(
        &self,
    ) -> impl DbConnection<Command = FakeDbCommand, Transaction = FakeDbTransaction> + Clone + use<>
    {
        self.fake_connection()
    }

    /// The concrete connection, for assertions on its counters and
    /// transactions. Locks the harness.
    pub fn fake_connection(&self) -> FakeDbConnection {
        if !self.locked.swap(true, Ordering::SeqCst) {
            tracing::debug!("Harness locked; hooks can no longer be assigned");
        }
        self.connection
            .get_or_init(|| self.build_connection())
            .clone()
    }

    fn ensure_unlocked(&self, property: &'static str) -> FakeDbResult<()> {
        if self.is_locked() {
            tracing::warn!("Rejected assignment of {} after connection access", property);
            return Err(FakeDbError::ConfigurationLocked { property });
        }
        Ok(())
    }

    fn build_connection(&self) -> FakeDbConnection {
        let executor = FakeCommandExecutor::builder()
            .async_hooks(
                self.non_query_async.clone(),
                self.scalar_async.clone(),
                self.reader_async.clone(),
            )
            .build();
        tracing::debug!("Building fake connection with {:?}", executor);
        FakeDbConnection::with_config(&self.config, executor)
    }
}

impl fmt::Debug for FakeDbHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeDbHarness")
            .field("config", &self.config)
            .field("locked", &self.is_locked())
            .field("non_query_async", &self.non_query_async.is_some())
            .field("scalar_async", &self.scalar_async.is_some())
            .field("reader_async", &self.reader_async.is_some())
            .finish()
    }
}

impl Drop for FakeDbHarness {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get() {
            connection.dispose();
        }
    }
}
