//! Command execution routing.
//!
//! [`FakeCommandExecutor`] holds six independent strategy slots, one per
//! execution style:
//!
//! | Slot                     | Hook shape                                   |
//! |--------------------------|----------------------------------------------|
//! | `non_query`              | `Fn(&cmd) -> FakeDbResult<u64>`              |
//! | `non_query_async`        | `Fn(&cmd, token) -> HookFuture<u64>`         |
//! | `scalar`                 | `Fn(&cmd) -> FakeDbResult<DbValue>`          |
//! | `scalar_async`           | `Fn(&cmd, token) -> HookFuture<DbValue>`     |
//! | `reader`                 | `Fn(&cmd, behavior) -> FakeDbResult<Reader>` |
//! | `reader_async`           | `Fn(&cmd, behavior, token) -> HookFuture<Reader>` |
//!
//! Every dispatch returns the hook's result verbatim. An empty slot fails with
//! [`FakeDbError::NotImplemented`] naming the invoked capability, so a code
//! path the test did not anticipate surfaces as a failure instead of empty data.
//!
//! A blocking dispatch whose own slot is empty falls back to the async slot
//! and runs it to completion on a scoped background thread. The reverse is
//! never derived: an async dispatch only ever uses the async slot.

use crate::command::FakeDbCommand;
use crate::error::{FakeDbError, FakeDbResult};
use crate::reader::FakeDbDataReader;
use crate::types::CommandBehavior;
use crate::value::DbValue;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;
use tokio_util::sync::CancellationToken;

/// Future returned by async hooks. May borrow the command it was given.
pub type HookFuture<'a, T> = Pin<Box<dyn Future<Output = FakeDbResult<T>> + Send + 'a>>;

pub type NonQueryHook = Arc<dyn Fn(&FakeDbCommand) -> FakeDbResult<u64> + Send + Sync>;
pub type ScalarHook = Arc<dyn Fn(&FakeDbCommand) -> FakeDbResult<DbValue> + Send + Sync>;
pub type ReaderHook =
    Arc<dyn Fn(&FakeDbCommand, CommandBehavior) -> FakeDbResult<FakeDbDataReader> + Send + Sync>;

pub type NonQueryAsyncHook = Arc<
    dyn for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, u64> + Send + Sync,
>;
pub type ScalarAsyncHook = Arc<
    dyn for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, DbValue> + Send + Sync,
>;
pub type ReaderAsyncHook = Arc<
    dyn for<'a> Fn(&'a FakeDbCommand, CommandBehavior, CancellationToken) -> HookFuture<'a, FakeDbDataReader>
        + Send
        + Sync,
>;

/// Routes command executions to the configured hooks.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Clone, Default)]
pub struct FakeCommandExecutor {
    non_query: Option<NonQueryHook>,
    non_query_async: Option<NonQueryAsyncHook>,
    scalar: Option<ScalarHook>,
    scalar_async: Option<ScalarAsyncHook>,
    reader: Option<ReaderHook>,
    reader_async: Option<ReaderAsyncHook>,
}

impl FakeCommandExecutor {
    /// An executor with every slot unconfigured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FakeCommandExecutorBuilder {
        FakeCommandExecutorBuilder::default()
    }

    pub fn execute_non_query(&self, command: &FakeDbCommand) -> FakeDbResult<u64> {
        tracing::trace!("Dispatching execute_non_query");
        match (&self.non_query, &self.non_query_async) {
            (Some(hook), _) => hook(command),
            (None, Some(hook)) => {
                run_to_completion("execute_non_query", hook(command, CancellationToken::new()))
            }
            (None, None) => not_implemented("execute_non_query"),
        }
    }

    pub fn execute_scalar(&self, command: &FakeDbCommand) -> FakeDbResult<DbValue> {
        tracing::trace!("Dispatching execute_scalar");
        match (&self.scalar, &self.scalar_async) {
            (Some(hook), _) => hook(command),
            (None, Some(hook)) => {
                run_to_completion("execute_scalar", hook(command, CancellationToken::new()))
            }
            (None, None) => not_implemented("execute_scalar"),
        }
    }

    pub fn execute_reader(
        &self,
        command: &FakeDbCommand,
        behavior: CommandBehavior,
    ) -> FakeDbResult<FakeDbDataReader> {
        tracing::trace!("Dispatching execute_reader with behavior {:?}", behavior);
        match (&self.reader, &self.reader_async) {
            (Some(hook), _) => hook(command, behavior),
            (None, Some(hook)) => run_to_completion(
                "execute_reader",
                hook(command, behavior, CancellationToken::new()),
            ),
            (None, None) => not_implemented("execute_reader"),
        }
    }

    pub fn execute_non_query_async<'a>(
        &self,
        command: &'a FakeDbCommand,
        cancel: CancellationToken,
    ) -> HookFuture<'a, u64> {
        tracing::trace!("Dispatching execute_non_query_async");
        match &self.non_query_async {
            Some(hook) => hook(command, cancel),
            None => Box::pin(std::future::ready(not_implemented::<u64>("execute_non_query_async"))),
        }
    }

    pub fn execute_scalar_async<'a>(
        &self,
        command: &'a FakeDbCommand,
        cancel: CancellationToken,
    ) -> HookFuture<'a, DbValue> {
        tracing::trace!("Dispatching execute_scalar_async");
        match &self.scalar_async {
            Some(hook) => hook(command, cancel),
            None => Box::pin(std::future::ready(not_implemented::<DbValue>("execute_scalar_async"))),
        }
    }

    pub fn execute_reader_async<'a>(
        &self,
        command: &'a FakeDbCommand,
        behavior: CommandBehavior,
        cancel: CancellationToken,
    ) -> HookFuture<'a, FakeDbDataReader> {
        tracing::trace!("Dispatching execute_reader_async with behavior {:?}", behavior);
        match &self.reader_async {
            Some(hook) => hook(command, behavior, cancel),
            None => Box::pin(std::future::ready(not_implemented::<FakeDbDataReader>("execute_reader_async"))),
        }
    }
}

impl std::fmt::Debug for FakeCommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCommandExecutor")
            .field("non_query", &self.non_query.is_some())
            .field("non_query_async", &self.non_query_async.is_some())
            .field("scalar", &self.scalar.is_some())
            .field("scalar_async", &self.scalar_async.is_some())
            .field("reader", &self.reader.is_some())
            .field("reader_async", &self.reader_async.is_some())
            .finish()
    }
}

fn not_implemented<T>(capability: &'static str) -> FakeDbResult<T> {
    tracing::warn!("{} was invoked but no hook is configured", capability);
    Err(FakeDbError::NotImplemented(capability))
}

/// Drive an async hook to completion from a blocking caller.
///
/// The future runs on a scoped thread with its own current-thread runtime, so
/// this is safe to call from inside a tokio runtime as well as outside one.
/// There is no timeout: a hook that never completes blocks the caller forever.
fn run_to_completion<T: Send>(capability: &'static str, future: HookFuture<'_, T>) -> FakeDbResult<T> {
    tracing::trace!("Bridging blocking {} onto its async hook", capability);
    thread::scope(|scope| {
        let worker = scope.spawn(move || -> FakeDbResult<T> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(future)
        });
        match worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

/// Builder for [`FakeCommandExecutor`]. Each setter fills one slot; later calls
/// for the same slot replace earlier ones.
#[derive(Default)]
pub struct FakeCommandExecutorBuilder {
    executor: FakeCommandExecutor,
}

impl FakeCommandExecutorBuilder {
    pub fn non_query<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FakeDbCommand) -> FakeDbResult<u64> + Send + Sync + 'static,
    {
        self.executor.non_query = Some(Arc::new(hook));
        self
    }

    pub fn scalar<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FakeDbCommand) -> FakeDbResult<DbValue> + Send + Sync + 'static,
    {
        self.executor.scalar = Some(Arc::new(hook));
        self
    }

    pub fn reader<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FakeDbCommand, CommandBehavior) -> FakeDbResult<FakeDbDataReader>
            + Send
            + Sync
            + 'static,
    {
        self.executor.reader = Some(Arc::new(hook));
        self
    }

    pub fn non_query_async<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, u64>
            + Send
            + Sync
            + 'static,
    {
        self.executor.non_query_async = Some(Arc::new(hook));
        self
    }

    pub fn scalar_async<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a FakeDbCommand, CancellationToken) -> HookFuture<'a, DbValue>
            + Send
            + Sync
            + 'static,
    {
        self.executor.scalar_async = Some(Arc::new(hook));
        self
    }

    pub fn reader_async<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a FakeDbCommand, CommandBehavior, CancellationToken) -> HookFuture<'a, FakeDbDataReader>
            + Send
            + Sync
            + 'static,
    {
        self.executor.reader_async = Some(Arc::new(hook));
        self
    }

    /// Install shared async hooks as-is. Used by the harness, which stores
    /// its hooks already type-erased.
    pub(crate) fn async_hooks(
        mut self,
        non_query: Option<NonQueryAsyncHook>,
        scalar: Option<ScalarAsyncHook>,
        reader: Option<ReaderAsyncHook>,
    ) -> Self {
        self.executor.non_query_async = non_query;
        self.executor.scalar_async = scalar;
        self.executor.reader_async = reader;
        self
    }

    pub fn build(self) -> FakeCommandExecutor {
        self.executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FakeDbConnection;
    use crate::db_row;
    use crate::provider::{DbCommand, DbConnection, DbDataReader};

    fn command_for(executor: FakeCommandExecutor) -> FakeDbCommand {
        FakeDbConnection::new("", executor).create_command()
    }

    #[test]
    fn test_unconfigured_slots_name_capability() {
        let executor = FakeCommandExecutor::new();
        let command = command_for(FakeCommandExecutor::new());

        let err = executor.execute_non_query(&command).unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_non_query"));
        let err = executor.execute_scalar(&command).unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_scalar"));
        let err = executor
            .execute_reader(&command, CommandBehavior::DEFAULT)
            .unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_reader"));
    }

    #[tokio::test]
    async fn test_unconfigured_async_slots_name_capability() {
        let executor = FakeCommandExecutor::new();
        let command = command_for(FakeCommandExecutor::new());
        let token = CancellationToken::new();

        let err = executor
            .execute_non_query_async(&command, token.clone())
            .await
            .unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_non_query_async"));
        let err = executor
            .execute_scalar_async(&command, token.clone())
            .await
            .unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_scalar_async"));
        let err = executor
            .execute_reader_async(&command, CommandBehavior::DEFAULT, token)
            .await
            .unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_reader_async"));
    }

    #[test]
    fn test_blocking_hooks_pass_results_through() {
        let reader = FakeDbDataReader::new(["id"], vec![db_row![1]]);
        let returned = reader.clone();
        let executor = FakeCommandExecutor::builder()
            .non_query(|cmd| Ok(cmd.command_text().len() as u64))
            .scalar(|_| Ok(DbValue::from("scalar")))
            .reader(move |_, _| Ok(returned.clone()))
            .build();
        let mut command = command_for(FakeCommandExecutor::new());
        command.set_command_text("DELETE");

        assert_eq!(executor.execute_non_query(&command).unwrap(), 6);
        assert_eq!(executor.execute_scalar(&command).unwrap(), DbValue::from("scalar"));
        let got = executor
            .execute_reader(&command, CommandBehavior::DEFAULT)
            .unwrap();
        assert!(got.ptr_eq(&reader));
    }

    #[test]
    fn test_blocking_call_bridges_to_async_hook() {
        let executor = FakeCommandExecutor::builder()
            .non_query_async(|cmd, _| {
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    Ok(cmd.parameters().len() as u64 + 40)
                })
            })
            .reader_async(|_, behavior, _| {
                Box::pin(async move {
                    assert!(behavior.contains(CommandBehavior::SINGLE_ROW));
                    Ok(FakeDbDataReader::new(["x"], vec![db_row![true]]))
                })
            })
            .build();
        let mut command = command_for(FakeCommandExecutor::new());
        command.parameters_mut().add_with_value("@a", 1);
        command.parameters_mut().add_with_value("@b", 2);

        assert_eq!(executor.execute_non_query(&command).unwrap(), 42);
        let reader = executor
            .execute_reader(&command, CommandBehavior::SINGLE_ROW)
            .unwrap();
        assert!(reader.read());
        assert!(reader.get_bool(0).unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bridge_works_inside_a_runtime() {
        let executor = FakeCommandExecutor::builder()
            .scalar_async(|_, _| Box::pin(async { Ok(DbValue::Int64(7)) }))
            .build();
        let command = command_for(FakeCommandExecutor::new());
        assert_eq!(executor.execute_scalar(&command).unwrap(), DbValue::Int64(7));
    }

    #[tokio::test]
    async fn test_async_dispatch_never_uses_blocking_hook() {
        let executor = FakeCommandExecutor::builder().scalar(|_| Ok(DbValue::Null)).build();
        let command = command_for(FakeCommandExecutor::new());
        let err = executor
            .execute_scalar_async(&command, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.not_implemented_capability(), Some("execute_scalar_async"));
    }

    #[tokio::test]
    async fn test_async_hook_receives_token() {
        let executor = FakeCommandExecutor::builder()
            .non_query_async(|_, cancel| {
                Box::pin(async move {
                    if cancel.is_cancelled() {
                        return Err(FakeDbError::Cancelled);
                    }
                    Ok(1)
                })
            })
            .build();
        let command = command_for(FakeCommandExecutor::new());
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            executor.execute_non_query_async(&command, token).await,
            Err(FakeDbError::Cancelled)
        ));
    }

    #[test]
    fn test_hook_errors_propagate_unchanged() {
        let executor = FakeCommandExecutor::builder()
            .non_query_async(|_, _| {
                Box::pin(async { Err(FakeDbError::hook("unique constraint violated")) })
            })
            .build();
        let command = command_for(FakeCommandExecutor::new());
        let err = executor.execute_non_query(&command).unwrap_err();
        assert_eq!(err.to_string(), "Hook error: unique constraint violated");
    }

    #[test]
    fn test_debug_lists_configured_slots() {
        let executor = FakeCommandExecutor::builder().scalar(|_| Ok(DbValue::Null)).build();
        let debug = format!("{:?}", executor);
        assert!(debug.contains("scalar: true"));
        assert!(debug.contains("reader: false"));
    }
}
