//! Fake connection.

use crate::command::FakeDbCommand;
use crate::config::FakeDbConfig;
use crate::error::{FakeDbError, FakeDbResult};
use crate::executor::FakeCommandExecutor;
use crate::provider::{DbConnection, DbTransaction};
use crate::transaction::{FakeDbTransaction, WeakTransaction};
use crate::types::{ConnectionState, IsolationLevel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Stand-in connection that hands out commands bound to a
/// [`FakeCommandExecutor`] and tracks the active transaction.
///
/// Clones share state; compare handles with [`FakeDbConnection::ptr_eq`].
#[derive(Debug, Clone)]
pub struct FakeDbConnection {
    inner: Arc<ConnectionInner>,
}

#[derive(Debug)]
struct ConnectionInner {
    connection_string: String,
    data_source: String,
    server_version: String,
    command_timeout: u32,
    executor: FakeCommandExecutor,
    database: Mutex<String>,
    state: Mutex<ConnectionState>,
    active_transaction: Mutex<Option<WeakTransaction>>,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
    dispose_count: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeDbConnection {
    /// Connection with default configuration and the given connection string.
    pub fn new(connection_string: impl Into<String>, executor: FakeCommandExecutor) -> Self {
        let config = FakeDbConfig::builder()
            .connection_string(connection_string)
            .build();
        Self::with_config(&config, executor)
    }

    pub fn with_config(config: &FakeDbConfig, executor: FakeCommandExecutor) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                connection_string: config.connection_string.clone(),
                data_source: config.data_source.clone(),
                server_version: config.server_version.clone(),
                command_timeout: config.command_timeout,
                executor,
                database: Mutex::new(config.database.clone()),
                state: Mutex::new(ConnectionState::Closed),
                active_transaction: Mutex::new(None),
                open_count: AtomicUsize::new(0),
                close_count: AtomicUsize::new(0),
                dispose_count: AtomicUsize::new(0),
            }),
        }
    }

    /// The router every command of this connection executes through.
    pub fn executor(&self) -> &FakeCommandExecutor {
        &self.inner.executor
    }

    /// Timeout in seconds given to new commands.
    pub fn default_command_timeout(&self) -> u32 {
        self.inner.command_timeout
    }

    /// True if both handles refer to the same connection.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The uncompleted transaction begun on this connection, if any.
    pub fn active_transaction(&self) -> Option<FakeDbTransaction> {
        lock(&self.inner.active_transaction)
            .as_ref()
            .and_then(WeakTransaction::upgrade)
            .filter(|tx| !tx.is_completed())
    }

    /// Forget `transaction` if it is the active one.
    pub(crate) fn release_transaction(&self, transaction: &FakeDbTransaction) {
        let mut active = lock(&self.inner.active_transaction);
        let is_active = active
            .as_ref()
            .and_then(WeakTransaction::upgrade)
            .is_some_and(|tx| tx.ptr_eq(transaction));
        if is_active {
            *active = None;
        }
    }

    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.close_count.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.inner.dispose_count.load(Ordering::SeqCst)
    }

    /// Roll back any active transaction, close, and count the disposal.
    pub fn dispose(&self) {
        self.inner.dispose_count.fetch_add(1, Ordering::SeqCst);
        if let Some(transaction) = self.active_transaction() {
            if let Err(e) = transaction.rollback() {
                tracing::warn!("Rollback on dispose failed: {}", e);
            }
        }
        self.close();
    }
}

impl DbConnection for FakeDbConnection {
    type Command = FakeDbCommand;
    type Transaction = FakeDbTransaction;

    fn connection_string(&self) -> String {
        self.inner.connection_string.clone()
    }

    fn database(&self) -> String {
        lock(&self.inner.database).clone()
    }

    fn data_source(&self) -> String {
        self.inner.data_source.clone()
    }

    fn server_version(&self) -> String {
        self.inner.server_version.clone()
    }

    fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    fn open(&self) -> FakeDbResult<()> {
        let mut state = lock(&self.inner.state);
        if *state == ConnectionState::Open {
            return Err(FakeDbError::consistency("connection is already open"));
        }
        *state = ConnectionState::Open;
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Opened fake connection to {}", self.inner.data_source);
        Ok(())
    }

    fn close(&self) {
        *lock(&self.inner.state) = ConnectionState::Closed;
        self.inner.close_count.fetch_add(1, Ordering::SeqCst);
    }

    fn change_database(&self, name: &str) -> FakeDbResult<()> {
        *lock(&self.inner.database) = name.to_string();
        Ok(())
    }

    fn create_command(&self) -> FakeDbCommand {
        FakeDbCommand::new(self)
    }

    fn begin_transaction(&self, isolation: IsolationLevel) -> FakeDbResult<FakeDbTransaction> {
        let mut active = lock(&self.inner.active_transaction);
        let in_progress = active
            .as_ref()
            .and_then(WeakTransaction::upgrade)
            .is_some_and(|tx| !tx.is_completed());
        if in_progress {
            return Err(FakeDbError::consistency(
                "connection already has an active transaction",
            ));
        }
        let transaction = FakeDbTransaction::new(self.clone(), isolation);
        *active = Some(transaction.downgrade());
        tracing::debug!("Began transaction with isolation {:?}", isolation);
        Ok(transaction)
    }
}
