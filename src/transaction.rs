//! Fake transaction.

use crate::connection::FakeDbConnection;
use crate::error::{FakeDbError, FakeDbResult};
use crate::provider::DbTransaction;
use crate::types::IsolationLevel;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Lifecycle of a [`FakeDbTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "active"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Transaction begun through [`DbConnection::begin_transaction`](crate::DbConnection::begin_transaction).
///
/// Completing it (commit, rollback or dispose) clears the connection's active
/// transaction. So does dropping every handle.
#[derive(Debug, Clone)]
pub struct FakeDbTransaction {
    inner: Arc<TransactionInner>,
}

#[derive(Debug)]
struct TransactionInner {
    connection: FakeDbConnection,
    isolation: IsolationLevel,
    state: Mutex<TransactionState>,
    dispose_count: AtomicUsize,
}

/// Non-owning reference kept by the connection.
#[derive(Debug)]
pub(crate) struct WeakTransaction(Weak<TransactionInner>);

impl WeakTransaction {
    pub(crate) fn upgrade(&self) -> Option<FakeDbTransaction> {
        self.0.upgrade().map(|inner| FakeDbTransaction { inner })
    }
}

impl FakeDbTransaction {
    pub(crate) fn new(connection: FakeDbConnection, isolation: IsolationLevel) -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                connection,
                isolation,
                state: Mutex::new(TransactionState::Active),
                dispose_count: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTransaction {
        WeakTransaction(Arc::downgrade(&self.inner))
    }

    /// The connection this transaction was begun on.
    pub fn connection(&self) -> &FakeDbConnection {
        &self.inner.connection
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn state(&self) -> TransactionState {
        *self.state_guard()
    }

    pub fn is_completed(&self) -> bool {
        self.state() != TransactionState::Active
    }

    pub fn dispose_count(&self) -> usize {
        self.inner.dispose_count.load(Ordering::SeqCst)
    }

    /// Roll back if still active, then count the disposal. Disposing twice is allowed.
    pub fn dispose(&self) {
        self.inner.dispose_count.fetch_add(1, Ordering::SeqCst);
        let rolled_back = {
            let mut state = self.state_guard();
            let active = *state == TransactionState::Active;
            if active {
                *state = TransactionState::RolledBack;
            }
            active
        };
        if rolled_back {
            tracing::debug!("Disposed active transaction; rolled back");
            self.inner.connection.release_transaction(self);
        }
    }

    fn state_guard(&self) -> MutexGuard<'_, TransactionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, outcome: TransactionState) -> FakeDbResult<()> {
        {
            let mut state = self.state_guard();
            if *state != TransactionState::Active {
                let message = format!("transaction has already been {}", *state);
                tracing::error!("{}", message);
                return Err(FakeDbError::consistency(message));
            }
            *state = outcome;
        }
        tracing::debug!("Transaction {}", outcome);
        self.inner.connection.release_transaction(self);
        Ok(())
    }
}

impl DbTransaction for FakeDbTransaction {
    fn isolation_level(&self) -> IsolationLevel {
        self.inner.isolation
    }

    fn commit(&self) -> FakeDbResult<()> {
        self.complete(TransactionState::Committed)
    }

    fn rollback(&self) -> FakeDbResult<()> {
        self.complete(TransactionState::RolledBack)
    }
}
