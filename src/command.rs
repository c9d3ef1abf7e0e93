//! Fake command.

use crate::connection::FakeDbConnection;
use crate::error::{FakeDbError, FakeDbResult};
use crate::parameter::{FakeDbParameter, FakeDbParameterCollection};
use crate::provider::DbCommand;
use crate::reader::FakeDbDataReader;
use crate::transaction::FakeDbTransaction;
use crate::types::{CommandBehavior, CommandType};
use crate::value::DbValue;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Length of the command-text excerpt written to debug logs.
const LOG_TEXT_LEN: usize = 50;

/// Command bound to a [`FakeDbConnection`].
///
/// Every execute operation checks that the attached transaction agrees with
/// the connection, then hands the command to the connection's
/// [`FakeCommandExecutor`](crate::FakeCommandExecutor) and returns whatever
/// the hook produced.
#[derive(Debug, Clone)]
pub struct FakeDbCommand {
    connection: FakeDbConnection,
    transaction: Option<FakeDbTransaction>,
    command_text: String,
    command_timeout: u32,
    command_type: CommandType,
    parameters: FakeDbParameterCollection,
    dispose_count: usize,
}

impl FakeDbCommand {
    pub fn new(connection: &FakeDbConnection) -> Self {
        Self {
            connection: connection.clone(),
            transaction: None,
            command_text: String::new(),
            command_timeout: connection.default_command_timeout(),
            command_type: CommandType::default(),
            parameters: FakeDbParameterCollection::new(),
            dispose_count: 0,
        }
    }

    pub fn connection(&self) -> &FakeDbConnection {
        &self.connection
    }

    /// Rebind the command; the default timeout is kept.
    pub fn set_connection(&mut self, connection: FakeDbConnection) {
        self.connection = connection;
    }

    pub fn dispose(&mut self) {
        self.dispose_count += 1;
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count
    }

    /// Fail unless command, transaction and connection agree.
    fn check_transaction(&self) -> FakeDbResult<()> {
        let violation = match &self.transaction {
            None => self
                .connection
                .active_transaction()
                .map(|_| "connection has an active transaction the command does not use".to_string()),
            Some(tx) if !tx.connection().ptr_eq(&self.connection) => {
                Some("command transaction belongs to a different connection".to_string())
            }
            Some(tx) if tx.dispose_count() > 0 => {
                Some("command transaction has been disposed".to_string())
            }
            Some(tx) if tx.is_completed() => {
                Some(format!("command transaction has already been {}", tx.state()))
            }
            Some(_) => None,
        };
        match violation {
            Some(message) => {
                tracing::error!("{} ({})", message, self.log_text());
                Err(FakeDbError::consistency(message))
            }
            None => Ok(()),
        }
    }

    fn log_text(&self) -> String {
        self.command_text
            .chars()
            .take(LOG_TEXT_LEN)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl DbCommand for FakeDbCommand {
    type Reader = FakeDbDataReader;
    type Transaction = FakeDbTransaction;

    fn command_text(&self) -> &str {
        &self.command_text
    }

    fn set_command_text(&mut self, text: impl Into<String>) {
        self.command_text = text.into();
    }

    fn command_timeout(&self) -> u32 {
        self.command_timeout
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.command_timeout = seconds;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn parameters(&self) -> &FakeDbParameterCollection {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut FakeDbParameterCollection {
        &mut self.parameters
    }

    fn create_parameter(&self) -> FakeDbParameter {
        FakeDbParameter::default()
    }

    fn transaction(&self) -> Option<&FakeDbTransaction> {
        self.transaction.as_ref()
    }

    fn set_transaction(&mut self, transaction: Option<FakeDbTransaction>) {
        self.transaction = transaction;
    }

    fn cancel(&self) {
        tracing::debug!("Cancel requested for command: {}", self.log_text());
    }

    fn prepare(&self) {
        tracing::debug!("Prepare requested for command: {}", self.log_text());
    }

    fn execute_non_query(&self) -> FakeDbResult<u64> {
        self.check_transaction()?;
        self.connection.executor().execute_non_query(self)
    }

    fn execute_scalar(&self) -> FakeDbResult<DbValue> {
        self.check_transaction()?;
        self.connection.executor().execute_scalar(self)
    }

    fn execute_reader(&self, behavior: CommandBehavior) -> FakeDbResult<FakeDbDataReader> {
        self.check_transaction()?;
        self.connection.executor().execute_reader(self, behavior)
    }

    async fn execute_non_query_async(&self, cancel: CancellationToken) -> FakeDbResult<u64> {
        self.check_transaction()?;
        self.connection
            .executor()
            .execute_non_query_async(self, cancel)
            .await
    }

    async fn execute_scalar_async(&self, cancel: CancellationToken) -> FakeDbResult<DbValue> {
        self.check_transaction()?;
        self.connection
            .executor()
            .execute_scalar_async(self, cancel)
            .await
    }

    async fn execute_reader_async(
        &self,
        behavior: CommandBehavior,
        cancel: CancellationToken,
    ) -> FakeDbResult<FakeDbDataReader> {
        self.check_transaction()?;
        self.connection
            .executor()
            .execute_reader_async(self, behavior, cancel)
            .await
    }
}

impl Default for FakeDbCommand {
    /// A command on a fresh connection with no hooks.
    fn default() -> Self {
        Self::new(&FakeDbConnection::new("", Default::default()))
    }
}
