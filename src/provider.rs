//! Data-access contract that production code is written against.
//!
//! The fake types implement these traits, so a repository generic over
//! [`DbConnection`] runs unchanged against [`FakeDbConnection`](crate::FakeDbConnection)
//! in tests. Members that make no sense for a scripted provider are still part
//! of the contract; the fakes answer them with
//! [`FakeDbError::NotImplemented`](crate::FakeDbError::NotImplemented).

use crate::error::FakeDbResult;
use crate::parameter::{FakeDbParameter, FakeDbParameterCollection};
use crate::types::{CommandBehavior, CommandType, ConnectionState, IsolationLevel};
use crate::value::{DbValue, FromDbValue};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A database connection.
pub trait DbConnection: Send + Sync {
    type Command: DbCommand<Transaction = Self::Transaction>;
    type Transaction: DbTransaction;

    fn connection_string(&self) -> String;
    fn database(&self) -> String;
    fn data_source(&self) -> String;
    fn server_version(&self) -> String;
    fn state(&self) -> ConnectionState;

    fn open(&self) -> FakeDbResult<()>;
    fn close(&self);
    fn change_database(&self, name: &str) -> FakeDbResult<()>;

    /// Create a command bound to this connection.
    fn create_command(&self) -> Self::Command;

    /// Begin a transaction; commands must attach it explicitly.
    fn begin_transaction(&self, isolation: IsolationLevel) -> FakeDbResult<Self::Transaction>;
}

/// A transaction started on a [`DbConnection`].
pub trait DbTransaction: Send + Sync {
    fn isolation_level(&self) -> IsolationLevel;
    fn commit(&self) -> FakeDbResult<()>;
    fn rollback(&self) -> FakeDbResult<()>;
}

/// A command: text, parameters, and the six execute operations.
#[async_trait]
pub trait DbCommand: Send + Sync {
    type Reader: DbDataReader;
    type Transaction: DbTransaction;

    fn command_text(&self) -> &str;
    fn set_command_text(&mut self, text: impl Into<String>);
    /// Timeout in seconds.
    fn command_timeout(&self) -> u32;
    fn set_command_timeout(&mut self, seconds: u32);
    fn command_type(&self) -> CommandType;
    fn set_command_type(&mut self, command_type: CommandType);

    fn parameters(&self) -> &FakeDbParameterCollection;
    fn parameters_mut(&mut self) -> &mut FakeDbParameterCollection;
    fn create_parameter(&self) -> FakeDbParameter;

    fn transaction(&self) -> Option<&Self::Transaction>;
    fn set_transaction(&mut self, transaction: Option<Self::Transaction>);

    fn cancel(&self);
    fn prepare(&self);

    /// Execute and return the number of affected rows.
    fn execute_non_query(&self) -> FakeDbResult<u64>;
    /// Execute and return the first column of the first row.
    fn execute_scalar(&self) -> FakeDbResult<DbValue>;
    fn execute_reader(&self, behavior: CommandBehavior) -> FakeDbResult<Self::Reader>;

    async fn execute_non_query_async(&self, cancel: CancellationToken) -> FakeDbResult<u64>;
    async fn execute_scalar_async(&self, cancel: CancellationToken) -> FakeDbResult<DbValue>;
    async fn execute_reader_async(
        &self,
        behavior: CommandBehavior,
        cancel: CancellationToken,
    ) -> FakeDbResult<Self::Reader>;
}

/// A forward-only result-set reader.
///
/// Typed getters cast the stored value exactly; see [`DbValue::cast`].
#[async_trait]
pub trait DbDataReader: Send + Sync {
    /// Advance to the next row; false once the rows are exhausted.
    fn read(&self) -> bool;
    async fn read_async(&self, cancel: CancellationToken) -> FakeDbResult<bool>;

    fn field_count(&self) -> usize;
    fn has_rows(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn records_affected(&self) -> i64;

    fn get_name(&self, ordinal: usize) -> FakeDbResult<&str>;
    fn get_ordinal(&self, name: &str) -> FakeDbResult<usize>;
    fn get_value(&self, ordinal: usize) -> FakeDbResult<DbValue>;
    /// Copy as many columns of the current row as fit into `values`.
    fn get_values(&self, values: &mut [DbValue]) -> FakeDbResult<usize>;

    fn close(&self);

    fn depth(&self) -> FakeDbResult<usize>;
    fn next_result(&self) -> FakeDbResult<bool>;
    fn get_bytes(&self, ordinal: usize, data_offset: usize, buffer: &mut [u8]) -> FakeDbResult<usize>;
    fn get_chars(&self, ordinal: usize, data_offset: usize, buffer: &mut [char]) -> FakeDbResult<usize>;
    fn get_data_type_name(&self, ordinal: usize) -> FakeDbResult<String>;
    fn get_field_type(&self, ordinal: usize) -> FakeDbResult<&'static str>;

    fn get<T: FromDbValue>(&self, ordinal: usize) -> FakeDbResult<T>
    where
        Self: Sized,
    {
        self.get_value(ordinal)?.cast()
    }

    /// Value of the named column in the current row.
    fn get_by_name(&self, name: &str) -> FakeDbResult<DbValue> {
        self.get_value(self.get_ordinal(name)?)
    }

    fn is_db_null(&self, ordinal: usize) -> FakeDbResult<bool> {
        Ok(self.get_value(ordinal)?.is_null())
    }

    fn get_bool(&self, ordinal: usize) -> FakeDbResult<bool> {
        self.get_value(ordinal)?.cast()
    }

    fn get_byte(&self, ordinal: usize) -> FakeDbResult<u8> {
        self.get_value(ordinal)?.cast()
    }

    fn get_char(&self, ordinal: usize) -> FakeDbResult<char> {
        self.get_value(ordinal)?.cast()
    }

    fn get_i16(&self, ordinal: usize) -> FakeDbResult<i16> {
        self.get_value(ordinal)?.cast()
    }

    fn get_i32(&self, ordinal: usize) -> FakeDbResult<i32> {
        self.get_value(ordinal)?.cast()
    }

    fn get_i64(&self, ordinal: usize) -> FakeDbResult<i64> {
        self.get_value(ordinal)?.cast()
    }

    fn get_float(&self, ordinal: usize) -> FakeDbResult<f32> {
        self.get_value(ordinal)?.cast()
    }

    fn get_double(&self, ordinal: usize) -> FakeDbResult<f64> {
        self.get_value(ordinal)?.cast()
    }

    fn get_decimal(&self, ordinal: usize) -> FakeDbResult<Decimal> {
        self.get_value(ordinal)?.cast()
    }

    fn get_string(&self, ordinal: usize) -> FakeDbResult<String> {
        self.get_value(ordinal)?.cast()
    }

    fn get_date_time(&self, ordinal: usize) -> FakeDbResult<NaiveDateTime> {
        self.get_value(ordinal)?.cast()
    }

    fn get_guid(&self, ordinal: usize) -> FakeDbResult<Uuid> {
        self.get_value(ordinal)?.cast()
    }
}
