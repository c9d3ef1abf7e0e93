//! # qail-fakedb: scriptable fake database provider
//!
//! > **Stop mocking drivers. Hook your commands.**
//!
//! Code written against the [`DbConnection`] / [`DbCommand`] / [`DbDataReader`]
//! traits runs unchanged against an in-memory fake whose behavior each test
//! scripts with hooks. No database, no network.
//!
//! ## Quick Example
//!
//! ```rust
//! use qail_fakedb::prelude::*;
//!
//! let mut harness = FakeDbHarness::new();
//! harness
//!     .set_execute_reader_async(|command, _, _| {
//!         let id = command.parameters().get_named("@id").map(|p| p.value.clone());
//!         Box::pin(async move {
//!             Ok(FakeDbDataReader::new(["id", "name"], vec![db_row![id?, "alice"]]))
//!         })
//!     })
//!     .unwrap();
//!
//! let mut command = harness.connection().create_command();
//! command.set_command_text("SELECT id, name FROM users WHERE id = @id");
//! command.parameters_mut().add_with_value("@id", 7);
//!
//! let reader = command.execute_reader(CommandBehavior::DEFAULT).unwrap();
//! assert!(reader.read());
//! assert_eq!(reader.get_i32(0).unwrap(), 7);
//! assert_eq!(reader.get_string(1).unwrap(), "alice");
//! ```
//!
//! ## Pieces
//!
//! | Type                   | Role                                          |
//! |------------------------|-----------------------------------------------|
//! | [`FakeDbHarness`]      | Owns hooks; locks on first connection access  |
//! | [`FakeCommandExecutor`]| Routes executions to hooks                    |
//! | [`FakeDbConnection`]   | Connection state and active transaction       |
//! | [`FakeDbCommand`]      | Text, parameters, transaction check           |
//! | [`FakeDbDataReader`]   | Forward-only reader over fixed rows           |

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod fixtures;
pub mod harness;
pub mod parameter;
pub mod provider;
pub mod reader;
pub mod transaction;
pub mod types;
pub mod value;

pub use command::FakeDbCommand;
pub use config::{FakeDbConfig, FakeDbConfigBuilder};
pub use connection::FakeDbConnection;
pub use error::{FakeDbError, FakeDbResult};
pub use executor::{FakeCommandExecutor, FakeCommandExecutorBuilder, HookFuture};
pub use fixtures::ReaderFixture;
pub use harness::FakeDbHarness;
pub use parameter::{FakeDbParameter, FakeDbParameterCollection};
pub use provider::{DbCommand, DbConnection, DbDataReader, DbTransaction};
pub use reader::FakeDbDataReader;
pub use transaction::{FakeDbTransaction, TransactionState};
pub use types::{CommandBehavior, CommandType, ConnectionState, IsolationLevel, ParameterDirection};
pub use value::{DbValue, FromDbValue};

pub mod prelude {
    pub use crate::db_row;
    pub use crate::error::*;
    pub use crate::executor::{FakeCommandExecutor, HookFuture};
    pub use crate::harness::FakeDbHarness;
    pub use crate::parameter::{FakeDbParameter, FakeDbParameterCollection};
    pub use crate::provider::{DbCommand, DbConnection, DbDataReader, DbTransaction};
    pub use crate::reader::FakeDbDataReader;
    pub use crate::types::*;
    pub use crate::value::DbValue;
    pub use crate::{FakeDbCommand, FakeDbConfig, FakeDbConnection, FakeDbTransaction};
    pub use tokio_util::sync::CancellationToken;
}
