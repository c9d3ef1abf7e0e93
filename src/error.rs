//! Error types for the fake provider.

use thiserror::Error;

/// The main error type for fake database operations.
#[derive(Debug, Error)]
pub enum FakeDbError {
    /// A capability was invoked that the test never configured, or that a
    /// fixed in-memory row set cannot provide.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// A hook was assigned after the connection had been handed out.
    #[error("Once Connection is accessed, the {property} hook is locked")]
    ConfigurationLocked { property: &'static str },

    /// Command, connection and transaction disagree about the active transaction.
    #[error("Transaction consistency violation: {0}")]
    ConsistencyViolation(String),

    /// Column lookup by name failed.
    #[error("Column {name} does not exist in the list of columns {}", .available.join(", "))]
    UnknownColumn {
        name: String,
        available: Vec<String>,
    },

    /// Parameter lookup by name failed.
    #[error("Parameter {name} does not exist in the list of parameters {}", .available.join(", "))]
    UnknownParameter {
        name: String,
        available: Vec<String>,
    },

    /// Ordinal or position outside the collection.
    #[error("Index {index} is out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Column access while the reader is not positioned on a row.
    #[error("No current row: call read() first, or the reader is exhausted")]
    NoCurrentRow,

    /// Typed accessor asked for a type the stored value does not have.
    #[error("Unable to cast value of type {actual} to type {expected}")]
    TypeCast {
        expected: &'static str,
        actual: &'static str,
    },

    /// The operation observed its cancellation token.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Failure fabricated by a test hook.
    #[error("Hook error: {0}")]
    Hook(#[from] anyhow::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reader fixture could not be parsed.
    #[error("Invalid reader fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FakeDbError {
    /// Create a consistency violation error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::ConsistencyViolation(message.into())
    }

    /// Create a hook error from any displayable message.
    pub fn hook(message: impl std::fmt::Display) -> Self {
        Self::Hook(anyhow::anyhow!("{}", message))
    }

    /// Name of the capability, if this is a not-implemented error.
    pub fn not_implemented_capability(&self) -> Option<&'static str> {
        match self {
            Self::NotImplemented(capability) => Some(capability),
            _ => None,
        }
    }
}

/// Result type alias for fake database operations.
pub type FakeDbResult<T> = Result<T, FakeDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FakeDbError::NotImplemented("execute_scalar");
        assert_eq!(err.to_string(), "execute_scalar is not implemented");

        let err = FakeDbError::ConfigurationLocked {
            property: "execute_reader_async",
        };
        assert_eq!(
            err.to_string(),
            "Once Connection is accessed, the execute_reader_async hook is locked"
        );
    }

    #[test]
    fn test_unknown_column_lists_available() {
        let err = FakeDbError::UnknownColumn {
            name: "missing".to_string(),
            available: vec!["id".to_string(), "name".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Column missing does not exist in the list of columns id, name"
        );
    }

    #[test]
    fn test_hook_error_from_anyhow() {
        fn failing() -> FakeDbResult<u64> {
            Err(anyhow::anyhow!("deadlock victim"))?
        }
        let err = failing().unwrap_err();
        assert_eq!(err.to_string(), "Hook error: deadlock victim");
        assert_eq!(err.not_implemented_capability(), None);
    }
}
