//! Small tag types shared by commands, connections and parameters.

use std::ops::{BitOr, BitOrAssign};

/// How a command's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
    TableDirect,
}

/// Open/closed state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open,
}

/// Transaction isolation level requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Unspecified,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Reader behavior flags passed through to reader hooks.
///
/// Flags combine with `|`; the fake never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CommandBehavior(u32);

impl CommandBehavior {
    pub const DEFAULT: Self = Self(0);
    pub const SINGLE_RESULT: Self = Self(0x01);
    pub const SCHEMA_ONLY: Self = Self(0x02);
    pub const KEY_INFO: Self = Self(0x04);
    pub const SINGLE_ROW: Self = Self(0x08);
    pub const SEQUENTIAL_ACCESS: Self = Self(0x10);
    pub const CLOSE_CONNECTION: Self = Self(0x20);

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every flag in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CommandBehavior {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CommandBehavior {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
