//! Dynamic values carried by parameters, scalars and reader rows.

use crate::error::{FakeDbError, FakeDbResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Dynamic value type for rows, scalars and parameter values.
///
/// Typed reader accessors only succeed on the exact variant they ask for:
/// an `Int64` is not readable through `get_i32`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DbValue {
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Char(char),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    Bytes(Vec<u8>),
}

impl DbValue {
    /// Name of the stored type, used in cast errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            DbValue::Null => "Null",
            DbValue::Bool(_) => "Bool",
            DbValue::Byte(_) => "Byte",
            DbValue::Char(_) => "Char",
            DbValue::Int16(_) => "Int16",
            DbValue::Int32(_) => "Int32",
            DbValue::Int64(_) => "Int64",
            DbValue::Float(_) => "Float",
            DbValue::Double(_) => "Double",
            DbValue::Decimal(_) => "Decimal",
            DbValue::String(_) => "String",
            DbValue::DateTime(_) => "DateTime",
            DbValue::Guid(_) => "Guid",
            DbValue::Bytes(_) => "Bytes",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Cast to `T`, failing with [`FakeDbError::TypeCast`] on any other variant.
    pub fn cast<T: FromDbValue>(self) -> FakeDbResult<T> {
        let actual = self.type_name();
        T::from_db_value(self).ok_or(FakeDbError::TypeCast {
            expected: T::TYPE_NAME,
            actual,
        })
    }

    /// Convert a JSON value the way reader fixtures do.
    ///
    /// Integers become `Int32` when they fit, `Int64` otherwise; other numbers
    /// become `Double`. Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DbValue::Null,
            serde_json::Value::Bool(b) => DbValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i)
                        .map(DbValue::Int32)
                        .unwrap_or(DbValue::Int64(i))
                } else {
                    n.as_f64().map(DbValue::Double).unwrap_or(DbValue::Null)
                }
            }
            serde_json::Value::String(s) => DbValue::String(s.clone()),
            other => DbValue::String(other.to_string()),
        }
    }
}

impl std::fmt::Display for DbValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(v) => write!(f, "{}", v),
            DbValue::Byte(v) => write!(f, "{}", v),
            DbValue::Char(v) => write!(f, "{}", v),
            DbValue::Int16(v) => write!(f, "{}", v),
            DbValue::Int32(v) => write!(f, "{}", v),
            DbValue::Int64(v) => write!(f, "{}", v),
            DbValue::Float(v) => write!(f, "{}", v),
            DbValue::Double(v) => write!(f, "{}", v),
            DbValue::Decimal(v) => write!(f, "{}", v),
            DbValue::String(v) => write!(f, "{}", v),
            DbValue::DateTime(v) => write!(f, "{}", v),
            DbValue::Guid(v) => write!(f, "{}", v),
            DbValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Exact-variant extraction from a [`DbValue`].
pub trait FromDbValue: Sized {
    /// Type name reported in cast errors.
    const TYPE_NAME: &'static str;

    /// Extract the value, or `None` if the variant does not match.
    fn from_db_value(value: DbValue) -> Option<Self>;
}

macro_rules! db_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DbValue {
                fn from(v: $ty) -> Self {
                    DbValue::$variant(v)
                }
            }

            impl FromDbValue for $ty {
                const TYPE_NAME: &'static str = stringify!($variant);

                fn from_db_value(value: DbValue) -> Option<Self> {
                    match value {
                        DbValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

db_value_conversions! {
    bool => Bool,
    u8 => Byte,
    char => Char,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    NaiveDateTime => DateTime,
    Uuid => Guid,
    Vec<u8> => Bytes,
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::String(v.to_string())
    }
}

impl From<&[u8]> for DbValue {
    fn from(v: &[u8]) -> Self {
        DbValue::Bytes(v.to_vec())
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DbValue::Null)
    }
}

impl FromDbValue for DbValue {
    const TYPE_NAME: &'static str = "Value";

    fn from_db_value(value: DbValue) -> Option<Self> {
        Some(value)
    }
}

/// Build a row of [`DbValue`]s from heterogeneous expressions.
///
/// ```
/// use qail_fakedb::{db_row, DbValue};
///
/// let row = db_row![1, "a", None::<i64>];
/// assert_eq!(row, vec![DbValue::Int32(1), DbValue::from("a"), DbValue::Null]);
/// ```
#[macro_export]
macro_rules! db_row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::DbValue::from($value)),*]
    };
}
