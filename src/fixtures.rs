//! JSON reader fixtures.
//!
//! A fixture names its columns and lists rows of plain JSON values:
//!
//! ```json
//! { "columns": ["id", "name"], "rows": [[1, "a"], [2, null]] }
//! ```

use crate::error::FakeDbResult;
use crate::reader::FakeDbDataReader;
use crate::value::DbValue;
use serde::Deserialize;
use std::path::Path;

/// Column list plus rows, as read from JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReaderFixture {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ReaderFixture {
    pub fn from_json_str(json: &str) -> FakeDbResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> FakeDbResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let fixture = Self::from_json_str(&content)?;
        tracing::debug!(
            "Loaded reader fixture from {} ({} rows)",
            path.display(),
            fixture.rows.len()
        );
        Ok(fixture)
    }

    /// Convert every cell with [`DbValue::from_json`] and build a reader.
    pub fn into_reader(self) -> FakeDbDataReader {
        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().map(DbValue::from_json).collect())
            .collect();
        FakeDbDataReader::new(self.columns, rows)
    }
}

impl From<ReaderFixture> for FakeDbDataReader {
    fn from(fixture: ReaderFixture) -> Self {
        fixture.into_reader()
    }
}

impl FakeDbDataReader {
    /// Reader over a JSON fixture document.
    pub fn from_json(json: &str) -> FakeDbResult<Self> {
        Ok(ReaderFixture::from_json_str(json)?.into_reader())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FakeDbError;
    use crate::provider::DbDataReader;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixture_values() {
        let reader = FakeDbDataReader::from_json(
            r#"{
                "columns": ["id", "total", "name", "big", "active", "tags"],
                "rows": [[1, 9.5, "a", 5000000000, true, ["x"]], [2, 0.25, null, 1, false, {}]]
            }"#,
        )
        .unwrap();

        assert_eq!(reader.field_count(), 6);
        assert!(reader.read());
        assert_eq!(
            reader.current_row().unwrap(),
            vec![
                DbValue::Int32(1),
                DbValue::Double(9.5),
                DbValue::from("a"),
                DbValue::Int64(5_000_000_000),
                DbValue::Bool(true),
                DbValue::from("[\"x\"]"),
            ]
        );
        assert!(reader.read());
        assert!(reader.is_db_null(2).unwrap());
        assert!(!reader.read());
    }

    #[test]
    fn test_rows_default_to_empty() {
        let reader: FakeDbDataReader = ReaderFixture::from_json_str(r#"{"columns": ["id"]}"#)
            .unwrap()
            .into();
        assert!(!reader.has_rows());
        assert_eq!(reader.get_name(0).unwrap(), "id");
    }

    #[test]
    fn test_malformed_fixture() {
        let err = FakeDbDataReader::from_json("{\"rows\": []}").unwrap_err();
        assert!(matches!(err, FakeDbError::Fixture(_)));
        assert!(err.to_string().starts_with("Invalid reader fixture"));
    }
}
