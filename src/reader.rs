//! Fixed in-memory, forward-only row reader.

use crate::error::{FakeDbError, FakeDbResult};
use crate::provider::DbDataReader;
use crate::value::DbValue;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Reader over a column list and a pre-supplied sequence of rows.
///
/// The reader is a cheap handle: clones share the cursor and the usage
/// counters, so a test can keep one clone, hand another to a hook, and
/// assert on `close_count()` / `dispose_count()` after the code under test
/// is done with it.
///
/// # Example
///
/// ```
/// use qail_fakedb::prelude::*;
///
/// let reader = FakeDbDataReader::new(["id", "name"], vec![db_row![1, "a"]]);
/// assert!(reader.read());
/// assert_eq!(reader.get_i32(0).unwrap(), 1);
/// assert_eq!(reader.get_string(1).unwrap(), "a");
/// assert!(!reader.read());
/// ```
#[derive(Debug, Clone)]
pub struct FakeDbDataReader {
    inner: Arc<ReaderInner>,
}

#[derive(Debug)]
struct ReaderInner {
    columns: Vec<String>,
    rows: Vec<Vec<DbValue>>,
    cursor: Mutex<Cursor>,
    read_count: AtomicUsize,
    read_async_count: AtomicUsize,
    close_count: AtomicUsize,
    dispose_count: AtomicUsize,
    get_i32_count: AtomicUsize,
}

#[derive(Debug, Default)]
struct Cursor {
    row_index: usize,
    current: Option<usize>,
}

impl FakeDbDataReader {
    /// Create a reader. Row length is expected to match the column count but
    /// is not checked.
    pub fn new<I, S>(columns: I, rows: Vec<Vec<DbValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(ReaderInner {
                columns: columns.into_iter().map(Into::into).collect(),
                rows,
                cursor: Mutex::new(Cursor::default()),
                read_count: AtomicUsize::new(0),
                read_async_count: AtomicUsize::new(0),
                close_count: AtomicUsize::new(0),
                dispose_count: AtomicUsize::new(0),
                get_i32_count: AtomicUsize::new(0),
            }),
        }
    }

    /// A reader with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new(), Vec::new())
    }

    /// True if both handles refer to the same reader.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn columns(&self) -> &[String] {
        &self.inner.columns
    }

    /// All supplied rows, independent of the cursor.
    pub fn rows(&self) -> impl Iterator<Item = &[DbValue]> {
        self.inner.rows.iter().map(Vec::as_slice)
    }

    /// Number of rows consumed so far.
    pub fn row_index(&self) -> usize {
        self.cursor().row_index
    }

    /// Copy of the row under the cursor, if any.
    pub fn current_row(&self) -> Option<Vec<DbValue>> {
        self.cursor().current.map(|i| self.inner.rows[i].clone())
    }

    pub fn read_count(&self) -> usize {
        self.inner.read_count.load(Ordering::SeqCst)
    }

    pub fn read_async_count(&self) -> usize {
        self.inner.read_async_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.close_count.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.inner.dispose_count.load(Ordering::SeqCst)
    }

    pub fn get_i32_count(&self) -> usize {
        self.inner.get_i32_count.load(Ordering::SeqCst)
    }

    /// Count the disposal and close the reader. Repeated calls are legal.
    pub fn dispose(&self) {
        self.inner.dispose_count.fetch_add(1, Ordering::SeqCst);
        self.close();
    }

    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.inner
            .cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self) -> bool {
        let mut cursor = self.cursor();
        if cursor.row_index < self.inner.rows.len() {
            cursor.current = Some(cursor.row_index);
            cursor.row_index += 1;
        } else {
            cursor.current = None;
        }
        cursor.current.is_some()
    }

    fn with_current_row<T>(&self, f: impl FnOnce(&[DbValue]) -> FakeDbResult<T>) -> FakeDbResult<T> {
        let cursor = self.cursor();
        let index = cursor.current.ok_or(FakeDbError::NoCurrentRow)?;
        f(&self.inner.rows[index])
    }

    fn column_out_of_range(&self, ordinal: usize) -> FakeDbError {
        FakeDbError::IndexOutOfRange {
            index: ordinal,
            count: self.inner.columns.len(),
        }
    }
}

#[async_trait]
impl DbDataReader for FakeDbDataReader {
    fn read(&self) -> bool {
        self.inner.read_count.fetch_add(1, Ordering::SeqCst);
        self.advance()
    }

    async fn read_async(&self, _cancel: CancellationToken) -> FakeDbResult<bool> {
        self.inner.read_async_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.advance())
    }

    fn field_count(&self) -> usize {
        self.inner.columns.len()
    }

    fn has_rows(&self) -> bool {
        !self.inner.rows.is_empty()
    }

    fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    fn records_affected(&self) -> i64 {
        0
    }

    fn get_name(&self, ordinal: usize) -> FakeDbResult<&str> {
        self.inner
            .columns
            .get(ordinal)
            .map(String::as_str)
            .ok_or_else(|| self.column_out_of_range(ordinal))
    }

    fn get_ordinal(&self, name: &str) -> FakeDbResult<usize> {
        self.inner
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FakeDbError::UnknownColumn {
                name: name.to_string(),
                available: self.inner.columns.clone(),
            })
    }

    fn get_value(&self, ordinal: usize) -> FakeDbResult<DbValue> {
        self.with_current_row(|row| {
            row.get(ordinal).cloned().ok_or(FakeDbError::IndexOutOfRange {
                index: ordinal,
                count: row.len(),
            })
        })
    }

    fn get_values(&self, values: &mut [DbValue]) -> FakeDbResult<usize> {
        self.with_current_row(|row| {
            let copied = row.len().min(values.len());
            values[..copied].clone_from_slice(&row[..copied]);
            Ok(copied)
        })
    }

    fn get_i32(&self, ordinal: usize) -> FakeDbResult<i32> {
        self.inner.get_i32_count.fetch_add(1, Ordering::SeqCst);
        self.get_value(ordinal)?.cast()
    }

    fn close(&self) {
        self.inner.close_count.fetch_add(1, Ordering::SeqCst);
    }

    // A fixed in-memory row set has no nesting, no further result sets and
    // no streaming or schema metadata.

    fn depth(&self) -> FakeDbResult<usize> {
        Err(FakeDbError::NotImplemented("depth"))
    }

    fn next_result(&self) -> FakeDbResult<bool> {
        Err(FakeDbError::NotImplemented("next_result"))
    }

    fn get_bytes(&self, _ordinal: usize, _data_offset: usize, _buffer: &mut [u8]) -> FakeDbResult<usize> {
        Err(FakeDbError::NotImplemented("get_bytes"))
    }

    fn get_chars(&self, _ordinal: usize, _data_offset: usize, _buffer: &mut [char]) -> FakeDbResult<usize> {
        Err(FakeDbError::NotImplemented("get_chars"))
    }

    fn get_data_type_name(&self, _ordinal: usize) -> FakeDbResult<String> {
        Err(FakeDbError::NotImplemented("get_data_type_name"))
    }

    fn get_field_type(&self, _ordinal: usize) -> FakeDbResult<&'static str> {
        Err(FakeDbError::NotImplemented("get_field_type"))
    }
}
