//! In-memory workbook for tests and demos.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{FileHandle, TableGateway};
use crate::auth::BearerToken;
use crate::error::{Error, Result};
use crate::types::{CellValue, RawRow, TableRow};

/// One successful [`TableGateway::patch_cell`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    /// Table written to.
    pub table: String,
    /// Data row index.
    pub row_index: usize,
    /// Column index.
    pub column_index: usize,
    /// Value written.
    pub value: CellValue,
}

#[derive(Debug, Default)]
struct Table {
    header: RawRow,
    rows: Vec<RawRow>,
}

#[derive(Debug, Default)]
struct Workbook {
    tables: HashMap<String, Table>,
    writes: Vec<WriteRecord>,
    fail_next_read: Option<Error>,
    fail_next_write: Option<Error>,
}

/// [`TableGateway`] over tables held in memory.
///
/// Rows can be inserted or removed behind the caller's back to simulate
/// concurrent edits by other users, and the next read or write can be made to
/// fail.
///
/// # Examples
///
/// ```
/// use limit_pacer::gateway::InMemoryGateway;
/// use limit_pacer::CellValue;
///
/// let gateway = InMemoryGateway::new("limit-pacer.xlsx")
///     .with_table("Start_Tasks", vec![], vec![vec![CellValue::text("101")]]);
/// gateway.insert_row_at("Start_Tasks", 0, vec![CellValue::text("100")]);
/// assert_eq!(gateway.rows("Start_Tasks").len(), 2);
/// ```
#[derive(Debug)]
pub struct InMemoryGateway {
    file_name: String,
    file_id: String,
    inner: Mutex<Workbook>,
}

impl InMemoryGateway {
    /// Empty workbook with the given display name.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_id: "in-memory-workbook".to_string(),
            inner: Mutex::new(Workbook::default()),
        }
    }

    /// Adds or replaces a table.
    pub fn with_table(self, name: impl Into<String>, header: RawRow, rows: Vec<RawRow>) -> Self {
        self.inner
            .lock()
            .tables
            .insert(name.into(), Table { header, rows });
        self
    }

    /// Handle that [`resolve_file_handle`](TableGateway::resolve_file_handle)
    /// returns.
    pub fn handle(&self) -> FileHandle {
        FileHandle::new(self.file_id.clone())
    }

    /// Inserts a data row at `index`, shifting later rows down.
    pub fn insert_row_at(&self, table: &str, index: usize, row: RawRow) {
        let mut inner = self.inner.lock();
        let rows = &mut inner.tables.entry(table.to_string()).or_default().rows;
        let index = index.min(rows.len());
        rows.insert(index, row);
    }

    /// Removes the data row at `index`, if present.
    pub fn remove_row(&self, table: &str, index: usize) -> Option<RawRow> {
        let mut inner = self.inner.lock();
        let rows = &mut inner.tables.get_mut(table)?.rows;
        (index < rows.len()).then(|| rows.remove(index))
    }

    /// Current data rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<RawRow> {
        self.inner
            .lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Current value of one cell.
    pub fn cell(&self, table: &str, row_index: usize, column_index: usize) -> CellValue {
        self.inner
            .lock()
            .tables
            .get(table)
            .and_then(|t| t.rows.get(row_index))
            .and_then(|row| row.get(column_index))
            .cloned()
            .unwrap_or_default()
    }

    /// Every successful write so far.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Makes the next read fail with `error`.
    pub fn fail_next_read(&self, error: Error) {
        self.inner.lock().fail_next_read = Some(error);
    }

    /// Makes the next write fail with `error`.
    pub fn fail_next_write(&self, error: Error) {
        self.inner.lock().fail_next_write = Some(error);
    }

    fn check_handle(&self, handle: &FileHandle) -> Result<()> {
        if handle.id == self.file_id {
            Ok(())
        } else {
            Err(Error::RemoteRead {
                resource: format!("workbook '{}'", handle.id),
                status: Some(404),
                detail: "itemNotFound".to_string(),
            })
        }
    }

    fn take_read_failure(&self) -> Result<()> {
        match self.inner.lock().fail_next_read.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_table<T>(&self, table: &str, f: impl FnOnce(&Table) -> Result<T>) -> Result<T> {
        let inner = self.inner.lock();
        let found = inner.tables.get(table).ok_or_else(|| Error::RemoteRead {
            resource: format!("table '{table}'"),
            status: Some(404),
            detail: "ItemNotFound".to_string(),
        })?;
        f(found)
    }
}

#[async_trait]
impl TableGateway for InMemoryGateway {
    async fn resolve_file_handle(
        &self,
        _credential: &BearerToken,
        display_name: &str,
    ) -> Result<FileHandle> {
        self.take_read_failure()?;
        if display_name == self.file_name {
            Ok(self.handle())
        } else {
            Err(Error::NotFound {
                file_name: display_name.to_string(),
            })
        }
    }

    async fn fetch_table_rows(
        &self,
        _credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<Vec<TableRow>> {
        self.check_handle(handle)?;
        self.take_read_failure()?;
        self.read_table(table, |t| {
            Ok(t.rows
                .iter()
                .enumerate()
                .map(|(index, cells)| TableRow::new(index, cells.clone()))
                .collect())
        })
    }

    async fn fetch_header_row(
        &self,
        _credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<RawRow> {
        self.check_handle(handle)?;
        self.take_read_failure()?;
        self.read_table(table, |t| Ok(t.header.clone()))
    }

    async fn fetch_row(
        &self,
        _credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        index: usize,
    ) -> Result<TableRow> {
        self.check_handle(handle)?;
        self.take_read_failure()?;
        self.read_table(table, |t| {
            t.rows
                .get(index)
                .map(|cells| TableRow::new(index, cells.clone()))
                .ok_or_else(|| Error::RemoteRead {
                    resource: format!("row {index} of '{table}'"),
                    status: Some(400),
                    detail: "row index out of range".to_string(),
                })
        })
    }

    async fn patch_cell(
        &self,
        _credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        row_index: usize,
        column_index: usize,
        value: CellValue,
    ) -> Result<()> {
        self.check_handle(handle)?;
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next_write.take() {
            return Err(err);
        }
        let resource = format!("cell (row {row_index}, column {column_index}) of '{table}'");
        let row = inner
            .tables
            .get_mut(table)
            .and_then(|t| t.rows.get_mut(row_index))
            .ok_or_else(|| Error::RemoteWrite {
                resource,
                status: Some(400),
                detail: "row index out of range".to_string(),
            })?;
        if row.len() <= column_index {
            row.resize(column_index + 1, CellValue::Empty);
        }
        row[column_index] = value.clone();
        inner.writes.push(WriteRecord {
            table: table.to_string(),
            row_index,
            column_index,
            value,
        });
        Ok(())
    }
}
