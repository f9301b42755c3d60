//! Remote table access.
//!
//! A [`TableGateway`] finds the workbook by display name and reads or writes
//! its tables. It is stateless between calls: the credential is passed every
//! time and row positions are trusted as given.
//!
//! Two implementations ship with the crate:
//! - [`GraphGateway`] (feature `http-client`): workbook endpoints over HTTP.
//! - [`InMemoryGateway`]: tables held in memory, for tests and demos.

#[cfg(feature = "http-client")]
mod graph;
mod memory;

#[cfg(feature = "http-client")]
pub use graph::GraphGateway;
pub use memory::{InMemoryGateway, WriteRecord};

use async_trait::async_trait;

use crate::auth::BearerToken;
use crate::error::Result;
use crate::types::{CellValue, RawRow, TableRow};

/// Opaque identifier of the backing workbook.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    /// Drive item id.
    pub id: String,
}

impl FileHandle {
    /// Wraps a drive item id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Workbook table operations.
#[async_trait]
pub trait TableGateway: Send + Sync {
    /// Finds the workbook named `display_name` in the drive root.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when there is
    /// no match; the first match wins when there are several.
    async fn resolve_file_handle(
        &self,
        credential: &BearerToken,
        display_name: &str,
    ) -> Result<FileHandle>;

    /// All data rows of `table`, in table order.
    async fn fetch_table_rows(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<Vec<TableRow>>;

    /// The header row of `table`.
    async fn fetch_header_row(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<RawRow>;

    /// The data row at `index`.
    async fn fetch_row(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        index: usize,
    ) -> Result<TableRow>;

    /// Overwrites one cell of one data row.
    async fn patch_cell(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        row_index: usize,
        column_index: usize,
        value: CellValue,
    ) -> Result<()>;
}
