//! Workbook tables over the Graph HTTP API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{FileHandle, TableGateway};
use crate::auth::BearerToken;
use crate::config::PacerConfig;
use crate::error::{Error, Result};
use crate::types::{CellValue, RawRow, TableRow};

/// [`TableGateway`] backed by the Graph workbook endpoints.
///
/// Holds only the HTTP client and the API base URL.
#[derive(Debug, Clone)]
pub struct GraphGateway {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct DriveItem {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RowPayload {
    index: usize,
    #[serde(default)]
    values: Vec<RawRow>,
}

impl RowPayload {
    fn into_table_row(self) -> TableRow {
        let cells = self.values.into_iter().next().unwrap_or_default();
        TableRow::new(self.index, cells)
    }
}

#[derive(Deserialize)]
struct RangePayload {
    #[serde(default)]
    values: Vec<RawRow>,
}

#[derive(Serialize)]
struct CellPatch<'a> {
    values: [[&'a CellValue; 1]; 1],
}

enum Direction {
    Read,
    Write,
}

impl Direction {
    fn error(&self, resource: &str, status: Option<u16>, detail: String) -> Error {
        let resource = resource.to_string();
        match self {
            Self::Read => Error::RemoteRead {
                resource,
                status,
                detail,
            },
            Self::Write => Error::RemoteWrite {
                resource,
                status,
                detail,
            },
        }
    }
}

impl GraphGateway {
    /// Creates a gateway from the endpoint and timeout in `config`.
    pub fn new(config: &PacerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.graph_endpoint))
    }

    /// Creates a gateway around an existing client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, handle: &FileHandle, table: &str) -> String {
        format!(
            "{}/me/drive/items/{}/workbook/tables/{}",
            self.base_url,
            urlencoding::encode(&handle.id),
            urlencoding::encode(table)
        )
    }

    async fn send(
        &self,
        request: RequestBuilder,
        credential: &BearerToken,
        direction: Direction,
        resource: &str,
    ) -> Result<Response> {
        let response = request
            .header("Authorization", credential.to_header_value())
            .send()
            .await
            .map_err(|e| direction.error(resource, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(direction.error(resource, Some(status.as_u16()), detail));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &BearerToken,
        resource: &str,
    ) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self
            .send(self.client.get(url), credential, Direction::Read, resource)
            .await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Direction::Read.error(resource, Some(status), e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            Direction::Read.error(resource, Some(status), format!("unexpected response body: {e}"))
        })
    }
}

#[async_trait]
impl TableGateway for GraphGateway {
    async fn resolve_file_handle(
        &self,
        credential: &BearerToken,
        display_name: &str,
    ) -> Result<FileHandle> {
        let filter = format!("name eq '{}'", display_name.replace('\'', "''"));
        let url = format!(
            "{}/me/drive/root/children?$filter={}",
            self.base_url,
            urlencoding::encode(&filter)
        );
        let items: Collection<DriveItem> = self
            .get_json(&url, credential, "drive root listing")
            .await?;

        if items.value.len() > 1 {
            tracing::debug!(
                file_name = display_name,
                matches = items.value.len(),
                "several workbooks match, using the first"
            );
        }
        let item = items.value.into_iter().next().ok_or_else(|| Error::NotFound {
            file_name: display_name.to_string(),
        })?;
        tracing::debug!(id = %item.id, name = ?item.name, "resolved workbook");
        Ok(FileHandle::new(item.id))
    }

    async fn fetch_table_rows(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<Vec<TableRow>> {
        let url = format!("{}/rows", self.table_url(handle, table));
        let rows: Collection<RowPayload> = self
            .get_json(&url, credential, &format!("table '{table}'"))
            .await?;
        Ok(rows.value.into_iter().map(RowPayload::into_table_row).collect())
    }

    async fn fetch_header_row(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
    ) -> Result<RawRow> {
        let url = format!("{}/headerRowRange", self.table_url(handle, table));
        let range: RangePayload = self
            .get_json(&url, credential, &format!("header row of '{table}'"))
            .await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn fetch_row(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        index: usize,
    ) -> Result<TableRow> {
        let url = format!("{}/rows/itemAt(index={index})", self.table_url(handle, table));
        let row: RowPayload = self
            .get_json(&url, credential, &format!("row {index} of '{table}'"))
            .await?;
        Ok(row.into_table_row())
    }

    async fn patch_cell(
        &self,
        credential: &BearerToken,
        handle: &FileHandle,
        table: &str,
        row_index: usize,
        column_index: usize,
        value: CellValue,
    ) -> Result<()> {
        let url = format!(
            "{}/rows/itemAt(index={row_index})/range/cell(row=0,column={column_index})",
            self.table_url(handle, table)
        );
        let resource = format!("cell (row {row_index}, column {column_index}) of '{table}'");
        let body = CellPatch {
            values: [[&value]],
        };
        tracing::debug!(%url, "PATCH");
        let result = self
            .send(
                self.client.patch(&url).json(&body),
                credential,
                Direction::Write,
                &resource,
            )
            .await;
        if let Err(err) = &result {
            tracing::error!("cell update failed: {err}");
        }
        result.map(|_| ())
    }
}
