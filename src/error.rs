//! Error types for workbook synchronization.
//!
//! [`Error`] is the crate-wide error. Row-level decode failures are carried by
//! [`MalformedRowError`] so batch decoding can collect them without aborting,
//! and token failures by [`CredentialError`].

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the gateway, decoder and orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    /// No bearer token could be obtained silently or interactively.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The backing workbook does not exist in the drive root.
    #[error(
        "workbook '{file_name}' not found in the drive root; upload it or set LIMIT_PACER_FILE_NAME"
    )]
    NotFound {
        /// Display name that was searched for.
        file_name: String,
    },

    /// A read request was rejected or never completed.
    #[error("failed to read {resource}{}: {detail}", status_suffix(.status))]
    RemoteRead {
        /// What was being read (file listing, table name, header row).
        resource: String,
        /// Upstream HTTP status, `None` for transport failures.
        status: Option<u16>,
        /// Upstream body or transport message.
        detail: String,
    },

    /// A cell update was rejected or never completed.
    #[error("failed to write {resource}{}: {detail}", status_suffix(.status))]
    RemoteWrite {
        /// Address of the cell that was being written.
        resource: String,
        /// Upstream HTTP status, `None` for transport failures.
        status: Option<u16>,
        /// Upstream body or transport message.
        detail: String,
    },

    /// A row had fewer cells than the column map requires.
    #[error(transparent)]
    MalformedRow(#[from] MalformedRowError),

    /// The table's header row does not match the configured column map.
    #[error(
        "schema mismatch in table '{table}': field '{field}' expects header '{expected}' at column {column}, found '{found}'"
    )]
    SchemaMismatch {
        /// Table whose header was checked.
        table: String,
        /// Domain field name.
        field: String,
        /// Zero-based column index from the column map.
        column: usize,
        /// Header text the column map expects.
        expected: String,
        /// Header text actually present (empty when the column is missing).
        found: String,
    },

    /// Row re-validation could not find the task anywhere in the table.
    #[error("task {task_id} is no longer at row {row_index} and was not found in the table")]
    StaleRow {
        /// Task that was being written.
        task_id: String,
        /// Row index captured at load time.
        row_index: usize,
    },

    /// No task with this id is loaded.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// Requested task id.
        task_id: String,
    },

    /// Invalid configuration file or environment.
    #[error("configuration error: {0}")]
    Configuration(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl Error {
    /// Returns `true` when a new user-initiated attempt may succeed.
    ///
    /// Nothing in this crate retries on its own; this only informs the UI
    /// whether to offer a retry action.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(
            self,
            Self::Credential(_)
                | Self::RemoteRead { .. }
                | Self::RemoteWrite { .. }
                | Self::StaleRow { .. }
        )
    }

    /// Upstream HTTP status, if the error came from a completed request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRead { status, .. } | Self::RemoteWrite { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("TOML parse error: {err}"))
    }
}

/// A single row that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed row {row_index} in table '{table}': {defect}")]
pub struct MalformedRowError {
    /// Table the row came from.
    pub table: String,
    /// Zero-based table row index.
    pub row_index: usize,
    /// What is wrong with the row.
    pub defect: RowDefect,
}

/// Why a row was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDefect {
    /// Fewer cells than the column map needs.
    #[error("expected at least {expected} cells, found {found}")]
    TooShort {
        /// Minimum cell count required by the column map.
        expected: usize,
        /// Cells actually present.
        found: usize,
    },

    /// The id cell is empty after sanitizing, as in a blank table row.
    #[error("id cell at column {column} is blank")]
    BlankId {
        /// Zero-based id column from the column map.
        column: usize,
    },
}

/// Bearer token acquisition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The user dismissed or failed the interactive challenge.
    #[error("interactive sign-in failed for {principal}: {reason}")]
    InteractiveFailed {
        /// Account that was signing in.
        principal: String,
        /// Provider message.
        reason: String,
    },

    /// The provider cannot run an interactive flow at all.
    #[error("interactive sign-in is not available: {0}")]
    InteractionUnavailable(String),

    /// Silent acquisition failed for a reason other than needing interaction.
    #[error("silent token acquisition failed: {0}")]
    Silent(String),
}
