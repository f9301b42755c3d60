//! Workbook location, table layout and client settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::decode::{MemberColumns, TaskColumns};
use crate::error::{Error, Result};
use crate::policy::RoleGroups;

/// Prefix of every environment variable read by [`PacerConfig::from_env`].
pub const ENV_PREFIX: &str = "LIMIT_PACER_";

/// How a completion toggle addresses its row before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Read the row at the cached index first and look the task up by id if
    /// the row has moved.
    #[default]
    Revalidate,
    /// Write straight to the cached index.
    Direct,
}

impl std::str::FromStr for WritePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "revalidate" => Ok(Self::Revalidate),
            "direct" => Ok(Self::Direct),
            other => Err(Error::Configuration(format!(
                "unknown write policy '{other}', expected 'revalidate' or 'direct'"
            ))),
        }
    }
}

/// Column maps of both tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Member table layout.
    #[serde(default)]
    pub members: MemberColumns,
    /// Task table layout.
    #[serde(default)]
    pub tasks: TaskColumns,
}

/// Settings for a synchronization session.
///
/// Usually loaded from a `limit-pacer.toml` file or from the environment.
///
/// # Example Configuration File
///
/// ```toml
/// file_name = "limit-pacer.xlsx"
/// tasks_table = "Start_Tasks"
/// timeout_ms = 15000
/// write_policy = "revalidate"
///
/// [columns.tasks]
/// id = { index = 0, header = "No" }
/// content = { index = 1 }
/// deadline = { index = 2 }
/// target = { index = 3 }
/// link = { index = 4 }
/// completed_by = { index = 5, header = "完了者" }
///
/// [role_groups]
/// "管理者" = ["SM", "Mgr"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacerConfig {
    /// Base URL of the Graph API.
    #[serde(default = "default_graph_endpoint")]
    pub graph_endpoint: String,

    /// Display name of the workbook in the drive root.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Member table name.
    #[serde(default = "default_members_table")]
    pub members_table: String,

    /// Task table name.
    #[serde(default = "default_tasks_table")]
    pub tasks_table: String,

    /// Delegated scopes requested for every token.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Request timeout in milliseconds. The HTTP client default applies when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Row addressing for completion writes.
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Column maps.
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Role groups used by the visibility policy.
    #[serde(default)]
    pub role_groups: RoleGroups,
}

fn default_graph_endpoint() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_file_name() -> String {
    "limit-pacer.xlsx".to_string()
}

fn default_members_table() -> String {
    "Start_Members".to_string()
}

fn default_tasks_table() -> String {
    "Start_Tasks".to_string()
}

fn default_scopes() -> Vec<String> {
    crate::auth::DEFAULT_SCOPES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            graph_endpoint: default_graph_endpoint(),
            file_name: default_file_name(),
            members_table: default_members_table(),
            tasks_table: default_tasks_table(),
            scopes: default_scopes(),
            timeout_ms: None,
            write_policy: WritePolicy::default(),
            columns: ColumnConfig::default(),
            role_groups: RoleGroups::default(),
        }
    }
}

impl PacerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Loads configuration from the process environment.
    ///
    /// Recognized variables:
    /// - `LIMIT_PACER_GRAPH_ENDPOINT`
    /// - `LIMIT_PACER_FILE_NAME`
    /// - `LIMIT_PACER_MEMBERS_TABLE`, `LIMIT_PACER_TASKS_TABLE`
    /// - `LIMIT_PACER_SCOPES` (comma separated)
    /// - `LIMIT_PACER_TIMEOUT_MS`
    /// - `LIMIT_PACER_WRITE_POLICY` (`revalidate` or `direct`)
    ///
    /// If `LIMIT_PACER_CONFIG` names a file, it is loaded first and the other
    /// variables override it.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var(format!("{ENV_PREFIX}CONFIG")) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.apply_vars(std::env::vars())
    }

    /// Applies `LIMIT_PACER_*` overrides from `vars` on top of `self`.
    pub fn apply_vars<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            match name {
                "GRAPH_ENDPOINT" => self.graph_endpoint = value,
                "FILE_NAME" => self.file_name = value,
                "MEMBERS_TABLE" => self.members_table = value,
                "TASKS_TABLE" => self.tasks_table = value,
                "SCOPES" => {
                    self.scopes = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                },
                "TIMEOUT_MS" => {
                    let ms = value.trim().parse::<u64>().map_err(|e| {
                        Error::Configuration(format!("{ENV_PREFIX}TIMEOUT_MS: {e}"))
                    })?;
                    self.timeout_ms = Some(ms);
                },
                "WRITE_POLICY" => self.write_policy = value.parse()?,
                _ => {},
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks that names are present and the endpoint is a URL.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.graph_endpoint).map_err(|e| {
            Error::Configuration(format!("invalid graph_endpoint '{}': {e}", self.graph_endpoint))
        })?;
        for (field, value) in [
            ("file_name", &self.file_name),
            ("members_table", &self.members_table),
            ("tasks_table", &self.tasks_table),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{field} must not be empty")));
            }
        }
        if self.scopes.is_empty() {
            return Err(Error::Configuration("at least one scope is required".to_string()));
        }
        Ok(())
    }

    /// Request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Sets the API base URL.
    pub fn with_graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graph_endpoint = endpoint.into();
        self
    }

    /// Sets the workbook name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Sets both table names.
    pub fn with_tables(mut self, members: impl Into<String>, tasks: impl Into<String>) -> Self {
        self.members_table = members.into();
        self.tasks_table = tasks.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the write policy.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Sets the column maps.
    pub fn with_columns(mut self, members: MemberColumns, tasks: TaskColumns) -> Self {
        self.columns = ColumnConfig { members, tasks };
        self
    }

    /// Sets the role groups.
    pub fn with_role_groups(mut self, groups: RoleGroups) -> Self {
        self.role_groups = groups;
        self
    }
}
