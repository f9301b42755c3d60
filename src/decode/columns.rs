//! Column maps from domain fields to table column positions.
//!
//! The workbook schema is not introspected for data; every field is read by
//! position. A column map makes those positions explicit and lets a header
//! name be attached to each field so that a shifted column is caught once at
//! load time instead of silently misread on every row.
//!
//! # Example Configuration
//!
//! ```toml
//! [columns.tasks]
//! version = 1
//! id = { index = 0, header = "No" }
//! content = { index = 1 }
//! deadline = { index = 2, header = "期限" }
//! target = { index = 3 }
//! link = { index = 4 }
//! completed_by = { index = 5, header = "完了者" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::RawRow;

/// Column map layout version understood by this crate.
pub const COLUMN_MAP_VERSION: u32 = 1;

/// Position of one field, with an optional expected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Zero-based column index.
    pub index: usize,
    /// Header text expected at `index`. `None` skips the header check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl ColumnSpec {
    /// Column at `index` with no header check.
    pub const fn at(index: usize) -> Self {
        Self {
            index,
            header: None,
        }
    }

    /// Adds an expected header name.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

fn default_version() -> u32 {
    COLUMN_MAP_VERSION
}

/// Column positions of the member table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberColumns {
    /// Layout version, must equal [`COLUMN_MAP_VERSION`].
    #[serde(default = "default_version")]
    pub version: u32,
    /// Member id.
    pub id: ColumnSpec,
    /// Display name.
    pub name: ColumnSpec,
    /// Group.
    pub group: ColumnSpec,
    /// Role code.
    pub role: ColumnSpec,
    /// Email.
    pub email: ColumnSpec,
    /// Authority.
    pub authority: ColumnSpec,
    /// Team, optional trailing column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<ColumnSpec>,
    /// Location. Absent in the standard layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ColumnSpec>,
}

impl Default for MemberColumns {
    fn default() -> Self {
        Self {
            version: COLUMN_MAP_VERSION,
            id: ColumnSpec::at(0),
            name: ColumnSpec::at(1),
            group: ColumnSpec::at(2),
            role: ColumnSpec::at(3),
            email: ColumnSpec::at(4),
            authority: ColumnSpec::at(5),
            team: Some(ColumnSpec::at(6)),
            location: None,
        }
    }
}

impl MemberColumns {
    /// Fields every member row must physically contain.
    fn required(&self) -> [&ColumnSpec; 6] {
        [
            &self.id,
            &self.name,
            &self.group,
            &self.role,
            &self.email,
            &self.authority,
        ]
    }

    /// Minimum number of cells in a well-formed row.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_pacer::decode::MemberColumns;
    ///
    /// assert_eq!(MemberColumns::default().min_width(), 6);
    /// ```
    pub fn min_width(&self) -> usize {
        min_width(&self.required())
    }

    fn named_fields(&self) -> Vec<(&'static str, &ColumnSpec)> {
        let mut fields = vec![
            ("id", &self.id),
            ("name", &self.name),
            ("group", &self.group),
            ("role", &self.role),
            ("email", &self.email),
            ("authority", &self.authority),
        ];
        if let Some(team) = &self.team {
            fields.push(("team", team));
        }
        if let Some(location) = &self.location {
            fields.push(("location", location));
        }
        fields
    }

    /// Checks the configured header names against the table's header row.
    pub fn validate_header(&self, table: &str, header: &RawRow) -> Result<()> {
        check_version(table, self.version)?;
        validate_fields(table, &self.named_fields(), header)
    }

    /// Returns `true` if any field carries an expected header.
    pub fn has_headers(&self) -> bool {
        self.named_fields().iter().any(|(_, spec)| spec.header.is_some())
    }
}

/// Column positions of the task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskColumns {
    /// Layout version, must equal [`COLUMN_MAP_VERSION`].
    #[serde(default = "default_version")]
    pub version: u32,
    /// Task id.
    pub id: ColumnSpec,
    /// Task content.
    pub content: ColumnSpec,
    /// Deadline (date serial or ISO text).
    pub deadline: ColumnSpec,
    /// Target role or group.
    pub target: ColumnSpec,
    /// Reference link, optional trailing column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<ColumnSpec>,
    /// Completion list. Also the column completion toggles write to.
    pub completed_by: ColumnSpec,
}

impl Default for TaskColumns {
    fn default() -> Self {
        Self {
            version: COLUMN_MAP_VERSION,
            id: ColumnSpec::at(0),
            content: ColumnSpec::at(1),
            deadline: ColumnSpec::at(2),
            target: ColumnSpec::at(3),
            link: Some(ColumnSpec::at(4)),
            completed_by: ColumnSpec::at(5),
        }
    }
}

impl TaskColumns {
    fn required(&self) -> [&ColumnSpec; 4] {
        [&self.id, &self.content, &self.deadline, &self.target]
    }

    /// Minimum number of cells in a well-formed row.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_pacer::decode::TaskColumns;
    ///
    /// assert_eq!(TaskColumns::default().min_width(), 4);
    /// ```
    pub fn min_width(&self) -> usize {
        min_width(&self.required())
    }

    fn named_fields(&self) -> Vec<(&'static str, &ColumnSpec)> {
        let mut fields = vec![
            ("id", &self.id),
            ("content", &self.content),
            ("deadline", &self.deadline),
            ("target", &self.target),
        ];
        if let Some(link) = &self.link {
            fields.push(("link", link));
        }
        fields.push(("completed_by", &self.completed_by));
        fields
    }

    /// Checks the configured header names against the table's header row.
    pub fn validate_header(&self, table: &str, header: &RawRow) -> Result<()> {
        check_version(table, self.version)?;
        validate_fields(table, &self.named_fields(), header)
    }

    /// Returns `true` if any field carries an expected header.
    pub fn has_headers(&self) -> bool {
        self.named_fields().iter().any(|(_, spec)| spec.header.is_some())
    }
}

fn min_width(required: &[&ColumnSpec]) -> usize {
    required.iter().map(|spec| spec.index + 1).max().unwrap_or(0)
}

fn check_version(table: &str, version: u32) -> Result<()> {
    if version == COLUMN_MAP_VERSION {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "column map for '{table}' has version {version}, expected {COLUMN_MAP_VERSION}"
        )))
    }
}

fn validate_fields(table: &str, fields: &[(&'static str, &ColumnSpec)], header: &RawRow) -> Result<()> {
    for (field, spec) in fields {
        let Some(expected) = &spec.header else {
            continue;
        };
        let found = header
            .get(spec.index)
            .map(|cell| cell.as_text().trim().to_string())
            .unwrap_or_default();
        if !found.eq_ignore_ascii_case(expected.trim()) {
            return Err(Error::SchemaMismatch {
                table: table.to_string(),
                field: (*field).to_string(),
                column: spec.index,
                expected: expected.clone(),
                found,
            });
        }
    }
    Ok(())
}
