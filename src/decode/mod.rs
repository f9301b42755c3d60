//! Tabular row decoder.
//!
//! Turns raw table rows into [`Member`] and [`Task`] records. Decoding is pure:
//! no I/O, no shared state. Batch decoding fails the row, not the batch, so a
//! single short row never hides the rest of the table.
//!
//! # Decoding rules
//!
//! - Text is [`sanitize`]d: markup stripped, whitespace trimmed, blanks become `""`.
//! - A row whose id is blank after sanitizing is rejected.
//! - Emails are lowercased; implausible addresses are logged and kept.
//! - Authority outside `{admin, user}` becomes `user`.
//! - Deadlines are converted from date serials by [`decode_deadline`].
//! - Completion lists are split by [`parse_completion_list`].

mod columns;
mod date;
mod text;

pub use columns::{ColumnSpec, MemberColumns, TaskColumns, COLUMN_MAP_VERSION};
pub use date::{
    date_to_serial, decode_deadline, serial_to_date, SERIAL_TEXT_THRESHOLD,
    SPREADSHEET_EPOCH_OFFSET,
};
pub use text::{
    completion_list_cell, encode_completion_list, is_plausible_email, parse_completion_list,
    sanitize, sanitize_cell, LIST_SEPARATOR,
};

use crate::error::{MalformedRowError, RowDefect};
use crate::types::{Authority, Member, TableRow, Target, Task, PLACEHOLDER_LINK, UNKNOWN_LOCATION};

/// Which table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Member table row.
    Member,
    /// Task table row.
    Task,
}

/// A decoded row of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Decoded member.
    Member(Member),
    /// Decoded task.
    Task(Task),
}

/// Result of decoding a whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    /// Rows that decoded, in table order.
    pub records: Vec<T>,
    /// Rows that did not, in table order.
    pub errors: Vec<MalformedRowError>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Decoded<T> {
    /// Returns `true` if every row decoded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Row decoder configured with the column maps of both tables.
///
/// # Examples
///
/// ```
/// use limit_pacer::decode::RowDecoder;
/// use limit_pacer::{CellValue, TableRow};
///
/// let decoder = RowDecoder::default();
/// let row = TableRow::new(0, vec![
///     CellValue::text("101"),
///     CellValue::text("<b>Report</b>  "),
///     CellValue::Number(45658.0),
///     CellValue::text("役職者"),
/// ]);
/// let task = decoder.task("Start_Tasks", &row).unwrap();
/// assert_eq!(task.content, "Report");
/// assert_eq!(task.deadline, "2025-01-01");
/// assert!(task.completed_by.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDecoder {
    members: MemberColumns,
    tasks: TaskColumns,
}

impl RowDecoder {
    /// Creates a decoder with explicit column maps.
    pub fn new(members: MemberColumns, tasks: TaskColumns) -> Self {
        Self { members, tasks }
    }

    /// Member column map.
    pub fn member_columns(&self) -> &MemberColumns {
        &self.members
    }

    /// Task column map.
    pub fn task_columns(&self) -> &TaskColumns {
        &self.tasks
    }

    /// Decodes one row of the given kind.
    pub fn decode(
        &self,
        kind: RowKind,
        table: &str,
        row: &TableRow,
    ) -> Result<Record, MalformedRowError> {
        match kind {
            RowKind::Member => self.member(table, row).map(Record::Member),
            RowKind::Task => self.task(table, row).map(Record::Task),
        }
    }

    /// Decodes one member row.
    pub fn member(&self, table: &str, row: &TableRow) -> Result<Member, MalformedRowError> {
        let columns = &self.members;
        check_width(table, row, columns.min_width())?;
        let id = required_id(table, row, columns.id.index)?;

        let email = Some(sanitize_cell(row.cell(columns.email.index)).to_lowercase())
            .filter(|email| !email.is_empty());
        if let Some(email) = &email {
            if !is_plausible_email(email) {
                tracing::warn!(table, row = row.index, email = %email, "member email has an unexpected format");
            }
        }

        let team = columns
            .team
            .as_ref()
            .map(|spec| sanitize_cell(row.cell(spec.index)))
            .filter(|team| !team.is_empty());
        let location = columns
            .location
            .as_ref()
            .map(|spec| sanitize_cell(row.cell(spec.index)))
            .filter(|location| !location.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        Ok(Member {
            id,
            name: sanitize_cell(row.cell(columns.name.index)),
            group: sanitize_cell(row.cell(columns.group.index)),
            role: sanitize_cell(row.cell(columns.role.index)),
            email,
            authority: Authority::from_cell(&row.cell(columns.authority.index).as_text()),
            team,
            location,
        })
    }

    /// Decodes one task row, recording its table position.
    pub fn task(&self, table: &str, row: &TableRow) -> Result<Task, MalformedRowError> {
        let columns = &self.tasks;
        check_width(table, row, columns.min_width())?;
        let id = required_id(table, row, columns.id.index)?;

        let link = columns
            .link
            .as_ref()
            .map(|spec| sanitize_cell(row.cell(spec.index)))
            .filter(|link| !link.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_LINK.to_string());

        Ok(Task {
            id,
            content: sanitize_cell(row.cell(columns.content.index)),
            deadline: decode_deadline(row.cell(columns.deadline.index)),
            target: Target::parse(&sanitize_cell(row.cell(columns.target.index))),
            link,
            completed_by: completion_list_cell(row.cell(columns.completed_by.index)),
            source_row_index: row.index,
        })
    }

    /// Decodes every member row, collecting failures per row.
    pub fn members(&self, table: &str, rows: &[TableRow]) -> Decoded<Member> {
        decode_all(table, rows, |row| self.member(table, row))
    }

    /// Decodes every task row, collecting failures per row.
    pub fn tasks(&self, table: &str, rows: &[TableRow]) -> Decoded<Task> {
        decode_all(table, rows, |row| self.task(table, row))
    }
}

fn check_width(table: &str, row: &TableRow, expected: usize) -> Result<(), MalformedRowError> {
    if row.cells.len() < expected {
        return Err(MalformedRowError {
            table: table.to_string(),
            row_index: row.index,
            defect: RowDefect::TooShort {
                expected,
                found: row.cells.len(),
            },
        });
    }
    Ok(())
}

fn required_id(table: &str, row: &TableRow, column: usize) -> Result<String, MalformedRowError> {
    let id = sanitize_cell(row.cell(column));
    if id.is_empty() {
        return Err(MalformedRowError {
            table: table.to_string(),
            row_index: row.index,
            defect: RowDefect::BlankId { column },
        });
    }
    Ok(id)
}

fn decode_all<T, F>(table: &str, rows: &[TableRow], mut decode: F) -> Decoded<T>
where
    F: FnMut(&TableRow) -> Result<T, MalformedRowError>,
{
    let mut decoded = Decoded::default();
    for row in rows {
        match decode(row) {
            Ok(record) => decoded.records.push(record),
            Err(err) => {
                tracing::warn!(table, row = row.index, "skipping row: {err}");
                decoded.errors.push(err);
            },
        }
    }
    decoded
}
