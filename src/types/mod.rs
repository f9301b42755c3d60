//! Domain types read from and written to the workbook.
//!
//! - [`cell`] - Raw cell values and table rows
//! - [`member`] - Member records and authority
//! - [`task`] - Task records, targets and deadline status

pub mod cell;
pub mod member;
pub mod task;

pub use cell::{CellValue, RawRow, TableRow};
pub use member::{Authority, Member, UNKNOWN_LOCATION};
pub use task::{
    EnrichedTask, Target, Task, TaskStatus, ALL_TARGET, ALL_TARGET_ALIAS, PLACEHOLDER_LINK,
};
