//! Task records, broadcast targets and deadline status.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Link shown when a task row has no link cell.
pub const PLACEHOLDER_LINK: &str = "#";

/// Wire text of the everyone target.
pub const ALL_TARGET: &str = "ALL";

/// Alternate spelling of the everyone target found in existing workbooks.
pub const ALL_TARGET_ALIAS: &str = "全員";

/// Audience a task is broadcast to.
///
/// # Examples
///
/// ```
/// use limit_pacer::Target;
///
/// assert_eq!(Target::parse("ALL"), Target::All);
/// assert_eq!(Target::parse("全員"), Target::All);
/// assert_eq!(Target::parse(""), Target::All);
/// assert_eq!(Target::parse("役職者"), Target::Named("役職者".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every member.
    All,
    /// A role code or a role-group name.
    Named(String),
}

impl Target {
    /// Parses a target cell. Blank cells mean everyone.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == ALL_TARGET || raw == ALL_TARGET_ALIAS {
            Self::All
        } else {
            Self::Named(raw.to_string())
        }
    }

    /// Text stored in the workbook for this target.
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_TARGET,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Deadline status relative to a given day.
///
/// Variants are ordered by urgency, so sorting a list of statuses puts
/// expired tasks first.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use limit_pacer::TaskStatus;
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// assert_eq!(TaskStatus::evaluate("2025-05-31", today), TaskStatus::Expired);
/// assert_eq!(TaskStatus::evaluate("2025-06-01", today), TaskStatus::Urgent);
/// assert_eq!(TaskStatus::evaluate("2025-06-02", today), TaskStatus::Normal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Deadline is before today.
    Expired,
    /// Deadline is today.
    Urgent,
    /// Deadline is after today.
    Normal,
}

impl TaskStatus {
    /// Status of a calendar deadline on `today`.
    pub fn from_dates(deadline: NaiveDate, today: NaiveDate) -> Self {
        match deadline.cmp(&today) {
            std::cmp::Ordering::Less => Self::Expired,
            std::cmp::Ordering::Equal => Self::Urgent,
            std::cmp::Ordering::Greater => Self::Normal,
        }
    }

    /// Status of a deadline cell on `today`.
    ///
    /// Deadlines that are not `YYYY-MM-DD` are compared as text against
    /// today's ISO date, which is how the dashboard has always ordered them.
    pub fn evaluate(deadline: &str, today: NaiveDate) -> Self {
        match NaiveDate::parse_from_str(deadline.trim(), "%Y-%m-%d") {
            Ok(date) => Self::from_dates(date, today),
            Err(_) => {
                let today = today.format("%Y-%m-%d").to_string();
                match deadline.cmp(today.as_str()) {
                    std::cmp::Ordering::Less => Self::Expired,
                    std::cmp::Ordering::Equal => Self::Urgent,
                    std::cmp::Ordering::Greater => Self::Normal,
                }
            },
        }
    }

    /// Expired and urgent tasks get the red-card banner.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Expired | Self::Urgent)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::Urgent => write!(f, "urgent"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

/// A row of the task table.
///
/// Whether a given member has completed the task is always derived from
/// [`completed_by`](Task::completed_by) via [`is_completed_by`](Task::is_completed_by);
/// there is no stored completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task number, unique within the table.
    pub id: String,
    /// What has to be done.
    pub content: String,
    /// `YYYY-MM-DD`, or the raw cell text when it was not a date.
    pub deadline: String,
    /// Who the task is for.
    pub target: Target,
    /// Reference link, [`PLACEHOLDER_LINK`] when absent.
    pub link: String,
    /// Member ids that completed the task, in the order they were recorded.
    pub completed_by: Vec<String>,
    /// Table row the task was read from. Only valid until the next load.
    pub source_row_index: usize,
}

impl Task {
    /// Creates a task with no link and an empty completion list.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        deadline: impl Into<String>,
        target: Target,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            deadline: deadline.into(),
            target,
            link: PLACEHOLDER_LINK.to_string(),
            completed_by: Vec::new(),
            source_row_index: 0,
        }
    }

    /// Sets the reference link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Sets the completion list.
    pub fn with_completed_by<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completed_by = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the source row.
    pub fn with_source_row(mut self, index: usize) -> Self {
        self.source_row_index = index;
        self
    }

    /// Returns `true` if `member_id` appears in the completion list.
    pub fn is_completed_by(&self, member_id: &str) -> bool {
        self.completed_by.iter().any(|id| id == member_id)
    }

    /// Completion list after toggling `member_id`.
    ///
    /// Removes every occurrence when present, appends otherwise. Applying it
    /// twice returns to a list without the id.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_pacer::{Target, Task};
    ///
    /// let task = Task::new("101", "Training", "2025-01-01", Target::All);
    /// let once = task.clone().with_completed_by(task.toggled_completion("2"));
    /// assert_eq!(once.completed_by, vec!["2"]);
    /// assert!(once.toggled_completion("2").is_empty());
    /// ```
    pub fn toggled_completion(&self, member_id: &str) -> Vec<String> {
        if self.is_completed_by(member_id) {
            self.completed_by
                .iter()
                .filter(|id| *id != member_id)
                .cloned()
                .collect()
        } else {
            let mut next = self.completed_by.clone();
            next.push(member_id.to_string());
            next
        }
    }

    /// Deadline status on `today`.
    pub fn status_on(&self, today: NaiveDate) -> TaskStatus {
        TaskStatus::evaluate(&self.deadline, today)
    }

    /// Parsed deadline, if it is a calendar date.
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.deadline.trim(), "%Y-%m-%d").ok()
    }
}

/// A task as seen by one viewer at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTask {
    /// The underlying record.
    #[serde(flatten)]
    pub task: Task,
    /// Whether the viewer is in the completion list.
    pub is_completed: bool,
    /// Deadline status on the evaluation day.
    pub status: TaskStatus,
}

impl EnrichedTask {
    /// Derives the viewer-specific fields for `task`.
    pub fn new(task: &Task, viewer_id: &str, today: NaiveDate) -> Self {
        Self {
            task: task.clone(),
            is_completed: task.is_completed_by(viewer_id),
            status: task.status_on(today),
        }
    }

    /// Expired and not completed by the viewer.
    pub fn is_red_card(&self) -> bool {
        !self.is_completed && self.status == TaskStatus::Expired
    }
}
