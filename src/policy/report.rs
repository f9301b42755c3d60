//! Per-viewer task lists and the admin cohort report.

use chrono::NaiveDate;
use serde::Serialize;

use super::VisibilityPolicy;
use crate::types::{EnrichedTask, Member, Task, TaskStatus};

/// Tasks a viewer can see, enriched for `today`, in table order.
pub fn visible_tasks(
    policy: &VisibilityPolicy,
    viewer: &Member,
    tasks: &[Task],
    today: NaiveDate,
) -> Vec<EnrichedTask> {
    tasks
        .iter()
        .filter(|task| policy.is_visible(&viewer.role, &task.target))
        .map(|task| EnrichedTask::new(task, &viewer.id, today))
        .collect()
}

/// Splits enriched tasks into `(todo, done)` for the task-list view.
pub fn split_by_completion(tasks: Vec<EnrichedTask>) -> (Vec<EnrichedTask>, Vec<EnrichedTask>) {
    tasks.into_iter().partition(|task| !task.is_completed)
}

/// One member's outstanding work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    /// The member.
    pub member: Member,
    /// Visible tasks the member has not completed, most urgent first.
    pub pending: Vec<EnrichedTask>,
    /// Number of visible tasks.
    pub assigned: usize,
    /// Number of visible tasks the member completed.
    pub completed: usize,
    /// Any pending task is past its deadline.
    pub has_red_card: bool,
}

impl MemberStatus {
    /// Pending tasks whose deadline has passed.
    pub fn red_cards(&self) -> usize {
        self.pending
            .iter()
            .filter(|task| task.status == TaskStatus::Expired)
            .count()
    }
}

/// Computes [`MemberStatus`] for one member.
///
/// Pending tasks are ordered expired, urgent, normal; ties keep table order.
pub fn member_status(
    policy: &VisibilityPolicy,
    member: &Member,
    tasks: &[Task],
    today: NaiveDate,
) -> MemberStatus {
    let visible = visible_tasks(policy, member, tasks, today);
    let assigned = visible.len();
    let (mut pending, done) = split_by_completion(visible);
    pending.sort_by_key(|task| task.status);
    let has_red_card = pending.iter().any(EnrichedTask::is_red_card);

    MemberStatus {
        member: member.clone(),
        pending,
        assigned,
        completed: done.len(),
        has_red_card,
    }
}

/// Team-wide compliance summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortReport {
    /// One entry per member, in member order.
    pub members: Vec<MemberStatus>,
    /// Visible (member, task) pairs.
    pub assignments: usize,
    /// Pairs where the member is in the completion list.
    pub completed: usize,
    /// `completed / assignments`, or `None` with no assignments.
    pub compliance_rate: Option<f64>,
    /// Pending pairs past their deadline.
    pub red_cards: usize,
    /// Members with at least one red card.
    pub members_with_red_card: usize,
}

impl CohortReport {
    /// Compliance as a whole percentage, for display.
    pub fn compliance_percent(&self) -> Option<u32> {
        self.compliance_rate
            .map(|rate| (rate * 100.0).round().clamp(0.0, 100.0) as u32)
    }
}

/// Aggregates every member's status.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use limit_pacer::policy::cohort_report;
/// use limit_pacer::{Member, Target, Task, VisibilityPolicy};
///
/// let members = vec![
///     Member::new("1", "Yamada", "Dev", "L"),
///     Member::new("2", "Suzuki", "Sales", "T"),
/// ];
/// let tasks = vec![
///     Task::new("101", "Training", "2025-05-01", Target::All).with_completed_by(["1"]),
///     Task::new("103", "Review", "2025-07-01", Target::Named("役職者".into())),
/// ];
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// let report = cohort_report(&VisibilityPolicy::default(), &members, &tasks, today);
/// assert_eq!(report.assignments, 3);
/// assert_eq!(report.completed, 1);
/// assert_eq!(report.red_cards, 1);
/// assert_eq!(report.members_with_red_card, 1);
/// ```
pub fn cohort_report(
    policy: &VisibilityPolicy,
    members: &[Member],
    tasks: &[Task],
    today: NaiveDate,
) -> CohortReport {
    let statuses: Vec<MemberStatus> = members
        .iter()
        .map(|member| member_status(policy, member, tasks, today))
        .collect();

    let assignments = statuses.iter().map(|s| s.assigned).sum();
    let completed = statuses.iter().map(|s| s.completed).sum();
    let red_cards = statuses.iter().map(MemberStatus::red_cards).sum();
    let members_with_red_card = statuses.iter().filter(|s| s.has_red_card).count();
    let compliance_rate = (assignments > 0).then(|| completed as f64 / assignments as f64);

    CohortReport {
        members: statuses,
        assignments,
        completed,
        compliance_rate,
        red_cards,
        members_with_red_card,
    }
}
