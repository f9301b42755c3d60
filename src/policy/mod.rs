//! Task visibility policy.
//!
//! A task is broadcast to everyone, to one role code, or to a named role
//! group. [`VisibilityPolicy::is_visible`] decides whether a member with a
//! given role sees it. The decision is total: an unknown target simply hides
//! the task.
//!
//! # Standard role groups
//!
//! | Group    | Roles                           |
//! |----------|---------------------------------|
//! | `管理者` | SM, Mgr                         |
//! | `役職者` | SM, Mgr, AM, L, AL              |
//! | `社員`   | SM, Mgr, AM, L, AL, T, H        |
//! | `BP`     | BP                              |

mod report;

pub use report::{
    cohort_report, member_status, split_by_completion, visible_tasks, CohortReport, MemberStatus,
};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::types::Target;

static STANDARD_POLICY: LazyLock<VisibilityPolicy> = LazyLock::new(VisibilityPolicy::default);

/// Mapping from role-group name to the role codes it includes.
///
/// Immutable once built; load it from configuration or use
/// [`RoleGroups::standard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleGroups {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl RoleGroups {
    /// The role groups used by the team workbook.
    pub fn standard() -> Self {
        Self::from_pairs([
            ("管理者", &["SM", "Mgr"][..]),
            ("役職者", &["SM", "Mgr", "AM", "L", "AL"][..]),
            ("社員", &["SM", "Mgr", "AM", "L", "AL", "T", "H"][..]),
            ("BP", &["BP"][..]),
        ])
    }

    /// Builds groups from `(name, roles)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_pacer::RoleGroups;
    ///
    /// let groups = RoleGroups::from_pairs([("leads", &["L", "AL"][..])]);
    /// assert!(groups.contains("leads", "AL"));
    /// assert!(!groups.contains("leads", "T"));
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        let groups = pairs
            .into_iter()
            .map(|(name, roles)| {
                (
                    name.to_string(),
                    roles.iter().map(|r| (*r).to_string()).collect(),
                )
            })
            .collect();
        Self { groups }
    }

    /// Roles in `group`, if the group exists.
    pub fn roles(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    /// Returns `true` if `group` exists and includes `role`.
    pub fn contains(&self, group: &str, role: &str) -> bool {
        self.roles(group).is_some_and(|roles| roles.contains(role))
    }

    /// Group names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl Default for RoleGroups {
    fn default() -> Self {
        Self::standard()
    }
}

/// Visibility rules over a fixed set of role groups.
///
/// # Examples
///
/// ```
/// use limit_pacer::{Target, VisibilityPolicy};
///
/// let policy = VisibilityPolicy::default();
/// let leaders = Target::Named("役職者".to_string());
/// assert!(policy.is_visible("L", &leaders));
/// assert!(!policy.is_visible("T", &leaders));
/// assert!(policy.is_visible("T", &Target::All));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityPolicy {
    groups: RoleGroups,
}

impl VisibilityPolicy {
    /// Creates a policy over `groups`.
    pub fn new(groups: RoleGroups) -> Self {
        Self { groups }
    }

    /// The role groups this policy consults.
    pub fn groups(&self) -> &RoleGroups {
        &self.groups
    }

    /// Returns `true` if a member with `role` sees tasks aimed at `target`.
    pub fn is_visible(&self, role: &str, target: &Target) -> bool {
        match target {
            Target::All => true,
            Target::Named(name) if name == role => true,
            Target::Named(name) => self.groups.contains(name, role),
        }
    }
}

/// [`VisibilityPolicy::is_visible`] over the standard role groups, taking the
/// raw target text.
///
/// # Examples
///
/// ```
/// use limit_pacer::policy::is_visible;
///
/// assert!(is_visible("BP", "ALL"));
/// assert!(is_visible("BP", "BP"));
/// assert!(!is_visible("BP", "社員"));
/// assert!(!is_visible("T", "nobody"));
/// ```
pub fn is_visible(role: &str, target: &str) -> bool {
    STANDARD_POLICY.is_visible(role, &Target::parse(target))
}
