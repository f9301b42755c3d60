//! Built-in dataset shown while nobody is signed in.

use crate::types::{Member, Target, Task};

/// Demo members.
pub fn members() -> Vec<Member> {
    vec![
        viewer(),
        Member::new("2", "Suzuki Ichiro", "Sales", "T").with_location("Osaka"),
        Member::new("3", "Sato Hanako", "HR", "AL").with_location("Tokyo"),
    ]
}

/// Viewer used when no members are loaded.
pub fn viewer() -> Member {
    Member::new("1", "Yamada Taro", "Development", "L").with_location("Tokyo")
}

/// Demo tasks, with row positions as if read from a table.
pub fn tasks() -> Vec<Task> {
    vec![
        Task::new("101", "Security Training 2024", "2024-12-31", Target::All)
            .with_link("https://example.com")
            .with_source_row(0),
        Task::new("102", "Timesheet Submission", "2025-01-05", Target::Named("社員".into()))
            .with_link("https://example.com")
            .with_source_row(1),
        Task::new("103", "Manager Review", "2025-01-10", Target::Named("管理者".into()))
            .with_source_row(2),
        Task::new("104", "Quarterly Goal Setting", "2024-12-15", Target::All).with_source_row(3),
    ]
}
