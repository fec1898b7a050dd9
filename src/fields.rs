//! Enumerations and field types shared across the board.
//!
//! Values serialise as kebab-case identifiers. Each variant also accepts the
//! localized label the browser build of the dashboard stored, so an exported
//! local-storage dump loads without conversion.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[serde(alias = "Thấp")]
    Low,
    #[default]
    #[serde(alias = "Trung bình")]
    Medium,
    #[serde(alias = "Cao")]
    High,
    #[serde(alias = "Khẩn cấp")]
    Urgent,
}

/// Estimated task difficulty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[serde(alias = "Dễ")]
    Easy,
    #[default]
    #[serde(alias = "Trung bình")]
    Medium,
    #[serde(alias = "Khó")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

/// Kanban column a task sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    #[serde(alias = "Cần làm")]
    Todo,
    #[serde(alias = "Đang thực hiện")]
    InProgress,
    #[serde(alias = "Hoàn thành")]
    Done,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];
}

/// Account role. Admins see every task's notifications and receive escalations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[serde(alias = "Quản trị viên")]
    Admin,
    #[default]
    #[serde(alias = "Thành viên")]
    Member,
}

/// Length of a reporting window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Week,
    Month,
    Quarter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Overdue,
    Reminder,
}

/// What happens when a task goes overdue.
///
/// `EmailOps` makes the overdue notification seen by an admin carry a
/// pre-filled email to the operations mailbox, cc'ing the assignees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationPolicy {
    #[default]
    None,
    EmailOps,
}

/// Deadline ordering inside a board column.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Localized label for a status, as shown in the product UI and activity log.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "Cần làm",
        Status::InProgress => "Đang thực hiện",
        Status::Done => "Hoàn thành",
    }
}

pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Thấp",
        Priority::Medium => "Trung bình",
        Priority::High => "Cao",
        Priority::Urgent => "Khẩn cấp",
    }
}

pub fn format_difficulty(d: Difficulty) -> &'static str {
    match d {
        Difficulty::Easy => "Dễ",
        Difficulty::Medium => "Trung bình",
        Difficulty::Hard => "Khó",
    }
}

pub fn format_role(r: Role) -> &'static str {
    match r {
        Role::Admin => "Quản trị viên",
        Role::Member => "Thành viên",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_identifier_and_localized_label() {
        let a: Status = serde_json::from_str("\"in-progress\"").unwrap();
        let b: Status = serde_json::from_str("\"Đang thực hiện\"").unwrap();
        assert_eq!(a, Status::InProgress);
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&Status::Done).unwrap(), "\"done\"");
    }

    #[test]
    fn shared_label_resolves_per_enum() {
        let p: Priority = serde_json::from_str("\"Trung bình\"").unwrap();
        let d: Difficulty = serde_json::from_str("\"Trung bình\"").unwrap();
        assert_eq!(p, Priority::Medium);
        assert_eq!(d, Difficulty::Medium);
    }

    #[test]
    fn escalation_policy_roundtrips_kebab_case() {
        assert_eq!(serde_json::to_string(&EscalationPolicy::EmailOps).unwrap(), "\"email-ops\"");
        let role: Role = serde_json::from_str("\"Quản trị viên\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
