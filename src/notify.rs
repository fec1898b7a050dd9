//! Deadline notifications.
//!
//! The list is derived: every call regenerates it from the task snapshot, the
//! viewer and the current day. Read flags survive regeneration because
//! notification ids are deterministic (`notif-{task}-{kind}`) and each new
//! notification inherits `is_read` from the previous list.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::employee::Employee;
use crate::fields::{EscalationPolicy, NotificationKind, Status};
use crate::task::Task;
use crate::timeframe::format_date_vi;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<NotificationAction>,
}

/// A follow-up the viewer can trigger by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationAction {
    SendEmail {
        recipient: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cc: Option<String>,
        subject: String,
        body: String,
    },
}

pub fn notification_id(task_id: &str, kind: NotificationKind) -> String {
    let suffix = match kind {
        NotificationKind::Overdue => "overdue",
        NotificationKind::Reminder => "reminder",
    };
    format!("notif-{task_id}-{suffix}")
}

/// Build the notification list for `viewer` at `now`.
///
/// Admins are notified about every unfinished task, members only about
/// unfinished tasks assigned to them. A task whose deadline is before today is
/// overdue; one due tomorrow gets a reminder; anything else produces nothing.
/// Overdue tasks with an [`EscalationPolicy::EmailOps`] policy carry a
/// pre-filled email to `escalation_recipient` when the viewer is an admin.
///
/// The result is ordered newest first; equal timestamps keep task order.
pub fn compute_notifications<Tz: TimeZone>(
    tasks: &[Task],
    employees: &[Employee],
    viewer: &Employee,
    previous: &[Notification],
    now: &DateTime<Tz>,
    escalation_recipient: &str,
) -> Vec<Notification> {
    let today = now.date_naive();
    let tomorrow = today + Duration::days(1);
    let timestamp = now.with_timezone(&Utc);

    let read_ids: HashSet<&str> = previous.iter().filter(|n| n.is_read).map(|n| n.id.as_str()).collect();

    let mut out = Vec::new();
    let candidates = tasks
        .iter()
        .filter(|t| t.status != Status::Done)
        .filter(|t| viewer.is_admin() || t.is_assigned_to(&viewer.id));

    for task in candidates {
        let kind = if task.deadline < today {
            NotificationKind::Overdue
        } else if task.deadline == tomorrow {
            NotificationKind::Reminder
        } else {
            continue;
        };

        let id = notification_id(&task.id, kind);
        let is_read = read_ids.contains(id.as_str());
        let (message, action) = match kind {
            NotificationKind::Reminder => (format!("Công việc \"{}\" sẽ đến hạn vào ngày mai.", task.title), None),
            NotificationKind::Overdue
                if task.escalation == EscalationPolicy::EmailOps && viewer.is_admin() =>
            {
                escalation(task, employees, viewer, escalation_recipient)
            }
            NotificationKind::Overdue => (format!("Công việc \"{}\" đã quá hạn.", task.title), None),
        };

        out.push(Notification {
            id,
            task_id: task.id.clone(),
            kind,
            message,
            is_read,
            timestamp,
            action,
        });
    }

    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    debug!(viewer = %viewer.id, count = out.len(), "notifications computed");
    out
}

fn escalation(
    task: &Task,
    employees: &[Employee],
    viewer: &Employee,
    recipient: &str,
) -> (String, Option<NotificationAction>) {
    let assignees: Vec<&Employee> = task
        .assignee_ids
        .iter()
        .filter_map(|id| employees.iter().find(|e| &e.id == id))
        .collect();
    let names = assignees.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");
    let emails = assignees.iter().map(|a| a.email.as_str()).collect::<Vec<_>>().join(",");

    let message = format!("Công việc \"{}\" do {} phụ trách đã QUÁ HẠN.", task.title, names);
    let subject = format!("[CẢNH BÁO TRỄ HẠN] Công việc: {}", task.title);
    let body = format!(
        "Chào các bên liên quan,\n\nCông việc \"{}\" được giao cho {} đã trễ hạn vào ngày {}.\n\nYêu cầu các bên khẩn trương xử lý và cập nhật tiến độ.\n\nTrân trọng,\n{}",
        task.title,
        names,
        format_date_vi(task.deadline),
        viewer.name
    );
    let action = NotificationAction::SendEmail {
        recipient: recipient.to_string(),
        cc: (!emails.is_empty()).then_some(emails),
        subject,
        body,
    };
    (message, Some(action))
}

/// Mark one notification read. Returns false if the id is unknown.
pub fn mark_read(notifications: &mut [Notification], id: &str) -> bool {
    match notifications.iter_mut().find(|n| n.id == id) {
        Some(n) => {
            n.is_read = true;
            true
        }
        None => false,
    }
}

pub fn mark_all_read(notifications: &mut [Notification]) {
    for n in notifications.iter_mut() {
        n.is_read = true;
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

/// `mailto:` link for an email action, with subject and body percent-encoded.
pub fn mailto_uri(action: &NotificationAction) -> String {
    match action {
        NotificationAction::SendEmail { recipient, cc, subject, body } => {
            let cc = match cc {
                Some(cc) => format!("cc={cc}&"),
                None => String::new(),
            };
            format!(
                "mailto:{recipient}?{cc}subject={}&body={}",
                urlencoding::encode(subject),
                urlencoding::encode(body)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;
    use crate::timeframe::parse_date;
    use chrono::FixedOffset;

    fn employee(id: &str, name: &str, role: Role) -> Employee {
        Employee {
            id: id.into(),
            name: name.into(),
            avatar_url: String::new(),
            role,
            email: format!("{}@company.com", name.to_lowercase()),
            phone: String::new(),
            dob: String::new(),
            password: None,
        }
    }

    fn task(id: &str, deadline: &str, status: Status, assignees: &[&str]) -> Task {
        let deadline = parse_date(deadline).unwrap();
        Task {
            id: id.into(),
            project_id: "p1".into(),
            sequence_id: 1,
            title: format!("Task {id}"),
            description: String::new(),
            assignee_ids: assignees.iter().map(|s| s.to_string()).collect(),
            priority: Priority::High,
            difficulty: Difficulty::Easy,
            start_date: deadline,
            deadline,
            status,
            notes: String::new(),
            comments: Vec::new(),
            tags: Vec::new(),
            attachments: Vec::new(),
            escalation: EscalationPolicy::None,
        }
    }

    /// Mid-morning in UTC+7 on the given local day.
    fn at(day: &str) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let naive = parse_date(day).unwrap().and_hms_opt(9, 30, 0).unwrap();
        tz.from_local_datetime(&naive).unwrap()
    }

    fn staff() -> Vec<Employee> {
        vec![employee("1", "An", Role::Admin), employee("2", "Binh", Role::Member), employee("3", "Cuong", Role::Member)]
    }

    #[test]
    fn past_deadline_is_overdue_only() {
        let staff = staff();
        let tasks = vec![task("t1", "2025-11-03", Status::Todo, &["2"])];
        let out = compute_notifications(&tasks, &staff, &staff[0], &[], &at("2025-11-15"), "ops@company.com");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, NotificationKind::Overdue);
        assert_eq!(out[0].id, "notif-t1-overdue");
        assert_eq!(out[0].message, "Công việc \"Task t1\" đã quá hạn.");
        assert!(out[0].action.is_none());
        assert!(!out[0].is_read);
    }

    #[test]
    fn tomorrow_gets_reminder_today_and_later_get_nothing() {
        let staff = staff();
        let tasks = vec![
            task("due-today", "2025-11-15", Status::Todo, &["2"]),
            task("due-tomorrow", "2025-11-16", Status::InProgress, &["2"]),
            task("due-later", "2025-11-17", Status::Todo, &["2"]),
        ];
        let out = compute_notifications(&tasks, &staff, &staff[1], &[], &at("2025-11-15"), "ops@company.com");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].task_id, "due-tomorrow");
        assert_eq!(out[0].kind, NotificationKind::Reminder);
    }

    #[test]
    fn done_tasks_and_other_members_tasks_are_skipped() {
        let staff = staff();
        let tasks = vec![
            task("done", "2025-11-01", Status::Done, &["2"]),
            task("mine", "2025-11-01", Status::Todo, &["2"]),
            task("theirs", "2025-11-01", Status::Todo, &["3"]),
        ];
        let member = compute_notifications(&tasks, &staff, &staff[1], &[], &at("2025-11-15"), "ops@company.com");
        assert_eq!(member.iter().map(|n| n.task_id.as_str()).collect::<Vec<_>>(), vec!["mine"]);

        let admin = compute_notifications(&tasks, &staff, &staff[0], &[], &at("2025-11-15"), "ops@company.com");
        assert_eq!(admin.iter().map(|n| n.task_id.as_str()).collect::<Vec<_>>(), vec!["mine", "theirs"]);
    }

    #[test]
    fn escalation_email_only_for_admin_viewers() {
        let staff = staff();
        let mut t = task("t-esc", "2025-11-03", Status::Todo, &["2", "3"]);
        t.escalation = EscalationPolicy::EmailOps;
        let tasks = vec![t];

        let admin = compute_notifications(&tasks, &staff, &staff[0], &[], &at("2025-11-15"), "ops@company.com");
        assert_eq!(admin[0].message, "Công việc \"Task t-esc\" do Binh, Cuong phụ trách đã QUÁ HẠN.");
        let Some(NotificationAction::SendEmail { recipient, cc, subject, body }) = &admin[0].action else {
            panic!("expected an email action");
        };
        assert_eq!(recipient, "ops@company.com");
        assert_eq!(cc.as_deref(), Some("binh@company.com,cuong@company.com"));
        assert_eq!(subject, "[CẢNH BÁO TRỄ HẠN] Công việc: Task t-esc");
        assert!(body.contains("đã trễ hạn vào ngày 3/11/2025"));
        assert!(body.ends_with("Trân trọng,\nAn"));

        let member = compute_notifications(&tasks, &staff, &staff[1], &[], &at("2025-11-15"), "ops@company.com");
        assert!(member[0].action.is_none());
    }

    #[test]
    fn read_state_carries_over_by_id() {
        let staff = staff();
        let tasks = vec![
            task("a", "2025-11-01", Status::Todo, &["2"]),
            task("b", "2025-11-16", Status::Todo, &["2"]),
        ];
        let now = at("2025-11-15");
        let mut first = compute_notifications(&tasks, &staff, &staff[1], &[], &now, "ops@company.com");
        assert!(mark_read(&mut first, "notif-a-overdue"));
        assert_eq!(unread_count(&first), 1);

        let second = compute_notifications(&tasks, &staff, &staff[1], &first, &now, "ops@company.com");
        let third = compute_notifications(&tasks, &staff, &staff[1], &second, &now, "ops@company.com");
        let flags = |ns: &[Notification]| ns.iter().map(|n| (n.id.clone(), n.is_read)).collect::<Vec<_>>();
        assert_eq!(flags(&first), flags(&second));
        assert_eq!(flags(&second), flags(&third));

        // A reminder that turns overdue is a different notification.
        let mut read_all = third.clone();
        mark_all_read(&mut read_all);
        let later = compute_notifications(&tasks, &staff, &staff[1], &read_all, &at("2025-11-17"), "ops@company.com");
        let b = later.iter().find(|n| n.task_id == "b").unwrap();
        assert_eq!(b.kind, NotificationKind::Overdue);
        assert!(!b.is_read);
    }

    #[test]
    fn today_follows_viewer_local_day() {
        let staff = staff();
        let tasks = vec![task("t", "2025-11-16", Status::Todo, &["2"])];
        // 2025-11-15 18:00 UTC is already 2025-11-16 in UTC+7.
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 11, 15, 18, 0, 0).unwrap().with_timezone(&tz);
        let out = compute_notifications(&tasks, &staff, &staff[1], &[], &now, "ops@company.com");
        assert!(out.is_empty());
    }

    #[test]
    fn mailto_encodes_subject_and_body() {
        let action = NotificationAction::SendEmail {
            recipient: "ops@company.com".into(),
            cc: Some("a@x.io,b@x.io".into()),
            subject: "Late: report".into(),
            body: "line one\nline two".into(),
        };
        assert_eq!(
            mailto_uri(&action),
            "mailto:ops@company.com?cc=a@x.io,b@x.io&subject=Late%3A%20report&body=line%20one%0Aline%20two"
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "send_email");
    }
}
