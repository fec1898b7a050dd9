//! Built-in collections used when nothing usable is stored yet.

use chrono::NaiveDate;

use crate::employee::Employee;
use crate::fields::*;
use crate::goals::{KeyResult, Kpi, Okr};
use crate::project::{Milestone, Project};
use crate::task::Task;
use crate::timeframe::Timeframe;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn employee(id: &str, name: &str, role: Role, email: &str, password: &str) -> Employee {
    Employee {
        id: id.into(),
        name: name.into(),
        avatar_url: format!("https://picsum.photos/seed/{id}/100"),
        role,
        email: email.into(),
        phone: String::new(),
        dob: String::new(),
        password: Some(password.into()),
    }
}

pub fn employees() -> Vec<Employee> {
    vec![
        employee("1", "Nguyễn Văn An", Role::Admin, "an.nguyen@company.com", "123456"),
        employee("2", "Trần Thị Bích", Role::Member, "bich.tran@company.com", "member1"),
        employee("3", "Lê Minh Cường", Role::Member, "cuong.le@company.com", "member2"),
    ]
}

pub fn projects() -> Vec<Project> {
    let q4 = Timeframe::new(Period::Quarter, day(2025, 10, 1));
    let alpha = Project {
        id: "p1".into(),
        name: "Dự án Alpha".into(),
        contract_url: None,
        milestones: vec![
            Milestone { id: "m1".into(), name: "Chốt tính năng giai đoạn 2".into(), date: day(2025, 11, 5), is_completed: true },
            Milestone { id: "m2".into(), name: "Hoàn thành Core Backend".into(), date: day(2025, 11, 20), is_completed: false },
        ],
        attachments: Vec::new(),
        activity_log: Vec::new(),
        kpis: ["1", "2"]
            .iter()
            .enumerate()
            .map(|(i, emp)| Kpi {
                id: format!("kpi{}", i + 1),
                employee_id: emp.to_string(),
                project_id: "p1".into(),
                title: "Hoàn thành 5 công việc độ khó \"Khó\"".into(),
                target: 5,
                timeframe: q4,
            })
            .collect(),
        okrs: vec![Okr {
            id: "okr1".into(),
            employee_id: "1".into(),
            project_id: "p1".into(),
            objective: "Nâng cao chất lượng kỹ thuật trong Q4".into(),
            key_results: vec![
                KeyResult { id: "kr1".into(), title: "Hoàn thành đúng hạn các công việc Backend".into(), progress: 40 },
                KeyResult { id: "kr2".into(), title: "Giảm nợ kỹ thuật xuống dưới 5%".into(), progress: 60 },
            ],
            timeframe: q4,
        }],
    };
    let winter = Project {
        id: "p2".into(),
        name: "Chiến dịch Marketing Mùa Đông".into(),
        contract_url: None,
        milestones: Vec::new(),
        attachments: Vec::new(),
        activity_log: Vec::new(),
        kpis: Vec::new(),
        okrs: Vec::new(),
    };
    vec![alpha, winter]
}

#[allow(clippy::too_many_arguments)]
fn task(
    id: &str,
    seq: u64,
    title: &str,
    assignees: &[&str],
    difficulty: Difficulty,
    start: NaiveDate,
    deadline: NaiveDate,
    status: Status,
    escalation: EscalationPolicy,
) -> Task {
    Task {
        id: id.into(),
        project_id: "p1".into(),
        sequence_id: seq,
        title: title.into(),
        description: String::new(),
        assignee_ids: assignees.iter().map(|a| a.to_string()).collect(),
        priority: Priority::High,
        difficulty,
        start_date: start,
        deadline,
        status,
        notes: String::new(),
        comments: Vec::new(),
        tags: Vec::new(),
        attachments: Vec::new(),
        escalation,
    }
}

pub fn tasks() -> Vec<Task> {
    let none = EscalationPolicy::None;
    vec![
        task("t1", 1, "Thiết kế UI Dashboard", &["1", "2"], Difficulty::Hard, day(2025, 11, 1), day(2025, 11, 10), Status::Done, none),
        task("t2", 2, "Refactor Core API Authentication", &["1"], Difficulty::Hard, day(2025, 11, 3), day(2025, 11, 18), Status::InProgress, none),
        task("t3", 3, "Viết kiểm thử tích hợp", &["3"], Difficulty::Medium, day(2025, 11, 10), day(2025, 11, 25), Status::Todo, none),
        task("t4", 4, "Báo cáo tiến độ đầu tháng 11", &["1"], Difficulty::Easy, day(2025, 11, 1), day(2025, 11, 3), Status::Todo, EscalationPolicy::EmailOps),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_references_are_consistent() {
        let employees = employees();
        let projects = projects();
        for t in tasks() {
            assert!(projects.iter().any(|p| p.id == t.project_id));
            assert!(t.assignee_ids.iter().all(|a| employees.iter().any(|e| &e.id == a)));
            assert!(t.start_date <= t.deadline);
        }
        assert!(employees.iter().any(|e| e.is_admin()));
    }
}
