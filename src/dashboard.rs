//! Project performance report for a date window.
//!
//! Tasks count toward the window when their `[start_date, deadline]` span
//! touches it. KPIs and OKRs count when their resolved timeframe overlaps it;
//! KPI completion is always measured against every task of the project, not
//! only those in the window.

use chrono::NaiveDate;

use crate::board::overlapping;
use crate::employee::Employee;
use crate::fields::{Difficulty, Status};
use crate::goals::{average_okr_progress, KpiStatus, Kpi, Okr, Scheduled};
use crate::project::Project;
use crate::task::Task;
use crate::timeframe::{resolve_range, TimeframeRange};

/// Counts per status, in board order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    fn add(&mut self, status: Status) {
        match status {
            Status::Todo => self.todo += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Done => self.done += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyCounts {
    fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStats {
    pub status: StatusCounts,
    pub difficulty: DifficultyCounts,
    pub completion_percent: u32,
    pub total_kpis: usize,
    pub completed_kpis: usize,
    pub kpi_completion_percent: u32,
    pub average_okr_progress: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeePerformance {
    pub employee_id: String,
    pub name: String,
    pub total_tasks: usize,
    pub status: StatusCounts,
    pub difficulty: DifficultyCounts,
    pub kpi_count: usize,
    pub kpi_completed: usize,
    pub okr_average_progress: u32,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub stats: ProjectStats,
    /// Busiest employees first.
    pub employees: Vec<EmployeePerformance>,
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u32
    }
}

/// Build the report for `project` over `first..=last`.
///
/// `tasks` should be the project's own tasks.
pub fn build_dashboard(
    project: &Project,
    tasks: &[Task],
    employees: &[Employee],
    first: NaiveDate,
    last: NaiveDate,
) -> Dashboard {
    let window = TimeframeRange::from_days(first, last);
    let in_window = overlapping(tasks, first, last);
    let kpis: Vec<&Kpi> = project
        .kpis
        .iter()
        .filter(|k| resolve_range(&k.timeframe).overlaps(&window))
        .collect();
    let okrs: Vec<&Okr> = project
        .okrs
        .iter()
        .filter(|o| resolve_range(&o.timeframe).overlaps(&window))
        .collect();

    let mut status = StatusCounts::default();
    let mut difficulty = DifficultyCounts::default();
    for t in &in_window {
        status.add(t.status);
        difficulty.add(t.difficulty);
    }
    let completed_kpis = kpis.iter().filter(|k| KpiStatus::of(k, tasks).completed).count();

    let stats = ProjectStats {
        status,
        difficulty,
        completion_percent: percent(status.done, status.total()),
        total_kpis: kpis.len(),
        completed_kpis,
        kpi_completion_percent: percent(completed_kpis, kpis.len()),
        average_okr_progress: average_okr_progress(okrs.iter().copied()),
    };

    // Everyone touched by the window, in first-seen order.
    let mut ids: Vec<&str> = Vec::new();
    let seen = in_window
        .iter()
        .flat_map(|t| t.assignee_ids.iter().map(String::as_str))
        .chain(kpis.iter().map(|k| k.employee_id.as_str()))
        .chain(okrs.iter().map(|o| o.employee_id.as_str()));
    for id in seen {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let mut rows: Vec<EmployeePerformance> = ids
        .into_iter()
        .filter_map(|id| employees.iter().find(|e| e.id == id))
        .map(|employee| {
            let mut row = EmployeePerformance {
                employee_id: employee.id.clone(),
                name: employee.name.clone(),
                total_tasks: 0,
                status: StatusCounts::default(),
                difficulty: DifficultyCounts::default(),
                kpi_count: 0,
                kpi_completed: 0,
                okr_average_progress: 0,
            };
            for t in in_window.iter().filter(|t| t.is_assigned_to(&employee.id)) {
                row.total_tasks += 1;
                row.status.add(t.status);
                row.difficulty.add(t.difficulty);
            }
            let own_kpis: Vec<&&Kpi> = kpis.iter().filter(|k| k.employee_id() == employee.id).collect();
            row.kpi_count = own_kpis.len();
            row.kpi_completed = own_kpis.iter().filter(|k| KpiStatus::of(k, tasks).completed).count();
            row.okr_average_progress =
                average_okr_progress(okrs.iter().copied().filter(|o| o.employee_id() == employee.id));
            row
        })
        .collect();
    rows.sort_by(|a, b| b.total_tasks.cmp(&a.total_tasks));

    Dashboard { first, last, stats, employees: rows }
}
