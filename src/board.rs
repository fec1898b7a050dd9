//! Board, calendar and Gantt derivations over a task snapshot.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::fields::{Period, SortOrder, Status};
use crate::task::Task;
use crate::timeframe::{normalized_start, resolve_range, Timeframe};

/// Selection the board is currently showing.
#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    /// Only tasks with this assignee; `None` shows everyone's.
    pub assignee: Option<String>,
    /// Case-insensitive match against title, description or any tag.
    pub query: String,
    pub order: SortOrder,
}

impl BoardFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(ref id) = self.assignee {
            if !task.is_assigned_to(id) {
                return false;
            }
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&query)
            || task.description.to_lowercase().contains(&query)
            || task.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Tasks of one project that pass the filter, in input order.
pub fn filter_tasks<'a>(tasks: &'a [Task], project_id: &str, filter: &BoardFilter) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.project_id == project_id && filter.matches(t))
        .collect()
}

/// One Kanban column per status, in board order, each sorted by deadline.
/// Ties keep input order.
pub fn group_by_status<'a>(tasks: &[&'a Task], order: SortOrder) -> Vec<(Status, Vec<&'a Task>)> {
    Status::ALL
        .iter()
        .map(|&status| {
            let mut column: Vec<&Task> = tasks.iter().copied().filter(|t| t.status == status).collect();
            match order {
                SortOrder::Asc => column.sort_by_key(|t| t.deadline),
                SortOrder::Desc => column.sort_by(|a, b| b.deadline.cmp(&a.deadline)),
            }
            (status, column)
        })
        .collect()
}

/// Tasks keyed by deadline.
pub fn tasks_by_deadline<'a>(tasks: &[&'a Task]) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut map: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for t in tasks {
        map.entry(t.deadline).or_default().push(*t);
    }
    map
}

/// A cell of the six-week month calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
}

/// 42 consecutive days starting on the Sunday on or before the first of
/// `month`'s month, flagging which belong to that month.
pub fn calendar_grid(month: NaiveDate) -> Vec<CalendarDay> {
    let first = normalized_start(month, Period::Month);
    let start = normalized_start(first, Period::Week);
    (0..42)
        .map(|i| {
            let date = start + Duration::days(i);
            CalendarDay {
                date,
                in_month: date.year() == first.year() && date.month() == first.month(),
            }
        })
        .collect()
}

/// Position of a task bar on a month-wide Gantt chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GanttBar {
    /// Day of month (1-based) where the bar starts.
    pub start_day: u32,
    /// Inclusive length in days after clamping to the month.
    pub duration: u32,
}

/// Clamp a task's `[start_date, deadline]` span to the month containing
/// `month`. `None` when the task lies entirely outside it or its span is
/// inverted (start after deadline).
pub fn gantt_bar(task: &Task, month: NaiveDate) -> Option<GanttBar> {
    let range = resolve_range(&Timeframe::new(Period::Month, normalized_start(month, Period::Month)));
    let (first, last) = (range.first_day(), range.last_day());
    if task.start_date > task.deadline || task.deadline < first || task.start_date > last {
        return None;
    }
    let start = task.start_date.max(first);
    let end = task.deadline.min(last);
    Some(GanttBar {
        start_day: start.day(),
        duration: (end - start).num_days() as u32 + 1,
    })
}

/// Tasks with a bar in the month, ordered by start date.
pub fn gantt_rows<'a>(tasks: &[&'a Task], month: NaiveDate) -> Vec<(&'a Task, GanttBar)> {
    let mut rows: Vec<(&Task, GanttBar)> = tasks
        .iter()
        .filter_map(|t| gantt_bar(t, month).map(|bar| (*t, bar)))
        .collect();
    rows.sort_by_key(|(t, _)| t.start_date);
    rows
}

/// Tasks whose `[start_date, deadline]` span touches `first..=last`.
pub fn overlapping<'a>(tasks: &'a [Task], first: NaiveDate, last: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.start_date <= last && t.deadline >= first)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;
    use crate::timeframe::parse_date;

    fn task(id: &str, start: &str, deadline: &str, status: Status) -> Task {
        Task {
            id: id.into(),
            project_id: "p1".into(),
            sequence_id: 1,
            title: format!("Task {id}"),
            description: String::new(),
            assignee_ids: vec!["1".into()],
            priority: Priority::Medium,
            difficulty: Difficulty::Medium,
            start_date: parse_date(start).unwrap(),
            deadline: parse_date(deadline).unwrap(),
            status,
            notes: String::new(),
            comments: Vec::new(),
            tags: Vec::new(),
            attachments: Vec::new(),
            escalation: EscalationPolicy::None,
        }
    }

    #[test]
    fn filter_by_assignee_and_search() {
        let mut a = task("a", "2025-08-01", "2025-08-05", Status::Todo);
        a.title = "Design Landing Page".into();
        let mut b = task("b", "2025-08-01", "2025-08-05", Status::Todo);
        b.tags = vec!["Frontend".into()];
        b.assignee_ids = vec!["2".into()];
        let mut c = task("c", "2025-08-01", "2025-08-05", Status::Todo);
        c.project_id = "p2".into();
        let tasks = vec![a, b, c];

        let all = filter_tasks(&tasks, "p1", &BoardFilter::default());
        assert_eq!(all.len(), 2);

        let search = BoardFilter { query: "LANDING".into(), ..Default::default() };
        assert_eq!(filter_tasks(&tasks, "p1", &search)[0].id, "a");

        let tag = BoardFilter { query: "front".into(), ..Default::default() };
        assert_eq!(filter_tasks(&tasks, "p1", &tag)[0].id, "b");

        let mine = BoardFilter { assignee: Some("2".into()), ..Default::default() };
        assert_eq!(filter_tasks(&tasks, "p1", &mine).len(), 1);
    }

    #[test]
    fn columns_sorted_by_deadline() {
        let tasks = vec![
            task("late", "2025-08-01", "2025-08-20", Status::Todo),
            task("early", "2025-08-01", "2025-08-02", Status::Todo),
            task("done", "2025-08-01", "2025-08-10", Status::Done),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let asc = group_by_status(&refs, SortOrder::Asc);
        assert_eq!(asc.len(), 3);
        assert_eq!(asc[0].0, Status::Todo);
        assert_eq!(asc[0].1.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["early", "late"]);
        assert!(asc[1].1.is_empty());
        let desc = group_by_status(&refs, SortOrder::Desc);
        assert_eq!(desc[0].1[0].id, "late");
    }

    #[test]
    fn calendar_grid_starts_on_sunday() {
        // November 2025 starts on a Saturday.
        let grid = calendar_grid(parse_date("2025-11-15").unwrap());
        assert_eq!(grid.len(), 42);
        assert_eq!(grid[0].date, parse_date("2025-10-26").unwrap());
        assert!(!grid[0].in_month);
        assert_eq!(grid[6].date, parse_date("2025-11-01").unwrap());
        assert!(grid[6].in_month);
        assert_eq!(grid.iter().filter(|d| d.in_month).count(), 30);
    }

    #[test]
    fn gantt_bars_clamp_to_month() {
        let month = parse_date("2025-11-01").unwrap();
        let spans = task("a", "2025-10-28", "2025-11-03", Status::Todo);
        assert_eq!(gantt_bar(&spans, month), Some(GanttBar { start_day: 1, duration: 3 }));
        let inside = task("b", "2025-11-10", "2025-11-12", Status::Todo);
        assert_eq!(gantt_bar(&inside, month), Some(GanttBar { start_day: 10, duration: 3 }));
        let outside = task("c", "2025-12-01", "2025-12-02", Status::Todo);
        assert_eq!(gantt_bar(&outside, month), None);

        let tasks = vec![inside, spans, outside];
        let refs: Vec<&Task> = tasks.iter().collect();
        let rows = gantt_rows(&refs, month);
        assert_eq!(rows.iter().map(|(t, _)| t.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn inverted_span_has_no_bar() {
        let month = parse_date("2025-11-01").unwrap();
        let inverted = task("a", "2025-11-15", "2025-11-10", Status::Todo);
        assert_eq!(gantt_bar(&inverted, month), None);
        let tasks = vec![inverted];
        let refs: Vec<&Task> = tasks.iter().collect();
        assert!(gantt_rows(&refs, month).is_empty());
    }

    #[test]
    fn overlap_window_is_inclusive() {
        let tasks = vec![
            task("a", "2025-07-25", "2025-08-01", Status::Todo),
            task("b", "2025-08-31", "2025-09-05", Status::Todo),
            task("c", "2025-09-01", "2025-09-05", Status::Todo),
        ];
        let found = overlapping(&tasks, parse_date("2025-08-01").unwrap(), parse_date("2025-08-31").unwrap());
        assert_eq!(found.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
