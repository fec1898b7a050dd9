//! KPI and OKR definitions and their progress computations.
//!
//! A KPI counts completed tasks: those in the KPI's project, assigned to its
//! employee, marked done, with a deadline inside the KPI's resolved timeframe.
//! An OKR's progress is the mean of its key results, which owners set by hand.
//! Nothing here is cached; callers recompute whenever tasks change.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::Status;
use crate::task::Task;
use crate::timeframe::{resolve_range, same_bucket, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: String,
    pub employee_id: String,
    pub project_id: String,
    pub title: String,
    /// Number of completed tasks that meets the KPI. Always at least 1.
    pub target: u32,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: String,
    pub title: String,
    /// 0..=100
    pub progress: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Okr {
    pub id: String,
    pub employee_id: String,
    pub project_id: String,
    pub objective: String,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    pub timeframe: Timeframe,
}

/// Anything reported against a timeframe bucket.
pub trait Scheduled {
    fn timeframe(&self) -> &Timeframe;
    fn employee_id(&self) -> &str;
}

impl Scheduled for Kpi {
    fn timeframe(&self) -> &Timeframe {
        &self.timeframe
    }
    fn employee_id(&self) -> &str {
        &self.employee_id
    }
}

impl Scheduled for Okr {
    fn timeframe(&self) -> &Timeframe {
        &self.timeframe
    }
    fn employee_id(&self) -> &str {
        &self.employee_id
    }
}

/// Goals whose timeframe falls in the same bucket as `view`, in input order.
pub fn in_bucket<'a, G: Scheduled>(goals: &'a [G], view: &Timeframe) -> Vec<&'a G> {
    goals.iter().filter(|g| same_bucket(g.timeframe(), view)).collect()
}

/// Raw number of completed tasks counting toward a KPI. Not capped at the target.
pub fn kpi_progress(kpi: &Kpi, tasks: &[Task]) -> usize {
    let range = resolve_range(&kpi.timeframe);
    tasks
        .iter()
        .filter(|t| {
            t.project_id == kpi.project_id
                && t.is_assigned_to(&kpi.employee_id)
                && t.status == Status::Done
                && range.contains(t.deadline)
        })
        .count()
}

/// Display figures for a KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiStatus {
    pub count: usize,
    pub target: u32,
    /// `count / target` as a rounded percentage, capped at 100.
    pub percentage: u32,
    pub completed: bool,
}

impl KpiStatus {
    pub fn of(kpi: &Kpi, tasks: &[Task]) -> Self {
        let count = kpi_progress(kpi, tasks);
        let percentage = if kpi.target > 0 {
            ((count as f64 / kpi.target as f64) * 100.0).round().min(100.0) as u32
        } else {
            0
        };
        KpiStatus {
            count,
            target: kpi.target,
            percentage,
            completed: count >= kpi.target as usize,
        }
    }
}

/// Unweighted mean of key-result progress, rounded; 0 with no key results.
pub fn okr_progress(okr: &Okr) -> u32 {
    mean_rounded(okr.key_results.iter().map(|kr| kr.progress as f64))
}

/// Mean of per-OKR averages (unrounded), then rounded. 0 for no OKRs.
pub fn average_okr_progress<'a>(okrs: impl IntoIterator<Item = &'a Okr>) -> u32 {
    mean_rounded(okrs.into_iter().map(okr_mean))
}

fn okr_mean(okr: &Okr) -> f64 {
    if okr.key_results.is_empty() {
        return 0.0;
    }
    okr.key_results.iter().map(|kr| kr.progress as f64).sum::<f64>() / okr.key_results.len() as f64
}

fn mean_rounded(values: impl Iterator<Item = f64>) -> u32 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0
    } else {
        (sum / n as f64).round() as u32
    }
}

pub fn validate_progress(progress: i64) -> Result<u32> {
    if !(0..=100).contains(&progress) {
        return Err(Error::ProgressOutOfRange(progress));
    }
    Ok(progress as u32)
}

#[derive(Debug, Clone)]
pub struct KpiDraft {
    pub employee_id: String,
    pub title: String,
    pub target: i64,
    pub timeframe: Timeframe,
}

impl KpiDraft {
    pub fn validate(&self) -> Result<u32> {
        if self.title.trim().is_empty() {
            return Err(Error::MissingField("KPI title"));
        }
        if self.employee_id.trim().is_empty() {
            return Err(Error::MissingField("employee"));
        }
        if self.target < 1 || self.target > u32::MAX as i64 {
            return Err(Error::InvalidTarget(self.target));
        }
        Ok(self.target as u32)
    }
}

#[derive(Debug, Clone)]
pub struct OkrDraft {
    pub employee_id: String,
    pub objective: String,
    pub key_result_titles: Vec<String>,
    pub timeframe: Timeframe,
}

impl OkrDraft {
    pub fn validate(&self) -> Result<()> {
        if self.objective.trim().is_empty() {
            return Err(Error::MissingField("objective"));
        }
        if self.employee_id.trim().is_empty() {
            return Err(Error::MissingField("employee"));
        }
        if self.titles().next().is_none() {
            return Err(Error::NoKeyResults);
        }
        Ok(())
    }

    fn titles(&self) -> impl Iterator<Item = &str> {
        self.key_result_titles.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
    }

    /// Build key results from the non-blank titles. When editing, the key
    /// result at the same position keeps its id and progress.
    pub fn key_results(&self, existing: Option<&Okr>, mut new_id: impl FnMut() -> String) -> Vec<KeyResult> {
        self.titles()
            .enumerate()
            .map(|(i, title)| match existing.and_then(|o| o.key_results.get(i)) {
                Some(kr) => KeyResult { id: kr.id.clone(), title: title.to_string(), progress: kr.progress },
                None => KeyResult { id: new_id(), title: title.to_string(), progress: 0 },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;
    use crate::timeframe::parse_date;

    fn task(id: &str, project: &str, assignee: &str, deadline: &str, status: Status) -> Task {
        let deadline = parse_date(deadline).unwrap();
        Task {
            id: id.into(),
            project_id: project.into(),
            sequence_id: 1,
            title: format!("Task {id}"),
            description: String::new(),
            assignee_ids: vec![assignee.into()],
            priority: Priority::Medium,
            difficulty: Difficulty::Hard,
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

    fn q4_kpi(target: u32) -> Kpi {
        Kpi {
            id: "kpi1".into(),
            employee_id: "1".into(),
            project_id: "p1".into(),
            title: "Finish hard tasks".into(),
            target,
            timeframe: Timeframe::new(Period::Quarter, parse_date("2025-10-01").unwrap()),
        }
    }

    fn okr(progress: &[u32]) -> Okr {
        Okr {
            id: "okr1".into(),
            employee_id: "1".into(),
            project_id: "p1".into(),
            objective: "Ship it".into(),
            key_results: progress
                .iter()
                .enumerate()
                .map(|(i, p)| KeyResult { id: format!("kr{i}"), title: format!("KR {i}"), progress: *p })
                .collect(),
            timeframe: Timeframe::new(Period::Quarter, parse_date("2025-10-01").unwrap()),
        }
    }

    #[test]
    fn kpi_counts_only_matching_done_tasks_in_range() {
        let tasks = vec![
            task("a", "p1", "1", "2025-10-01", Status::Done),
            task("b", "p1", "1", "2025-11-15", Status::Done),
            task("c", "p1", "1", "2025-12-31", Status::Done),
            task("d", "p1", "1", "2026-01-01", Status::Done),
            task("e", "p1", "1", "2025-11-20", Status::InProgress),
            task("f", "p2", "1", "2025-11-20", Status::Done),
            task("g", "p1", "2", "2025-11-20", Status::Done),
            task("h", "p1", "1", "2025-09-30", Status::Done),
        ];
        let status = KpiStatus::of(&q4_kpi(5), &tasks);
        assert_eq!(status.count, 3);
        assert_eq!(status.percentage, 60);
        assert!(!status.completed);
    }

    #[test]
    fn kpi_progress_is_uncapped_and_monotonic() {
        let kpi = q4_kpi(2);
        let mut tasks = Vec::new();
        let mut last = 0;
        for i in 0..4 {
            tasks.push(task(&format!("t{i}"), "p1", "1", "2025-11-01", Status::Done));
            let now = kpi_progress(&kpi, &tasks);
            assert!(now >= last);
            last = now;
        }
        let status = KpiStatus::of(&kpi, &tasks);
        assert_eq!(status.count, 4);
        assert_eq!(status.percentage, 100);
        assert!(status.completed);
    }

    #[test]
    fn okr_progress_is_rounded_mean() {
        assert_eq!(okr_progress(&okr(&[40, 60])), 50);
        assert_eq!(okr_progress(&okr(&[10, 15])), 13);
        assert_eq!(okr_progress(&okr(&[33, 33, 34])), 33);
        assert_eq!(okr_progress(&okr(&[])), 0);
    }

    #[test]
    fn average_okr_progress_uses_unrounded_means() {
        let okrs = [okr(&[10, 15]), okr(&[20])];
        // (12.5 + 20) / 2 = 16.25
        assert_eq!(average_okr_progress(okrs.iter()), 16);
        assert_eq!(average_okr_progress(std::iter::empty()), 0);
    }

    #[test]
    fn bucket_filter_matches_any_anchor_in_bucket() {
        let mut a = q4_kpi(1);
        a.timeframe.date = parse_date("2025-11-20").unwrap();
        let mut b = q4_kpi(1);
        b.timeframe.date = parse_date("2026-01-05").unwrap();
        let kpis = vec![a, b];
        let view = Timeframe::new(Period::Quarter, parse_date("2025-10-01").unwrap());
        let found = in_bucket(&kpis, &view);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timeframe.date, parse_date("2025-11-20").unwrap());
    }

    #[test]
    fn kpi_draft_target_must_be_positive() {
        let draft = KpiDraft {
            employee_id: "1".into(),
            title: "Close tickets".into(),
            target: 0,
            timeframe: Timeframe::new(Period::Month, parse_date("2025-08-01").unwrap()),
        };
        assert!(matches!(draft.validate(), Err(Error::InvalidTarget(0))));
        assert_eq!(KpiDraft { target: 10, ..draft }.validate().unwrap(), 10);
    }

    #[test]
    fn okr_draft_drops_blank_key_results_and_keeps_positions() {
        let existing = okr(&[70, 20]);
        let draft = OkrDraft {
            employee_id: "1".into(),
            objective: "Ship it".into(),
            key_result_titles: vec!["First".into(), "  ".into(), "Second".into(), "Third".into()],
            timeframe: existing.timeframe,
        };
        assert!(draft.validate().is_ok());
        let mut n = 0;
        let krs = draft.key_results(Some(&existing), || {
            n += 1;
            format!("new{n}")
        });
        assert_eq!(krs.len(), 3);
        assert_eq!((krs[0].id.as_str(), krs[0].progress), ("kr0", 70));
        assert_eq!((krs[1].id.as_str(), krs[1].title.as_str(), krs[1].progress), ("kr1", "Second", 20));
        assert_eq!((krs[2].id.as_str(), krs[2].progress), ("new1", 0));

        let empty = OkrDraft { key_result_titles: vec![" ".into()], ..draft };
        assert!(matches!(empty.validate(), Err(Error::NoKeyResults)));
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(validate_progress(100).unwrap(), 100);
        assert!(matches!(validate_progress(101), Err(Error::ProgressOutOfRange(101))));
        assert!(validate_progress(-1).is_err());
    }
}
