//! Task data structure and the form payload used to create or edit one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::fields::*;

/// A unit of work on a project's board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    /// Per-project display number (`#N`), assigned once at creation.
    pub sequence_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub escalation: EscalationPolicy,
}

impl Task {
    pub fn is_assigned_to(&self, employee_id: &str) -> bool {
        self.assignee_ids.iter().any(|id| id == employee_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A named link to an external file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl Attachment {
    /// Build an attachment after checking that both fields are present and the URL is usable.
    pub fn new(id: String, name: &str, url: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::MissingField("attachment name"));
        }
        if url.trim().is_empty() {
            return Err(Error::MissingField("attachment url"));
        }
        validate_url(url)?;
        Ok(Attachment {
            id,
            name: name.trim().to_string(),
            url: url.trim().to_string(),
        })
    }
}

/// Fields a caller supplies when creating or editing a task.
///
/// Dates are optional here so that a missing date is reported as a
/// validation error rather than being impossible to express.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub assignee_ids: Vec<String>,
    pub priority: Priority,
    pub difficulty: Difficulty,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub status: Status,
    pub notes: String,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub escalation: EscalationPolicy,
}

impl TaskDraft {
    /// Seed a draft from an existing task, for partial edits.
    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            title: task.title.clone(),
            description: task.description.clone(),
            assignee_ids: task.assignee_ids.clone(),
            priority: task.priority,
            difficulty: task.difficulty,
            start_date: Some(task.start_date),
            deadline: Some(task.deadline),
            status: task.status,
            notes: task.notes.clone(),
            tags: task.tags.clone(),
            attachments: task.attachments.clone(),
            escalation: task.escalation,
        }
    }

    /// Check required fields and date order; returns the validated date pair.
    pub fn validate(&self) -> Result<(NaiveDate, NaiveDate)> {
        if self.title.trim().is_empty() {
            return Err(Error::MissingField("title"));
        }
        let start = self.start_date.ok_or(Error::MissingField("start date"))?;
        let deadline = self.deadline.ok_or(Error::MissingField("deadline"))?;
        if start > deadline {
            return Err(Error::StartAfterDeadline { start, deadline });
        }
        Ok((start, deadline))
    }
}

/// Split comma-separated tag strings, trimming each and dropping empties.
/// Order of first appearance is kept; duplicates are removed.
pub fn split_tags(inputs: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = part.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}

/// Accept absolute http(s) URLs with a non-empty host.
pub fn validate_url(raw: &str) -> Result<()> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).map_err(|_| Error::InvalidUrl(raw.to_string()))?;
    let web = matches!(parsed.scheme(), "http" | "https");
    if !web || parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidUrl(raw.to_string()));
    }
    Ok(())
}
