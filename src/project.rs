//! Projects, their milestones and activity history.
//!
//! A project owns its KPIs and OKRs directly. Both collections are always
//! present (possibly empty) so callers never have to tell "missing" from "none".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::goals::{Kpi, Okr};
use crate::task::{validate_url, Attachment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_url: Option<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Newest entry first.
    #[serde(default)]
    pub activity_log: Vec<ActivityLog>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
    #[serde(default)]
    pub okrs: Vec<Okr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub author_id: String,
    /// Localized action phrase, e.g. `đã tạo công việc`.
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub entity: ActivityEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Task,
    Comment,
    Project,
}

/// What an activity entry refers to. The title is captured at logging time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
}

impl Project {
    /// Record an activity, newest first.
    pub fn log(&mut self, entry: ActivityLog) {
        self.activity_log.insert(0, entry);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub contract_url: Option<String>,
    pub milestones: Vec<Milestone>,
    pub attachments: Vec<Attachment>,
}

impl ProjectDraft {
    pub fn from_project(project: &Project) -> Self {
        ProjectDraft {
            name: project.name.clone(),
            contract_url: project.contract_url.clone(),
            milestones: project.milestones.clone(),
            attachments: project.attachments.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField("project name"));
        }
        if let Some(url) = self.contract_url() {
            validate_url(url)?;
        }
        Ok(())
    }

    /// Contract URL, treating blank input as absent.
    pub fn contract_url(&self) -> Option<&str> {
        self.contract_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}
