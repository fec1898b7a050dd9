//! Application state and the mutations the front end may request.
//!
//! `AppState` owns every collection. Each mutation validates its input
//! first and only then touches state, so a failed call leaves everything
//! (including `revision`) as it was. Successful mutations bump `revision`.

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::employee::{Employee, EmployeeDraft};
use crate::error::{Error, Result};
use crate::fields::{format_status, Status};
use crate::goals::{validate_progress, Kpi, KpiDraft, Okr, OkrDraft};
use crate::notify::{compute_notifications, Notification};
use crate::project::{ActivityEntity, ActivityLog, EntityKind, Project, ProjectDraft};
use crate::task::{Comment, Task, TaskDraft};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub current_user: Option<Employee>,
    pub projects: Vec<Project>,
    pub active_project_id: Option<String>,
    pub tasks: Vec<Task>,
    pub employees: Vec<Employee>,
    /// Bumped by every successful mutation. Not persisted.
    pub revision: u64,
}

/// Next id of the form `{prefix}{n}`, one past the largest numeric suffix in use.
pub fn next_id<'a>(prefix: &str, ids: impl IntoIterator<Item = &'a str>) -> String {
    let max = ids
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", max + 1)
}

impl AppState {
    fn touch(&mut self) {
        self.revision += 1;
    }

    // ---- session ----

    /// Log in by employee id or email with a plaintext password.
    pub fn login(&mut self, account: &str, password: &str) -> Result<&Employee> {
        let employee = self
            .employees
            .iter()
            .find(|e| e.id == account || e.email.eq_ignore_ascii_case(account))
            .filter(|e| e.password.as_deref() == Some(password))
            .cloned()
            .ok_or(Error::InvalidCredentials)?;
        info!(employee = %employee.id, "logged in");
        self.current_user = Some(employee);
        self.touch();
        self.current_user()
    }

    pub fn logout(&mut self) {
        if self.current_user.take().is_some() {
            self.touch();
        }
    }

    pub fn current_user(&self) -> Result<&Employee> {
        self.current_user.as_ref().ok_or(Error::NotLoggedIn)
    }

    pub fn employee(&self, id: &str) -> Result<&Employee> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::not_found("employee", id))
    }

    // ---- projects ----

    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("project", id))
    }

    pub fn active_project(&self) -> Result<&Project> {
        let id = self.active_project_id.as_deref().ok_or(Error::NoActiveProject)?;
        self.project(id)
    }

    fn active_project_mut(&mut self) -> Result<&mut Project> {
        let id = self.active_project_id.clone().ok_or(Error::NoActiveProject)?;
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("project", id))
    }

    pub fn set_active_project(&mut self, id: &str) -> Result<()> {
        self.project(id)?;
        self.active_project_id = Some(id.to_string());
        self.touch();
        Ok(())
    }

    /// Point `active_project_id` at an existing project, or at nothing when
    /// there are no projects.
    pub fn repair_active_project(&mut self) {
        let valid = self
            .active_project_id
            .as_deref()
            .is_some_and(|id| self.projects.iter().any(|p| p.id == id));
        if !valid {
            let first = self.projects.first().map(|p| p.id.clone());
            if first != self.active_project_id {
                debug!(from = ?self.active_project_id, to = ?first, "active project repaired");
                self.active_project_id = first;
            }
        }
    }

    /// Create a project and make it the active one.
    pub fn create_project(&mut self, draft: ProjectDraft) -> Result<String> {
        draft.validate()?;
        let id = next_id("p", self.projects.iter().map(|p| p.id.as_str()));
        let contract_url = draft.contract_url().map(str::to_string);
        self.projects.push(Project {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            contract_url,
            milestones: draft.milestones,
            attachments: draft.attachments,
            activity_log: Vec::new(),
            kpis: Vec::new(),
            okrs: Vec::new(),
        });
        self.active_project_id = Some(id.clone());
        self.touch();
        info!(project = %id, "project created");
        Ok(id)
    }

    pub fn update_project(&mut self, id: &str, draft: ProjectDraft) -> Result<()> {
        draft.validate()?;
        let contract_url = draft.contract_url().map(str::to_string);
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("project", id))?;
        project.name = draft.name.trim().to_string();
        project.contract_url = contract_url;
        project.milestones = draft.milestones;
        project.attachments = draft.attachments;
        self.touch();
        Ok(())
    }

    /// Refused while any task still belongs to the project.
    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        self.project(id)?;
        if self.tasks.iter().any(|t| t.project_id == id) {
            info!(project = %id, "project deletion refused, tasks remain");
            return Err(Error::ProjectHasTasks(id.to_string()));
        }
        self.projects.retain(|p| p.id != id);
        if self.active_project_id.as_deref() == Some(id) {
            self.active_project_id = self.projects.first().map(|p| p.id.clone());
        }
        self.touch();
        info!(project = %id, "project deleted");
        Ok(())
    }

    /// Tasks of the active project.
    pub fn project_tasks(&self) -> Vec<&Task> {
        match self.active_project_id.as_deref() {
            Some(id) => self.tasks.iter().filter(|t| t.project_id == id).collect(),
            None => Vec::new(),
        }
    }

    // ---- activity ----

    /// Prepend an entry to the project's log. Skipped when nobody is logged in.
    fn record(&mut self, project_id: &str, action: String, entity: ActivityEntity, now: DateTime<Utc>) {
        let Some(author_id) = self.current_user.as_ref().map(|u| u.id.clone()) else {
            return;
        };
        let id = next_id(
            "act-",
            self.projects.iter().flat_map(|p| p.activity_log.iter().map(|a| a.id.as_str())),
        );
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == project_id) {
            project.log(ActivityLog { id, author_id, action, timestamp: now, entity });
        }
    }

    fn task_entity(task: &Task) -> ActivityEntity {
        ActivityEntity { kind: EntityKind::Task, id: task.id.clone(), title: task.title.clone() }
    }

    // ---- tasks ----

    pub fn task(&self, id: &str) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found("task", id))
    }

    fn check_assignees(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.employee(id)?;
        }
        Ok(())
    }

    /// Add a task to the active project. Its sequence id is one past the
    /// highest the project has ever kept, so numbers freed by deletion are
    /// not reused while a higher one exists.
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<String> {
        let (start_date, deadline) = draft.validate()?;
        let project_id = self.active_project()?.id.clone();
        self.check_assignees(&draft.assignee_ids)?;

        let id = next_id("t", self.tasks.iter().map(|t| t.id.as_str()));
        let sequence_id = self
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.sequence_id)
            .max()
            .unwrap_or(0)
            + 1;
        let task = Task {
            id: id.clone(),
            project_id: project_id.clone(),
            sequence_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            assignee_ids: draft.assignee_ids,
            priority: draft.priority,
            difficulty: draft.difficulty,
            start_date,
            deadline,
            status: draft.status,
            notes: draft.notes,
            comments: Vec::new(),
            tags: draft.tags,
            attachments: draft.attachments,
            escalation: draft.escalation,
        };
        let entity = Self::task_entity(&task);
        self.tasks.push(task);
        self.record(&project_id, "đã tạo công việc".to_string(), entity, now);
        self.touch();
        info!(task = %id, sequence_id, "task created");
        Ok(id)
    }

    /// Replace the editable fields of a task. Id, project, sequence id and
    /// comments are kept.
    pub fn update_task(&mut self, id: &str, draft: TaskDraft, now: DateTime<Utc>) -> Result<()> {
        let (start_date, deadline) = draft.validate()?;
        self.check_assignees(&draft.assignee_ids)?;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found("task", id))?;
        let old_status = task.status;
        task.title = draft.title.trim().to_string();
        task.description = draft.description;
        task.assignee_ids = draft.assignee_ids;
        task.priority = draft.priority;
        task.difficulty = draft.difficulty;
        task.start_date = start_date;
        task.deadline = deadline;
        task.status = draft.status;
        task.notes = draft.notes;
        task.tags = draft.tags;
        task.attachments = draft.attachments;
        task.escalation = draft.escalation;
        let (project_id, entity, status) = (task.project_id.clone(), Self::task_entity(task), task.status);
        if status != old_status {
            self.record_status_change(&project_id, status, entity, now);
        }
        self.touch();
        Ok(())
    }

    /// Board move: change only the status.
    pub fn move_task(&mut self, id: &str, status: Status, now: DateTime<Utc>) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found("task", id))?;
        if task.status == status {
            return Ok(());
        }
        task.status = status;
        let (project_id, entity) = (task.project_id.clone(), Self::task_entity(task));
        self.record_status_change(&project_id, status, entity, now);
        self.touch();
        Ok(())
    }

    fn record_status_change(&mut self, project_id: &str, status: Status, entity: ActivityEntity, now: DateTime<Utc>) {
        info!(task = %entity.id, ?status, "task status changed");
        let action = format!("đã đổi trạng thái công việc thành \"{}\" cho", format_status(status));
        self.record(project_id, action, entity, now);
    }

    pub fn delete_task(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let task = self.task(id)?;
        let (project_id, entity) = (task.project_id.clone(), Self::task_entity(task));
        self.tasks.retain(|t| t.id != id);
        self.record(&project_id, "đã xóa công việc".to_string(), entity, now);
        self.touch();
        info!(task = %id, "task deleted");
        Ok(())
    }

    /// Append a comment by the current user.
    pub fn add_comment(&mut self, task_id: &str, text: &str, now: DateTime<Utc>) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::MissingField("comment"));
        }
        let author_id = self.current_user()?.id.clone();
        let id = next_id(
            "c",
            self.tasks.iter().flat_map(|t| t.comments.iter().map(|c| c.id.as_str())),
        );
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::not_found("task", task_id))?;
        task.comments.push(Comment { id: id.clone(), author_id, text: text.to_string(), timestamp: now });
        let (project_id, entity) = (task.project_id.clone(), Self::task_entity(task));
        self.record(&project_id, "đã bình luận về công việc".to_string(), entity, now);
        self.touch();
        Ok(id)
    }

    // ---- employees ----

    pub fn create_employee(&mut self, draft: EmployeeDraft) -> Result<String> {
        draft.validate(true)?;
        let id = next_id("", self.employees.iter().map(|e| e.id.as_str()));
        self.employees.push(Employee {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            avatar_url: format!("https://picsum.photos/seed/{id}/100"),
            role: draft.role,
            email: draft.email.trim().to_string(),
            phone: draft.phone.clone(),
            dob: draft.dob.clone(),
            password: draft.password().map(str::to_string),
        });
        self.touch();
        info!(employee = %id, "employee created");
        Ok(id)
    }

    /// A blank password keeps the stored one.
    pub fn update_employee(&mut self, id: &str, draft: EmployeeDraft) -> Result<()> {
        draft.validate(false)?;
        let employee = self
            .employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::not_found("employee", id))?;
        employee.name = draft.name.trim().to_string();
        employee.role = draft.role;
        employee.email = draft.email.trim().to_string();
        employee.phone = draft.phone.clone();
        employee.dob = draft.dob.clone();
        if let Some(password) = draft.password() {
            employee.password = Some(password.to_string());
        }
        let updated = employee.clone();
        if self.current_user.as_ref().is_some_and(|u| u.id == id) {
            self.current_user = Some(updated);
        }
        self.touch();
        Ok(())
    }

    /// Refused while any task lists the employee as an assignee.
    pub fn delete_employee(&mut self, id: &str) -> Result<()> {
        self.employee(id)?;
        if self.tasks.iter().any(|t| t.is_assigned_to(id)) {
            info!(employee = %id, "employee deletion refused, still assigned");
            return Err(Error::EmployeeHasTasks(id.to_string()));
        }
        self.employees.retain(|e| e.id != id);
        if self.current_user.as_ref().is_some_and(|u| u.id == id) {
            self.current_user = None;
        }
        self.touch();
        info!(employee = %id, "employee deleted");
        Ok(())
    }

    // ---- goals ----

    pub fn create_kpi(&mut self, draft: KpiDraft) -> Result<String> {
        let target = draft.validate()?;
        self.employee(&draft.employee_id)?;
        let id = next_id("kpi", self.projects.iter().flat_map(|p| p.kpis.iter().map(|k| k.id.as_str())));
        let project = self.active_project_mut()?;
        project.kpis.push(Kpi {
            id: id.clone(),
            employee_id: draft.employee_id,
            project_id: project.id.clone(),
            title: draft.title.trim().to_string(),
            target,
            timeframe: draft.timeframe,
        });
        self.touch();
        Ok(id)
    }

    pub fn update_kpi(&mut self, id: &str, draft: KpiDraft) -> Result<()> {
        let target = draft.validate()?;
        self.employee(&draft.employee_id)?;
        let kpi = self
            .active_project_mut()?
            .kpis
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| Error::not_found("KPI", id))?;
        kpi.employee_id = draft.employee_id;
        kpi.title = draft.title.trim().to_string();
        kpi.target = target;
        kpi.timeframe = draft.timeframe;
        self.touch();
        Ok(())
    }

    pub fn delete_kpi(&mut self, id: &str) -> Result<()> {
        let project = self.active_project_mut()?;
        let before = project.kpis.len();
        project.kpis.retain(|k| k.id != id);
        if project.kpis.len() == before {
            return Err(Error::not_found("KPI", id));
        }
        self.touch();
        Ok(())
    }

    fn key_result_ids(&self) -> Vec<String> {
        self.projects
            .iter()
            .flat_map(|p| p.okrs.iter())
            .flat_map(|o| o.key_results.iter().map(|kr| kr.id.clone()))
            .collect()
    }

    /// Allocates key-result ids without colliding with `taken` or each other.
    fn key_result_id_source(taken: Vec<String>) -> impl FnMut() -> String {
        let mut taken = taken;
        move || {
            let id = next_id("kr", taken.iter().map(String::as_str));
            taken.push(id.clone());
            id
        }
    }

    pub fn create_okr(&mut self, draft: OkrDraft) -> Result<String> {
        draft.validate()?;
        self.employee(&draft.employee_id)?;
        let id = next_id("okr", self.projects.iter().flat_map(|p| p.okrs.iter().map(|o| o.id.as_str())));
        let key_results = draft.key_results(None, Self::key_result_id_source(self.key_result_ids()));
        let project = self.active_project_mut()?;
        project.okrs.push(Okr {
            id: id.clone(),
            employee_id: draft.employee_id,
            project_id: project.id.clone(),
            objective: draft.objective.trim().to_string(),
            key_results,
            timeframe: draft.timeframe,
        });
        self.touch();
        Ok(id)
    }

    pub fn update_okr(&mut self, id: &str, draft: OkrDraft) -> Result<()> {
        draft.validate()?;
        self.employee(&draft.employee_id)?;
        let ids = Self::key_result_id_source(self.key_result_ids());
        let okr = self
            .active_project_mut()?
            .okrs
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::not_found("OKR", id))?;
        okr.key_results = draft.key_results(Some(&*okr), ids);
        okr.employee_id = draft.employee_id;
        okr.objective = draft.objective.trim().to_string();
        okr.timeframe = draft.timeframe;
        self.touch();
        Ok(())
    }

    pub fn delete_okr(&mut self, id: &str) -> Result<()> {
        let project = self.active_project_mut()?;
        let before = project.okrs.len();
        project.okrs.retain(|o| o.id != id);
        if project.okrs.len() == before {
            return Err(Error::not_found("OKR", id));
        }
        self.touch();
        Ok(())
    }

    /// Set one key result's manual progress (0..=100).
    pub fn set_key_result_progress(&mut self, okr_id: &str, key_result_id: &str, progress: i64) -> Result<()> {
        let progress = validate_progress(progress)?;
        let okr = self
            .active_project_mut()?
            .okrs
            .iter_mut()
            .find(|o| o.id == okr_id)
            .ok_or_else(|| Error::not_found("OKR", okr_id))?;
        let kr = okr
            .key_results
            .iter_mut()
            .find(|kr| kr.id == key_result_id)
            .ok_or_else(|| Error::not_found("key result", key_result_id))?;
        kr.progress = progress;
        self.touch();
        Ok(())
    }

    // ---- derived ----

    /// Notifications for the logged-in user; empty when nobody is logged in.
    pub fn notifications<Tz: TimeZone>(
        &self,
        previous: &[Notification],
        now: &DateTime<Tz>,
        escalation_recipient: &str,
    ) -> Vec<Notification> {
        match &self.current_user {
            Some(viewer) => compute_notifications(
                &self.tasks,
                &self.employees,
                viewer,
                previous,
                now,
                escalation_recipient,
            ),
            None => Vec::new(),
        }
    }
}
