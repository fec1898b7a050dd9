//! File-backed persistence.
//!
//! State is stored as one JSON document per top-level key (`currentUser`,
//! `projects`, `activeProjectId`, `tasks`, `employees`) in the data
//! directory. Every save rewrites each whole collection; keys are written
//! independently, so there is no transaction spanning them. A key that is
//! missing, unreadable or unparsable loads as its built-in default.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::notify::Notification;
use crate::seed;
use crate::state::AppState;

pub const KEY_CURRENT_USER: &str = "currentUser";
pub const KEY_PROJECTS: &str = "projects";
pub const KEY_ACTIVE_PROJECT: &str = "activeProjectId";
pub const KEY_TASKS: &str = "tasks";
pub const KEY_EMPLOYEES: &str = "employees";
/// Last computed notification list, kept only for its read flags.
pub const KEY_NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read one key. `None` when absent or unusable; failures are logged, never returned.
    pub fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        if !path.exists() {
            return None;
        }
        let buf = match fs::read_to_string(&path) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(key, error = %e, "error reading stored value, using default");
                return None;
            }
        };
        match serde_json::from_str(&buf) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "error parsing stored value, using default");
                None
            }
        }
    }

    /// Write one key using an atomic temp-file + rename.
    pub fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(value)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Load the whole state, substituting defaults key by key.
    pub fn load(&self) -> AppState {
        let projects = self.read_key(KEY_PROJECTS).unwrap_or_else(seed::projects);
        let active_project_id = match self.read_key::<Option<String>>(KEY_ACTIVE_PROJECT) {
            Some(id) => id,
            None => seed::projects().first().map(|p| p.id.clone()),
        };
        let mut state = AppState {
            current_user: self.read_key(KEY_CURRENT_USER).unwrap_or(None),
            projects,
            active_project_id,
            tasks: self.read_key(KEY_TASKS).unwrap_or_else(seed::tasks),
            employees: self.read_key(KEY_EMPLOYEES).unwrap_or_else(seed::employees),
            revision: 0,
        };
        state.repair_active_project();
        debug!(dir = %self.dir.display(), tasks = state.tasks.len(), "state loaded");
        state
    }

    /// Persist every key.
    pub fn save(&self, state: &AppState) -> Result<()> {
        self.write_key(KEY_CURRENT_USER, &state.current_user)?;
        self.write_key(KEY_PROJECTS, &state.projects)?;
        self.write_key(KEY_ACTIVE_PROJECT, &state.active_project_id)?;
        self.write_key(KEY_TASKS, &state.tasks)?;
        self.write_key(KEY_EMPLOYEES, &state.employees)?;
        Ok(())
    }

    pub fn load_notifications(&self) -> Vec<Notification> {
        self.read_key(KEY_NOTIFICATIONS).unwrap_or_default()
    }

    pub fn save_notifications(&self, notifications: &[Notification]) -> Result<()> {
        self.write_key(KEY_NOTIFICATIONS, notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;

    #[test]
    fn empty_dir_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let state = Store::new(tmp.path()).load();
        assert!(state.current_user.is_none());
        assert_eq!(state.projects, seed::projects());
        assert_eq!(state.tasks, seed::tasks());
        assert_eq!(state.active_project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn save_then_load_keeps_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let mut state = store.load();
        state.tasks[0].status = Status::Todo;
        state.current_user = state.employees.first().cloned();
        state.active_project_id = Some("p2".into());
        store.save(&state).unwrap();

        let back = store.load();
        assert_eq!(back.tasks, state.tasks);
        assert_eq!(back.current_user, state.current_user);
        assert_eq!(back.active_project_id.as_deref(), Some("p2"));
        assert!(tmp.path().join("tasks.json").exists());
        assert!(!tmp.path().join("tasks.json.tmp").exists());
    }

    #[test]
    fn corrupt_key_falls_back_without_touching_others() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store.write_key(KEY_TASKS, &Vec::<crate::task::Task>::new()).unwrap();
        fs::write(tmp.path().join("employees.json"), "[{broken").unwrap();

        let state = store.load();
        assert!(state.tasks.is_empty());
        assert_eq!(state.employees, seed::employees());
    }

    #[test]
    fn stale_active_project_is_repaired() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store.write_key(KEY_ACTIVE_PROJECT, &Some("gone")).unwrap();
        assert_eq!(store.load().active_project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn browser_dump_with_localized_labels_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let dump = r#"[{
            "id": "t-demo", "projectId": "p1", "sequenceId": 99, "title": "Báo cáo",
            "description": "", "assigneeIds": ["1"], "priority": "Cao", "difficulty": "Dễ",
            "startDate": "2025-11-01", "deadline": "2025-11-03", "status": "Cần làm",
            "notes": "", "comments": [], "tags": [], "attachments": []
        }]"#;
        fs::write(tmp.path().join("tasks.json"), dump).unwrap();
        let state = Store::new(tmp.path()).load();
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].status, Status::Todo);
    }
}
