use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("start date {start} is after deadline {deadline}")]
    StartAfterDeadline { start: NaiveDate, deadline: NaiveDate },
    #[error("project {0} still has tasks and cannot be deleted")]
    ProjectHasTasks(String),
    #[error("employee {0} is still assigned to tasks and cannot be deleted")]
    EmployeeHasTasks(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("several tasks are named '{0}', use the id or #number instead")]
    AmbiguousTask(String),
    #[error("wrong password or unknown account")]
    InvalidCredentials,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("no active project")]
    NoActiveProject,
    #[error("KPI target must be at least 1, got {0}")]
    InvalidTarget(i64),
    #[error("an OKR needs at least one key result")]
    NoKeyResults,
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }
}
