//! Command implementations for the CLI interface.
//!
//! Each handler loads nothing itself: `main` opens a [`Context`] (data dir,
//! config, loaded state and the current instant) and dispatches here. Handlers
//! return `Result` and save the state after a successful mutation.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};
use tracing::debug;

use crate::board::{calendar_grid, filter_tasks, gantt_rows, group_by_status, tasks_by_deadline, BoardFilter};
use crate::config::Config;
use crate::dashboard::build_dashboard;
use crate::employee::EmployeeDraft;
use crate::error::{Error, Result};
use crate::fields::*;
use crate::goals::{in_bucket, okr_progress, KpiDraft, KpiStatus, OkrDraft};
use crate::notify::{mailto_uri, mark_all_read, mark_read, unread_count, Notification};
use crate::project::{Milestone, ProjectDraft};
use crate::state::{next_id, AppState};
use crate::storage::Store;
use crate::task::{split_tags, Attachment, Task, TaskDraft};
use crate::timeframe::{format_date_vi, format_timeframe, parse_date, Timeframe};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with an employee id or email.
    Login {
        /// Employee id or email.
        account: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the logged-in user.
    Logout,

    /// Show the logged-in user, active project and unread notifications.
    Whoami,

    /// Manage tasks of the active project.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage employees.
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Manage projects and pick the active one.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage KPIs of the active project.
    Kpi {
        #[command(subcommand)]
        action: KpiAction,
    },

    /// Manage OKRs of the active project.
    Okr {
        #[command(subcommand)]
        action: OkrAction,
    },

    /// Deadline reminders and overdue alerts for the logged-in user.
    Notifications {
        #[command(subcommand)]
        action: NotifyAction,
    },

    /// Month calendar of task deadlines.
    Calendar {
        /// Any day of the month to show (default: this month).
        #[arg(long)]
        month: Option<String>,
        /// List the tasks due on this day instead of the grid.
        #[arg(long)]
        day: Option<String>,
        /// Only tasks assigned to the logged-in user.
        #[arg(long)]
        mine: bool,
    },

    /// Month Gantt chart of task spans.
    Gantt {
        /// Any day of the month to show (default: this month).
        #[arg(long)]
        month: Option<String>,
    },

    /// Project statistics and per-employee performance.
    Dashboard {
        #[command(flatten)]
        view: TimeframeArgs,
        /// Window start; together with --to overrides the timeframe.
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Window end (inclusive).
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Reporting bucket selection shared by goal and dashboard commands.
#[derive(Args, Debug, Clone)]
pub struct TimeframeArgs {
    /// Bucket length.
    #[arg(long, value_enum, default_value_t = Period::Month)]
    pub period: Period,
    /// Any day inside the bucket (default: today).
    #[arg(long)]
    pub date: Option<String>,
    /// Move by this many buckets, e.g. -1 for the previous one.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub shift: i32,
}

impl TimeframeArgs {
    pub fn timeframe(&self, today: NaiveDate) -> Result<Timeframe> {
        let date = match &self.date {
            Some(s) => parse_date_input(s, today)?,
            None => today,
        };
        Ok(Timeframe::bucket_of(self.period, date).shifted(self.shift))
    }
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the active project.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Assignee employee ids. May be repeated or comma-separated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long, value_enum, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,
        /// Start date: YYYY-MM-DD, "today", "tomorrow" or "in Nd" (default: today).
        #[arg(long)]
        start: Option<String>,
        /// Deadline, same formats as --start.
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
        #[arg(long)]
        notes: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Attachment as NAME=URL or URL. May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<String>,
        /// Email the ops mailbox when this task goes overdue.
        #[arg(long, value_enum, default_value_t = EscalationPolicy::None)]
        escalation: EscalationPolicy,
    },

    /// Show the board: one column per status.
    List {
        /// Only tasks assigned to this employee id.
        #[arg(long)]
        assignee: Option<String>,
        /// Only tasks assigned to the logged-in user.
        #[arg(long, conflicts_with = "assignee")]
        mine: bool,
        /// Search title, description and tags.
        #[arg(long)]
        search: Option<String>,
        /// Deadline order inside each column.
        #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
        order: SortOrder,
    },

    /// View a task by id, #number or title.
    View {
        /// Task id, #number or title
        task: String,
    },

    /// Update fields on a task.
    Edit {
        /// Task id, #number or title
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Replace the assignees. May be repeated or comma-separated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long)]
        notes: Option<String>,
        /// Add tags. May be repeated and comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove tags. May be repeated and comma-separated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
        /// Add an attachment as NAME=URL or URL.
        #[arg(long = "attach")]
        attachments: Vec<String>,
        #[arg(long, value_enum)]
        escalation: Option<EscalationPolicy>,
    },

    /// Move a task to another board column.
    Move {
        /// Task id, #number or title
        task: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Delete a task.
    Delete {
        /// Task id, #number or title
        task: String,
    },

    /// Comment on a task as the logged-in user.
    Comment {
        /// Task id, #number or title
        task: String,
        text: String,
    },
}

#[derive(Subcommand)]
pub enum EmployeeAction {
    /// Add an employee account.
    Add {
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = Role::Member)]
        role: Role,
        #[arg(long)]
        phone: Option<String>,
        /// Date of birth.
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// Update an employee. Omitted fields keep their value.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_enum)]
        role: Option<Role>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete an employee with no assigned tasks.
    Delete { id: String },
    /// List employees.
    List,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project and switch to it.
    Add {
        name: String,
        #[arg(long)]
        contract_url: Option<String>,
        /// Milestone as NAME=DATE. May be repeated.
        #[arg(long = "milestone")]
        milestones: Vec<String>,
        /// Attachment as NAME=URL or URL. May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },
    /// Update a project.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// New contract URL; an empty value clears it.
        #[arg(long)]
        contract_url: Option<String>,
        /// Add a milestone as NAME=DATE.
        #[arg(long = "milestone")]
        milestones: Vec<String>,
        /// Mark milestones with these ids completed.
        #[arg(long = "complete-milestone")]
        completed: Vec<String>,
        /// Add an attachment as NAME=URL or URL.
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },
    /// Delete a project with no tasks.
    Delete { id: String },
    /// List projects; the active one is starred.
    List,
    /// Switch the active project.
    Use { id: String },
    /// Show milestones, attachments and the activity log.
    View {
        /// Project id (default: the active project).
        id: Option<String>,
        /// Number of activity entries to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum KpiAction {
    /// Add a KPI: complete TARGET tasks in the bucket.
    Add {
        #[arg(long)]
        employee: String,
        #[arg(long)]
        title: String,
        #[arg(long, allow_hyphen_values = true)]
        target: i64,
        #[command(flatten)]
        when: TimeframeArgs,
    },
    /// Update a KPI. Omitted fields keep their value.
    Edit {
        id: String,
        #[arg(long)]
        employee: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        target: Option<i64>,
        #[arg(long, value_enum)]
        period: Option<Period>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete { id: String },
    /// KPIs of one bucket with their progress.
    List {
        #[command(flatten)]
        view: TimeframeArgs,
    },
}

#[derive(Subcommand)]
pub enum OkrAction {
    /// Add an OKR with its key results.
    Add {
        #[arg(long)]
        employee: String,
        #[arg(long)]
        objective: String,
        /// Key result title. May be repeated.
        #[arg(long = "kr")]
        key_results: Vec<String>,
        #[command(flatten)]
        when: TimeframeArgs,
    },
    /// Update an OKR. Key results given here replace the titles by position.
    Edit {
        id: String,
        #[arg(long)]
        employee: Option<String>,
        #[arg(long)]
        objective: Option<String>,
        #[arg(long = "kr")]
        key_results: Vec<String>,
        #[arg(long, value_enum)]
        period: Option<Period>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete { id: String },
    /// OKRs of one bucket with their progress.
    List {
        #[command(flatten)]
        view: TimeframeArgs,
    },
    /// Set a key result's progress (0-100).
    Progress {
        okr: String,
        kr: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
}

#[derive(Subcommand)]
pub enum NotifyAction {
    /// List current notifications.
    List {
        /// Hide notifications already read.
        #[arg(long)]
        unread: bool,
    },
    /// Mark one notification read.
    Read { id: String },
    /// Mark every notification read.
    ReadAll,
}

/// Everything a handler needs for one invocation.
pub struct Context {
    pub store: Store,
    pub config: Config,
    pub state: AppState,
    pub now: DateTime<Local>,
}

impl Context {
    pub fn open(data_dir: PathBuf, today: Option<NaiveDate>) -> Self {
        let config = Config::load(&data_dir);
        let store = Store::new(data_dir);
        let state = store.load();
        let now = match today {
            Some(day) => Local
                .from_local_datetime(&day.and_time(Local::now().time()))
                .earliest()
                .unwrap_or_else(Local::now),
            None => Local::now(),
        };
        Context { store, config, state, now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.state)
    }

    /// Recompute notifications against the stored read flags.
    fn notifications(&self) -> Vec<Notification> {
        let previous = self.store.load_notifications();
        self.state
            .notifications(&previous, &self.now, &self.config.escalation_recipient)
    }
}

/// Dispatch one parsed command.
pub fn run(ctx: &mut Context, command: Commands) -> Result<()> {
    match command {
        Commands::Login { account, password } => cmd_login(ctx, &account, &password),
        Commands::Logout => {
            ctx.state.logout();
            ctx.save()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(ctx),
        Commands::Task { action } => cmd_task(ctx, action),
        Commands::Employee { action } => cmd_employee(ctx, action),
        Commands::Project { action } => cmd_project(ctx, action),
        Commands::Kpi { action } => cmd_kpi(ctx, action),
        Commands::Okr { action } => cmd_okr(ctx, action),
        Commands::Notifications { action } => cmd_notifications(ctx, action),
        Commands::Calendar { month, day, mine } => cmd_calendar(ctx, month, day, mine),
        Commands::Gantt { month } => cmd_gantt(ctx, month),
        Commands::Dashboard { view, from, to } => cmd_dashboard(ctx, view, from, to),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Parse a date such as "today", "tomorrow", "in 3d", "in 2w", "eow", "eom" or YYYY-MM-DD.
pub fn parse_date_input(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let input = s.trim().to_lowercase();
    match input.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        "end of week" | "eow" => return Ok(Timeframe::bucket_of(Period::Week, today).range().last_day()),
        "end of month" | "eom" => return Ok(Timeframe::bucket_of(Period::Month, today).range().last_day()),
        _ => {}
    }
    if let Some(rest) = input.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Duration::try_days(days)
                    .and_then(|d| today.checked_add_signed(d))
                    .ok_or_else(|| Error::InvalidDate(s.trim().to_string()));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Duration::try_weeks(weeks)
                    .and_then(|w| today.checked_add_signed(w))
                    .ok_or_else(|| Error::InvalidDate(s.trim().to_string()));
            }
        }
    }
    parse_date(s.trim())
}

fn parse_optional_date(s: Option<&str>, today: NaiveDate) -> Result<Option<NaiveDate>> {
    s.map(|s| parse_date_input(s, today)).transpose()
}

/// Resolve a task id, a `#N`/`N` sequence number in the active project, or a
/// title (case-insensitive) in the active project.
pub fn resolve_task(state: &AppState, identifier: &str) -> Result<String> {
    let identifier = identifier.trim();
    if state.tasks.iter().any(|t| t.id == identifier) {
        return Ok(identifier.to_string());
    }
    let tasks = state.project_tasks();
    if let Ok(seq) = identifier.trim_start_matches('#').parse::<u64>() {
        return tasks
            .iter()
            .find(|t| t.sequence_id == seq)
            .map(|t| t.id.clone())
            .ok_or_else(|| Error::not_found("task", identifier));
    }
    let lower = identifier.to_lowercase();
    let matches: Vec<&&Task> = tasks.iter().filter(|t| t.title.to_lowercase() == lower).collect();
    match matches.as_slice() {
        [] => Err(Error::not_found("task", identifier)),
        [task] => Ok(task.id.clone()),
        _ => Err(Error::AmbiguousTask(identifier.to_string())),
    }
}

/// Split `NAME=VALUE`; a bare value is its own name.
fn split_pair(input: &str) -> (&str, &str) {
    match input.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (input.trim(), input.trim()),
    }
}

fn attachment_ids(state: &AppState) -> Vec<String> {
    state
        .tasks
        .iter()
        .flat_map(|t| t.attachments.iter())
        .chain(state.projects.iter().flat_map(|p| p.attachments.iter()))
        .map(|a| a.id.clone())
        .collect()
}

fn parse_attachments(inputs: &[String], taken: &mut Vec<String>) -> Result<Vec<Attachment>> {
    inputs
        .iter()
        .map(|input| {
            let (name, url) = split_pair(input);
            let id = next_id("att-", taken.iter().map(String::as_str));
            taken.push(id.clone());
            Attachment::new(id, name, url)
        })
        .collect()
}

fn parse_milestones(inputs: &[String], state: &AppState, today: NaiveDate) -> Result<Vec<Milestone>> {
    let mut taken: Vec<String> = state
        .projects
        .iter()
        .flat_map(|p| p.milestones.iter().map(|m| m.id.clone()))
        .collect();
    inputs
        .iter()
        .map(|input| {
            let (name, date) = input
                .split_once('=')
                .ok_or(Error::MissingField("milestone date"))?;
            if name.trim().is_empty() {
                return Err(Error::MissingField("milestone name"));
            }
            let id = next_id("m", taken.iter().map(String::as_str));
            taken.push(id.clone());
            Ok(Milestone {
                id,
                name: name.trim().to_string(),
                date: parse_date_input(date, today)?,
                is_completed: false,
            })
        })
        .collect()
}

fn employee_names(state: &AppState, ids: &[String]) -> String {
    if ids.is_empty() {
        return "-".into();
    }
    ids.iter()
        .map(|id| match state.employee(id) {
            Ok(e) => e.name.clone(),
            Err(_) => id.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print a table of tasks.
pub fn print_table(tasks: &[&Task], state: &AppState, today: NaiveDate) {
    println!(
        "{:<5} {:<6} {:<15} {:<11} {:<11} {:<11} {:<20} {}",
        "#", "ID", "Status", "Priority", "Difficulty", "Deadline", "Assignees", "Title [tags]"
    );
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let overdue = if t.status != Status::Done && t.deadline < today { "!" } else { "" };
        println!(
            "{:<5} {:<6} {:<15} {:<11} {:<11} {:<11} {:<20} {}{}",
            format!("#{}", t.sequence_id),
            truncate(&t.id, 6),
            format_status(t.status),
            format_priority(t.priority),
            format_difficulty(t.difficulty),
            format!("{}{}", t.deadline, overdue),
            truncate(&employee_names(state, &t.assignee_ids), 20),
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

pub fn cmd_login(ctx: &mut Context, account: &str, password: &str) -> Result<()> {
    let name = ctx.state.login(account, password)?.name.clone();
    ctx.save()?;
    println!("Logged in as {name}.");
    Ok(())
}

pub fn cmd_whoami(ctx: &Context) -> Result<()> {
    let user = ctx.state.current_user()?;
    println!("User:         {} ({})", user.name, user.id);
    println!("Role:         {}", format_role(user.role));
    println!("Email:        {}", user.email);
    match ctx.state.active_project() {
        Ok(p) => println!("Project:      {} ({})", p.name, p.id),
        Err(_) => println!("Project:      -"),
    }
    println!("Unread:       {}", unread_count(&ctx.notifications()));
    Ok(())
}

/// Handle `tb task ...`.
pub fn cmd_task(ctx: &mut Context, action: TaskAction) -> Result<()> {
    let today = ctx.today();
    let now = ctx.utc_now();
    match action {
        TaskAction::Add {
            title, desc, assignees, priority, difficulty, start, deadline, status,
            notes, tags, attachments, escalation,
        } => {
            let mut taken = attachment_ids(&ctx.state);
            let draft = TaskDraft {
                title,
                description: desc.unwrap_or_default(),
                assignee_ids: split_tags(&assignees),
                priority,
                difficulty,
                start_date: Some(parse_optional_date(start.as_deref(), today)?.unwrap_or(today)),
                deadline: parse_optional_date(deadline.as_deref(), today)?,
                status,
                notes: notes.unwrap_or_default(),
                tags: split_tags(&tags),
                attachments: parse_attachments(&attachments, &mut taken)?,
                escalation,
            };
            let id = ctx.state.create_task(draft, now)?;
            ctx.save()?;
            let task = ctx.state.task(&id)?;
            println!("Added task #{} ({}): {}", task.sequence_id, task.id, task.title);
        }
        TaskAction::List { assignee, mine, search, order } => {
            let project = ctx.state.active_project()?;
            let assignee = if mine {
                Some(ctx.state.current_user()?.id.clone())
            } else {
                assignee
            };
            let filter = BoardFilter { assignee, query: search.unwrap_or_default(), order };
            let tasks = filter_tasks(&ctx.state.tasks, &project.id, &filter);
            println!("{}", project.name);
            for (status, column) in group_by_status(&tasks, filter.order) {
                println!("\n== {} ({}) ==", format_status(status), column.len());
                if !column.is_empty() {
                    print_table(&column, &ctx.state, today);
                }
            }
        }
        TaskAction::View { task } => {
            let id = resolve_task(&ctx.state, &task)?;
            print_task(&ctx.state, ctx.state.task(&id)?, today);
        }
        TaskAction::Edit {
            task, title, desc, assignees, priority, difficulty, start, deadline, status,
            notes, add_tags, rm_tags, attachments, escalation,
        } => {
            let id = resolve_task(&ctx.state, &task)?;
            let mut taken = attachment_ids(&ctx.state);
            let mut draft = TaskDraft::from_task(ctx.state.task(&id)?);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(desc) = desc {
                draft.description = desc;
            }
            if !assignees.is_empty() {
                draft.assignee_ids = split_tags(&assignees);
            }
            if let Some(p) = priority {
                draft.priority = p;
            }
            if let Some(d) = difficulty {
                draft.difficulty = d;
            }
            if let Some(start) = parse_optional_date(start.as_deref(), today)? {
                draft.start_date = Some(start);
            }
            if let Some(deadline) = parse_optional_date(deadline.as_deref(), today)? {
                draft.deadline = Some(deadline);
            }
            if let Some(s) = status {
                draft.status = s;
            }
            if let Some(notes) = notes {
                draft.notes = notes;
            }
            let removed = split_tags(&rm_tags);
            draft.tags.retain(|t| !removed.contains(t));
            for tag in split_tags(&add_tags) {
                if !draft.tags.contains(&tag) {
                    draft.tags.push(tag);
                }
            }
            draft.attachments.extend(parse_attachments(&attachments, &mut taken)?);
            if let Some(e) = escalation {
                draft.escalation = e;
            }
            ctx.state.update_task(&id, draft, now)?;
            ctx.save()?;
            println!("Updated task {id}.");
        }
        TaskAction::Move { task, status } => {
            let id = resolve_task(&ctx.state, &task)?;
            ctx.state.move_task(&id, status, now)?;
            ctx.save()?;
            println!("Moved task {id} to {}.", format_status(status));
        }
        TaskAction::Delete { task } => {
            let id = resolve_task(&ctx.state, &task)?;
            ctx.state.delete_task(&id, now)?;
            ctx.save()?;
            println!("Deleted task {id}.");
        }
        TaskAction::Comment { task, text } => {
            let id = resolve_task(&ctx.state, &task)?;
            ctx.state.add_comment(&id, &text, now)?;
            ctx.save()?;
            println!("Commented on task {id}.");
        }
    }
    Ok(())
}

fn print_task(state: &AppState, task: &Task, today: NaiveDate) {
    let overdue = task.status != Status::Done && task.deadline < today;
    println!("ID:           {} (#{})", task.id, task.sequence_id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Priority:     {}", format_priority(task.priority));
    println!("Difficulty:   {}", format_difficulty(task.difficulty));
    println!("Assignees:    {}", employee_names(state, &task.assignee_ids));
    println!("Start:        {}", format_date_vi(task.start_date));
    println!(
        "Deadline:     {}{}",
        format_date_vi(task.deadline),
        if overdue { " (overdue)" } else { "" }
    );
    println!("Tags:         {}", if task.tags.is_empty() { "-".into() } else { task.tags.join(",") });
    if task.escalation == EscalationPolicy::EmailOps {
        println!("Escalation:   email ops when overdue");
    }
    println!("Description:\n{}\n", if task.description.is_empty() { "-" } else { task.description.as_str() });
    if !task.notes.is_empty() {
        println!("Notes:\n{}\n", task.notes);
    }
    if !task.attachments.is_empty() {
        println!("Attachments:");
        for a in &task.attachments {
            println!("  {} <{}>", a.name, a.url);
        }
    }
    println!("Comments:");
    if task.comments.is_empty() {
        println!("  -");
    }
    for c in &task.comments {
        let author = employee_names(state, std::slice::from_ref(&c.author_id));
        println!("  [{}] {}: {}", c.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"), author, c.text);
    }
}

/// Handle `tb employee ...`.
pub fn cmd_employee(ctx: &mut Context, action: EmployeeAction) -> Result<()> {
    match action {
        EmployeeAction::Add { name, email, role, phone, dob, password } => {
            let draft = EmployeeDraft {
                name,
                role,
                email,
                phone: phone.unwrap_or_default(),
                dob: dob.unwrap_or_default(),
                password: Some(password),
            };
            let id = ctx.state.create_employee(draft)?;
            ctx.save()?;
            println!("Added employee {id}.");
        }
        EmployeeAction::Edit { id, name, email, role, phone, dob, password } => {
            let mut draft = EmployeeDraft::from_employee(ctx.state.employee(&id)?);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(email) = email {
                draft.email = email;
            }
            if let Some(role) = role {
                draft.role = role;
            }
            if let Some(phone) = phone {
                draft.phone = phone;
            }
            if let Some(dob) = dob {
                draft.dob = dob;
            }
            draft.password = password;
            ctx.state.update_employee(&id, draft)?;
            ctx.save()?;
            println!("Updated employee {id}.");
        }
        EmployeeAction::Delete { id } => {
            ctx.state.delete_employee(&id)?;
            ctx.save()?;
            println!("Deleted employee {id}.");
        }
        EmployeeAction::List => {
            println!("{:<5} {:<22} {:<14} {:<28} {}", "ID", "Name", "Role", "Email", "Tasks");
            for e in &ctx.state.employees {
                let count = ctx.state.tasks.iter().filter(|t| t.is_assigned_to(&e.id)).count();
                println!(
                    "{:<5} {:<22} {:<14} {:<28} {}",
                    e.id,
                    truncate(&e.name, 22),
                    format_role(e.role),
                    truncate(&e.email, 28),
                    count
                );
            }
        }
    }
    Ok(())
}

/// Handle `tb project ...`.
pub fn cmd_project(ctx: &mut Context, action: ProjectAction) -> Result<()> {
    let today = ctx.today();
    match action {
        ProjectAction::Add { name, contract_url, milestones, attachments } => {
            let mut taken = attachment_ids(&ctx.state);
            let draft = ProjectDraft {
                name,
                contract_url,
                milestones: parse_milestones(&milestones, &ctx.state, today)?,
                attachments: parse_attachments(&attachments, &mut taken)?,
            };
            let id = ctx.state.create_project(draft)?;
            ctx.save()?;
            println!("Created project {id} and switched to it.");
        }
        ProjectAction::Edit { id, name, contract_url, milestones, completed, attachments } => {
            let mut taken = attachment_ids(&ctx.state);
            let mut draft = ProjectDraft::from_project(ctx.state.project(&id)?);
            if let Some(name) = name {
                draft.name = name;
            }
            if contract_url.is_some() {
                draft.contract_url = contract_url;
            }
            for mid in &completed {
                let milestone = draft
                    .milestones
                    .iter_mut()
                    .find(|m| &m.id == mid)
                    .ok_or_else(|| Error::not_found("milestone", mid.as_str()))?;
                milestone.is_completed = true;
            }
            draft.milestones.extend(parse_milestones(&milestones, &ctx.state, today)?);
            draft.attachments.extend(parse_attachments(&attachments, &mut taken)?);
            ctx.state.update_project(&id, draft)?;
            ctx.save()?;
            println!("Updated project {id}.");
        }
        ProjectAction::Delete { id } => {
            ctx.state.delete_project(&id)?;
            ctx.save()?;
            println!("Deleted project {id}.");
        }
        ProjectAction::List => {
            let active = ctx.state.active_project_id.as_deref();
            println!("  {:<5} {:<32} {:<6} {:<5} {}", "ID", "Name", "Tasks", "KPIs", "OKRs");
            for p in &ctx.state.projects {
                let count = ctx.state.tasks.iter().filter(|t| t.project_id == p.id).count();
                let marker = if active == Some(p.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {:<5} {:<32} {:<6} {:<5} {}",
                    marker,
                    p.id,
                    truncate(&p.name, 32),
                    count,
                    p.kpis.len(),
                    p.okrs.len()
                );
            }
        }
        ProjectAction::Use { id } => {
            ctx.state.set_active_project(&id)?;
            ctx.save()?;
            println!("Active project: {}", ctx.state.active_project()?.name);
        }
        ProjectAction::View { id, limit } => {
            let project = match id {
                Some(id) => ctx.state.project(&id)?,
                None => ctx.state.active_project()?,
            };
            println!("ID:           {}", project.id);
            println!("Name:         {}", project.name);
            println!("Contract:     {}", project.contract_url.as_deref().unwrap_or("-"));
            println!("Milestones:");
            if project.milestones.is_empty() {
                println!("  -");
            }
            for m in &project.milestones {
                let mark = if m.is_completed { "x" } else { " " };
                println!("  [{}] {:<5} {} ({})", mark, m.id, m.name, format_date_vi(m.date));
            }
            if !project.attachments.is_empty() {
                println!("Attachments:");
                for a in &project.attachments {
                    println!("  {} <{}>", a.name, a.url);
                }
            }
            println!("Activity:");
            if project.activity_log.is_empty() {
                println!("  -");
            }
            for entry in project.activity_log.iter().take(limit) {
                let author = employee_names(&ctx.state, std::slice::from_ref(&entry.author_id));
                println!(
                    "  [{}] {} {} \"{}\"",
                    entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    author,
                    entry.action,
                    entry.entity.title
                );
            }
        }
    }
    Ok(())
}

fn goal_timeframe(existing: Timeframe, period: Option<Period>, date: Option<&str>, today: NaiveDate) -> Result<Timeframe> {
    let mut timeframe = existing;
    if let Some(s) = date {
        timeframe = Timeframe::bucket_of(timeframe.period, parse_date_input(s, today)?);
    }
    if let Some(period) = period {
        timeframe = timeframe.with_period(period);
    }
    Ok(timeframe)
}

/// Handle `tb kpi ...`.
pub fn cmd_kpi(ctx: &mut Context, action: KpiAction) -> Result<()> {
    let today = ctx.today();
    match action {
        KpiAction::Add { employee, title, target, when } => {
            let draft = KpiDraft { employee_id: employee, title, target, timeframe: when.timeframe(today)? };
            let id = ctx.state.create_kpi(draft)?;
            ctx.save()?;
            println!("Added KPI {id}.");
        }
        KpiAction::Edit { id, employee, title, target, period, date } => {
            let kpi = ctx
                .state
                .active_project()?
                .kpis
                .iter()
                .find(|k| k.id == id)
                .ok_or_else(|| Error::not_found("KPI", id.as_str()))?;
            let draft = KpiDraft {
                employee_id: employee.unwrap_or_else(|| kpi.employee_id.clone()),
                title: title.unwrap_or_else(|| kpi.title.clone()),
                target: target.unwrap_or(kpi.target as i64),
                timeframe: goal_timeframe(kpi.timeframe, period, date.as_deref(), today)?,
            };
            ctx.state.update_kpi(&id, draft)?;
            ctx.save()?;
            println!("Updated KPI {id}.");
        }
        KpiAction::Delete { id } => {
            ctx.state.delete_kpi(&id)?;
            ctx.save()?;
            println!("Deleted KPI {id}.");
        }
        KpiAction::List { view } => {
            let tf = view.timeframe(today)?;
            let project = ctx.state.active_project()?;
            println!("KPI · {} · {}", project.name, format_timeframe(&tf));
            println!("{:<7} {:<20} {:<36} {:<9} {:<5} {}", "ID", "Employee", "Title", "Done", "%", "");
            for kpi in in_bucket(&project.kpis, &tf) {
                let status = KpiStatus::of(kpi, &ctx.state.tasks);
                println!(
                    "{:<7} {:<20} {:<36} {:<9} {:<5} {}",
                    kpi.id,
                    truncate(&employee_names(&ctx.state, std::slice::from_ref(&kpi.employee_id)), 20),
                    truncate(&kpi.title, 36),
                    format!("{}/{}", status.count, status.target),
                    format!("{}%", status.percentage),
                    if status.completed { "✓" } else { "" }
                );
            }
        }
    }
    Ok(())
}

/// Handle `tb okr ...`.
pub fn cmd_okr(ctx: &mut Context, action: OkrAction) -> Result<()> {
    let today = ctx.today();
    match action {
        OkrAction::Add { employee, objective, key_results, when } => {
            let draft = OkrDraft {
                employee_id: employee,
                objective,
                key_result_titles: key_results,
                timeframe: when.timeframe(today)?,
            };
            let id = ctx.state.create_okr(draft)?;
            ctx.save()?;
            println!("Added OKR {id}.");
        }
        OkrAction::Edit { id, employee, objective, key_results, period, date } => {
            let okr = ctx
                .state
                .active_project()?
                .okrs
                .iter()
                .find(|o| o.id == id)
                .ok_or_else(|| Error::not_found("OKR", id.as_str()))?;
            let key_result_titles = if key_results.is_empty() {
                okr.key_results.iter().map(|kr| kr.title.clone()).collect()
            } else {
                key_results
            };
            let draft = OkrDraft {
                employee_id: employee.unwrap_or_else(|| okr.employee_id.clone()),
                objective: objective.unwrap_or_else(|| okr.objective.clone()),
                key_result_titles,
                timeframe: goal_timeframe(okr.timeframe, period, date.as_deref(), today)?,
            };
            ctx.state.update_okr(&id, draft)?;
            ctx.save()?;
            println!("Updated OKR {id}.");
        }
        OkrAction::Delete { id } => {
            ctx.state.delete_okr(&id)?;
            ctx.save()?;
            println!("Deleted OKR {id}.");
        }
        OkrAction::List { view } => {
            let tf = view.timeframe(today)?;
            let project = ctx.state.active_project()?;
            println!("OKR · {} · {}", project.name, format_timeframe(&tf));
            for okr in in_bucket(&project.okrs, &tf) {
                println!(
                    "\n{} {} ({}) {}%",
                    okr.id,
                    okr.objective,
                    employee_names(&ctx.state, std::slice::from_ref(&okr.employee_id)),
                    okr_progress(okr)
                );
                for kr in &okr.key_results {
                    println!("  {:<6} {:>3}%  {}", kr.id, kr.progress, kr.title);
                }
            }
        }
        OkrAction::Progress { okr, kr, value } => {
            ctx.state.set_key_result_progress(&okr, &kr, value)?;
            ctx.save()?;
            println!("Key result {kr} set to {value}%.");
        }
    }
    Ok(())
}

/// Handle `tb notifications ...`.
pub fn cmd_notifications(ctx: &mut Context, action: NotifyAction) -> Result<()> {
    ctx.state.current_user()?;
    let mut list = ctx.notifications();
    match action {
        NotifyAction::List { unread } => {
            println!("{} unread", unread_count(&list));
            for n in list.iter().filter(|n| !unread || !n.is_read) {
                let mark = if n.is_read { " " } else { "●" };
                println!("{} {:<28} {}", mark, n.id, n.message);
                if let Some(action) = &n.action {
                    println!("  {}", mailto_uri(action));
                }
            }
        }
        NotifyAction::Read { id } => {
            if !mark_read(&mut list, &id) {
                return Err(Error::not_found("notification", id));
            }
            println!("Marked {id} read.");
        }
        NotifyAction::ReadAll => {
            mark_all_read(&mut list);
            println!("Marked {} notifications read.", list.len());
        }
    }
    debug!(count = list.len(), "saving notifications");
    ctx.store.save_notifications(&list)
}

/// Print a six-week month grid with the number of tasks due each day.
pub fn cmd_calendar(ctx: &Context, month: Option<String>, day: Option<String>, mine: bool) -> Result<()> {
    let today = ctx.today();
    let mut tasks = ctx.state.project_tasks();
    if mine {
        let me = ctx.state.current_user()?.id.clone();
        tasks.retain(|t| t.is_assigned_to(&me));
    }
    let by_day = tasks_by_deadline(&tasks);

    if let Some(day) = day {
        let day = parse_date_input(&day, today)?;
        println!("{}", format_date_vi(day));
        let due = by_day.get(&day).cloned().unwrap_or_default();
        print_table(&due, &ctx.state, today);
        return Ok(());
    }

    let month = parse_optional_date(month.as_deref(), today)?.unwrap_or(today);
    println!("{}", format_timeframe(&Timeframe::bucket_of(Period::Month, month)));
    println!("{}", ["CN", "T2", "T3", "T4", "T5", "T6", "T7"].map(|d| format!("{d:<7}")).join(""));
    for week in calendar_grid(month).chunks(7) {
        let row: Vec<String> = week
            .iter()
            .map(|cell| {
                if !cell.in_month {
                    return format!("{:<7}", ".");
                }
                let marker = if cell.date == today { "*" } else { "" };
                let label = match by_day.get(&cell.date).map(Vec::len) {
                    Some(n) => format!("{}{}({})", cell.date.day(), marker, n),
                    None => format!("{}{}", cell.date.day(), marker),
                };
                format!("{label:<7}")
            })
            .collect();
        println!("{}", row.join(""));
    }
    Ok(())
}

/// Print one bar per task across the days of a month.
pub fn cmd_gantt(ctx: &Context, month: Option<String>) -> Result<()> {
    let today = ctx.today();
    let month = parse_optional_date(month.as_deref(), today)?.unwrap_or(today);
    let tf = Timeframe::bucket_of(Period::Month, month);
    let days = tf.range().last_day().day();
    let tasks = ctx.state.project_tasks();

    println!("{}", format_timeframe(&tf));
    let scale: String = (1..=days)
        .map(|d| if d % 5 == 0 { char::from_digit(d % 10, 10).unwrap_or('|') } else { ' ' })
        .collect();
    println!("{:<30} {}", "", scale);
    for (task, bar) in gantt_rows(&tasks, month) {
        let line: String = (1..=days)
            .map(|d| {
                if d >= bar.start_day && d < bar.start_day.saturating_add(bar.duration) {
                    '█'
                } else {
                    '·'
                }
            })
            .collect();
        println!("{:<30} {}", truncate(&format!("#{} {}", task.sequence_id, task.title), 30), line);
    }
    Ok(())
}

/// Print project statistics for a timeframe or an explicit window.
pub fn cmd_dashboard(ctx: &Context, view: TimeframeArgs, from: Option<String>, to: Option<String>) -> Result<()> {
    let today = ctx.today();
    let (first, last, label) = match (from, to) {
        (Some(from), Some(to)) => {
            let first = parse_date_input(&from, today)?;
            let last = parse_date_input(&to, today)?;
            if first > last {
                return Err(Error::StartAfterDeadline { start: first, deadline: last });
            }
            (first, last, format!("{} - {}", format_date_vi(first), format_date_vi(last)))
        }
        _ => {
            let tf = view.timeframe(today)?;
            let range = tf.range();
            (range.first_day(), range.last_day(), format_timeframe(&tf))
        }
    };
    let project = ctx.state.active_project()?;
    let tasks: Vec<Task> = ctx.state.project_tasks().into_iter().cloned().collect();
    let dash = build_dashboard(project, &tasks, &ctx.state.employees, first, last);
    let s = &dash.stats;

    println!("{} · {}", project.name, label);
    println!("Tasks:        {} ({}% done)", s.status.total(), s.completion_percent);
    println!(
        "  {}: {}  {}: {}  {}: {}",
        format_status(Status::Todo), s.status.todo,
        format_status(Status::InProgress), s.status.in_progress,
        format_status(Status::Done), s.status.done
    );
    let by_difficulty: Vec<String> = Difficulty::ALL
        .iter()
        .map(|&d| format!("{}: {}", format_difficulty(d), s.difficulty.get(d)))
        .collect();
    println!("  {}", by_difficulty.join("  "));
    println!("KPIs:         {}/{} completed ({}%)", s.completed_kpis, s.total_kpis, s.kpi_completion_percent);
    println!("OKR progress: {}%", s.average_okr_progress);

    println!(
        "\n{:<22} {:<6} {:<6} {:<6} {:<6} {:<8} {}",
        "Employee", "Tasks", "Todo", "Doing", "Done", "KPIs", "OKR %"
    );
    for row in &dash.employees {
        println!(
            "{:<22} {:<6} {:<6} {:<6} {:<6} {:<8} {}",
            truncate(&row.name, 22),
            row.total_tasks,
            row.status.todo,
            row.status.in_progress,
            row.status.done,
            format!("{}/{}", row.kpi_completed, row.kpi_count),
            row.okr_average_progress
        );
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn seeded() -> AppState {
        AppState {
            current_user: None,
            projects: seed::projects(),
            active_project_id: Some("p1".into()),
            tasks: seed::tasks(),
            employees: seed::employees(),
            revision: 0,
        }
    }

    #[test]
    fn test_parse_date_input() {
        let today = date("2025-11-05");
        assert_eq!(parse_date_input("today", today).unwrap(), today);
        assert_eq!(parse_date_input("Tomorrow", today).unwrap(), date("2025-11-06"));
        assert_eq!(parse_date_input("in 3d", today).unwrap(), date("2025-11-08"));
        assert_eq!(parse_date_input("in 2w", today).unwrap(), date("2025-11-19"));
        assert_eq!(parse_date_input("eow", today).unwrap(), date("2025-11-08"));
        assert_eq!(parse_date_input("eom", today).unwrap(), date("2025-11-30"));
        assert_eq!(parse_date_input(" 2025-12-01 ", today).unwrap(), date("2025-12-01"));
        assert!(matches!(parse_date_input("someday", today), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date_input("in 99999999d", today), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_date_input("in 99999999999999w", today), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn resolve_by_id_number_or_title() {
        let mut state = seeded();
        assert_eq!(resolve_task(&state, "t2").unwrap(), "t2");
        assert_eq!(resolve_task(&state, "#3").unwrap(), "t3");
        assert_eq!(resolve_task(&state, "4").unwrap(), "t4");
        assert_eq!(resolve_task(&state, "viết kiểm thử tích hợp").unwrap(), "t3");
        assert!(matches!(resolve_task(&state, "#9"), Err(Error::NotFound { .. })));

        let mut copy = state.tasks[0].clone();
        copy.id = "t9".into();
        copy.sequence_id = 9;
        state.tasks.push(copy);
        assert!(matches!(resolve_task(&state, "Thiết kế UI Dashboard"), Err(Error::AmbiguousTask(_))));
    }

    #[test]
    fn timeframe_args_shift_buckets() {
        let args = TimeframeArgs { period: Period::Month, date: Some("2025-11-18".into()), shift: -1 };
        assert_eq!(args.timeframe(date("2025-01-01")).unwrap(), Timeframe::new(Period::Month, date("2025-10-01")));
        let args = TimeframeArgs { period: Period::Quarter, date: None, shift: 1 };
        assert_eq!(args.timeframe(date("2025-11-18")).unwrap(), Timeframe::new(Period::Quarter, date("2026-01-01")));
    }

    #[test]
    fn attachments_and_milestones_parse() {
        let state = seeded();
        let mut taken = attachment_ids(&state);
        let parsed = parse_attachments(
            &["Brief=https://docs.example.com/brief".into(), "https://example.com/a.pdf".into()],
            &mut taken,
        )
        .unwrap();
        assert_eq!(parsed[0].name, "Brief");
        assert_eq!(parsed[1].name, "https://example.com/a.pdf");
        assert_ne!(parsed[0].id, parsed[1].id);
        assert!(parse_attachments(&["Bad=ftp://x".into()], &mut taken).is_err());

        let ms = parse_milestones(&["Beta=2025-12-01".into()], &state, date("2025-11-01")).unwrap();
        assert_eq!((ms[0].id.as_str(), ms[0].date), ("m3", date("2025-12-01")));
        assert!(parse_milestones(&["Beta".into()], &state, date("2025-11-01")).is_err());
    }

    #[test]
    fn goal_edit_rebuckets_timeframe() {
        let existing = Timeframe::new(Period::Month, date("2025-11-01"));
        let today = date("2025-11-20");
        assert_eq!(goal_timeframe(existing, None, None, today).unwrap(), existing);
        assert_eq!(
            goal_timeframe(existing, Some(Period::Quarter), None, today).unwrap(),
            Timeframe::new(Period::Quarter, date("2025-10-01"))
        );
        assert_eq!(
            goal_timeframe(existing, None, Some("2026-02-14"), today).unwrap(),
            Timeframe::new(Period::Month, date("2026-02-01"))
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
