//! # tb - Team Task Board CLI
//!
//! A file-backed task board for small teams: Kanban tasks per project,
//! deadline reminders and overdue alerts, and KPI/OKR progress per week,
//! month or quarter.
//!
//! ## Key Features
//!
//! - **Projects and Tasks**: per-project task numbering (`#1`, `#2`, ...), assignees,
//!   priority, difficulty, tags, attachments, comments and an activity log
//! - **Notifications**: reminders the day before a deadline, overdue alerts, and a
//!   pre-filled escalation email for tasks that opt in
//! - **Goals**: KPIs counted from completed tasks, OKRs averaged from key results
//! - **Views**: board, month calendar, Gantt chart and a project dashboard
//!
//! ## Quick Start
//!
//! ```bash
//! tb login 1 --password 123456
//! tb task add "Write release notes" --assignee 2 --deadline "in 3d"
//! tb task list --mine
//! tb task move "#5" done
//! tb notifications list
//! tb kpi list --period quarter
//! tb dashboard --period month --shift -1
//! ```
//!
//! Data is stored in `~/.taskboard/` as one JSON file per collection
//! (`tasks.json`, `projects.json`, ...). Set `TASKBOARD_DIR` or pass
//! `--data-dir` to use another directory, and `RUST_LOG=debug` to see what
//! the tool is doing.

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod board;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dashboard;
pub mod employee;
pub mod error;
pub mod fields;
pub mod goals;
pub mod notify;
pub mod project;
pub mod seed;
pub mod state;
pub mod storage;
pub mod task;
pub mod timeframe;

use cli::Cli;
use cmd::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no data directory.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let today = match cli.today.as_deref().map(timeframe::parse_date).transpose() {
        Ok(today) => today,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let data_dir = config::resolve_data_dir(cli.data_dir);
    let mut ctx = Context::open(data_dir, today);

    if let Err(e) = run(&mut ctx, cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
