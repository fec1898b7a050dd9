use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Team task board with deadline notifications and KPI/OKR tracking.
/// Data lives in ~/.taskboard unless --data-dir or TASKBOARD_DIR says otherwise.
#[derive(Parser)]
#[command(name = "tb", version, about = "Team task board CLI")]
pub struct Cli {
    /// Directory holding the board's JSON files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::TaskAction;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tb", "task", "move", "#3", "done", "--today", "2025-11-04"]).unwrap();
        assert_eq!(cli.today.as_deref(), Some("2025-11-04"));
        match cli.command {
            Commands::Task { action: TaskAction::Move { task, status } } => {
                assert_eq!(task, "#3");
                assert_eq!(status, crate::fields::Status::Done);
            }
            _ => panic!("parsed the wrong command"),
        }
    }
}
