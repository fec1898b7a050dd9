//! Runtime settings.
//!
//! Settings live in `config.json` inside the data directory. A missing file
//! means defaults; an unreadable one is logged and also falls back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_FILE: &str = "config.json";
pub const DIR_ENV: &str = "TASKBOARD_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Mailbox that escalation emails are addressed to.
    pub escalation_recipient: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            escalation_recipient: "ops@company.com".to_string(),
        }
    }
}

impl Config {
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Config::default();
        }
        match fs::read_to_string(&path).map(|buf| serde_json::from_str::<Config>(&buf)) {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "config is not valid JSON, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config, using defaults");
                Config::default()
            }
        }
    }
}

/// Pick the data directory: explicit flag, then `TASKBOARD_DIR`, then `~/.taskboard`.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Some(dir) = std::env::var_os(DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taskboard")
}
