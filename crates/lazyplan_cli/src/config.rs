//! Config resolution for the CLI.
//!
//! Resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazyplan_core::PlannerConfig;

const DB_FILE_NAME: &str = "lazyplan.sqlite3";

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub db_path: PathBuf,
    pub planner: PlannerConfig,
}

/// `$XDG_CONFIG_HOME/lazyplan` or `~/.config/lazyplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("lazyplan");
    }
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("lazyplan")
}

impl ResolvedConfig {
    /// - Config file: `cli_config` > `LAZYPLAN_CONFIG` > `config_dir()/config.toml`
    ///   when present > built-in defaults. An explicitly named file must exist.
    /// - DB path: `cli_db` > `LAZYPLAN_DB_PATH` > `[store] db_path` >
    ///   `config_dir()/lazyplan.sqlite3`.
    pub fn resolve(cli_db: Option<&Path>, cli_config: Option<&Path>) -> Result<Self> {
        let explicit_config = cli_config
            .map(Path::to_path_buf)
            .or_else(|| non_empty_env("LAZYPLAN_CONFIG").map(PathBuf::from));
        let planner = match explicit_config {
            Some(path) => PlannerConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                let default_path = config_dir().join("config.toml");
                if default_path.exists() {
                    PlannerConfig::load(&default_path).with_context(|| {
                        format!("failed to load config {}", default_path.display())
                    })?
                } else {
                    PlannerConfig::default()
                }
            }
        };

        let db_path = if let Some(path) = cli_db {
            path.to_path_buf()
        } else if let Some(path) = non_empty_env("LAZYPLAN_DB_PATH") {
            PathBuf::from(path)
        } else if let Some(path) = &planner.store.db_path {
            path.clone()
        } else {
            config_dir().join(DB_FILE_NAME)
        };

        Ok(Self { db_path, planner })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
