mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, HistoryConfig, LogConfig, TimerConfig};
pub use database::{
    CountByHour, CountByTask, Database, SessionRecord, SessionStats, SessionStore, StatsPeriod,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding `pomodoro.db` and `config.toml`.
///
/// `POMODORO_DATA_DIR` wins when set. Otherwise `~/.config/pomodoro[-dev]/`
/// based on `POMODORO_ENV` (set `POMODORO_ENV=dev` for a development copy).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMODORO_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMODORO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomodoro-dev")
            } else {
                base_dir.join("pomodoro")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
