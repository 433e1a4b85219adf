use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;

pub(crate) const DB_ENV: &str = "SPENDLOG_DB";
pub(crate) const DEFAULT_LOG_FILTER: &str = "spendlog=warn";

/// Process settings, resolved once at startup.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) db_path: PathBuf,
    pub(crate) log_filter: String,
}

impl Config {
    /// `SPENDLOG_DB` picks the database file, `RUST_LOG` the log filter.
    pub(crate) fn from_env() -> Result<Self> {
        Self::resolve(
            std::env::var_os(DB_ENV),
            std::env::var("RUST_LOG").ok(),
        )
    }

    pub(crate) fn resolve(db_path: Option<OsString>, log_filter: Option<String>) -> Result<Self> {
        let db_path = match db_path.filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };
        let log_filter = log_filter
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self {
            db_path,
            log_filter,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "spendlog", "spendlog")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("spendlog.db"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
