use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{GymJournalError, Result};
use crate::presentation::Catalog;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7979;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DaemonConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    pub weekdays: Option<Vec<String>>,
    pub muscle_groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub daemon: Option<DaemonConfig>,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

impl Config {
    pub fn convention_defaults(db_path: &str) -> Self {
        let catalog = Catalog::default();
        Self {
            database: Some(DatabaseConfig {
                sqlite_path: Some(db_path.to_string()),
            }),
            daemon: Some(DaemonConfig {
                host: Some(DEFAULT_HOST.to_string()),
                port: Some(DEFAULT_PORT),
            }),
            catalog: Some(CatalogConfig {
                weekdays: Some(catalog.weekdays),
                muscle_groups: Some(catalog.muscle_groups),
            }),
        }
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| GymJournalError::Config(format!("failed to read {path}: {e}")))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| GymJournalError::Config(format!("invalid config {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(catalog) = &self.catalog {
            for (field, values) in [
                ("weekdays", &catalog.weekdays),
                ("muscle_groups", &catalog.muscle_groups),
            ] {
                let Some(values) = values else { continue };
                if values.is_empty() {
                    return Err(GymJournalError::Config(format!(
                        "catalog.{field} must not be empty"
                    )));
                }
                if values.iter().any(|value| value.trim().is_empty()) {
                    return Err(GymJournalError::Config(format!(
                        "catalog.{field} contains a blank entry"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Configured path first, then `DATABASE_URL`, then the per-user data dir.
    pub fn resolve_db_path(&self) -> String {
        self.resolve_db_path_with(std::env::var("DATABASE_URL").ok().as_deref())
    }

    pub fn resolve_db_path_with(&self, database_url: Option<&str>) -> String {
        self.database
            .as_ref()
            .and_then(|db| db.sqlite_path.as_deref())
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .or_else(|| database_url.and_then(sqlite_path_from_url))
            .unwrap_or_else(crate::runtime_paths::default_db_path)
    }

    pub fn host(&self) -> String {
        self.daemon
            .as_ref()
            .and_then(|daemon| daemon.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn port(&self) -> u16 {
        self.daemon
            .as_ref()
            .and_then(|daemon| daemon.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn catalog(&self) -> Catalog {
        let defaults = Catalog::default();
        let Some(catalog) = &self.catalog else {
            return defaults;
        };
        Catalog {
            weekdays: catalog.weekdays.clone().unwrap_or(defaults.weekdays),
            muscle_groups: catalog.muscle_groups.clone().unwrap_or(defaults.muscle_groups),
        }
    }
}

/// Accepts `sqlite:///./gym_journal.db`, `sqlite://gym_journal.db` or a bare
/// path. Other schemes are not SQLite and yield `None`.
pub fn sqlite_path_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let path = match url.split_once("://") {
        Some(("sqlite", rest)) => rest.strip_prefix('/').unwrap_or(rest),
        Some(_) => return None,
        None => url,
    };
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
