use crate::plan::{MasterData, DEFAULT_CATALOG, DEFAULT_ROSTER};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_WORKSPACE: &str = "PLANBOARD_WORKSPACE";
pub const ENV_ROSTER: &str = "PLANBOARD_ROSTER";
pub const ENV_TASKS: &str = "PLANBOARD_TASKS";
pub const ENV_STORE_TIMEOUT_MS: &str = "PLANBOARD_STORE_TIMEOUT_MS";
pub const ENV_DATE: &str = "PLANBOARD_DATE";
pub const ENV_LOG: &str = "PLANBOARD_LOG";

const DEFAULT_STORE_TIMEOUT_MS: u64 = 3000;

/// Working-day reference hours shown next to the add form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftHours {
    pub regular_start: NaiveTime,
    pub regular_end: NaiveTime,
    pub overtime_end: NaiveTime,
}

impl Default for ShiftHours {
    fn default() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self {
            regular_start: t(7, 45),
            regular_end: t(16, 45),
            overtime_end: t(20, 30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub master: MasterData,
    pub store_timeout: Duration,
    pub initial_date: Option<NaiveDate>,
    pub shift: ShiftHours,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must list at least one name")]
    EmptyList(&'static str),

    #[error("{var} lists {name:?} more than once")]
    DuplicateName { var: &'static str, name: String },

    #[error("PLANBOARD_STORE_TIMEOUT_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidTimeout(String),

    #[error("PLANBOARD_DATE must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let workspace = var(ENV_WORKSPACE)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let roster = name_list(&var, ENV_ROSTER, DEFAULT_ROSTER)?;
        let catalog = name_list(&var, ENV_TASKS, DEFAULT_CATALOG)?;

        let store_timeout = match var(ENV_STORE_TIMEOUT_MS) {
            None => Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let initial_date = match var(ENV_DATE).filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| ConfigError::InvalidDate(raw.clone()))?,
            ),
        };

        Ok(Config {
            workspace,
            master: MasterData::new(roster, catalog),
            store_timeout,
            initial_date,
            shift: ShiftHours::default(),
        })
    }
}

/// `;`-separated list, order preserved. Unset falls back to the built-in list.
fn name_list(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &[&str],
) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = var(key) else {
        return Ok(default.iter().map(|s| s.to_string()).collect());
    };
    let names: Vec<String> = raw
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ConfigError::EmptyList(key));
    }
    let mut seen = HashSet::new();
    for n in &names {
        if !seen.insert(n.as_str()) {
            return Err(ConfigError::DuplicateName {
                var: key,
                name: n.clone(),
            });
        }
    }
    Ok(names)
}
