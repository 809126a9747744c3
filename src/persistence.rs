use crate::db;
use crate::plan::{
    check_window, fresh_id, parse_time_text, Assignment, PlanError, STORED_TIME_FORMAT,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "plan_";
const KEY_DATE_FORMAT: &str = "%Y%m%d";

pub fn document_key(date: NaiveDate) -> String {
    format!("{}{}", KEY_PREFIX, date.format(KEY_DATE_FORMAT))
}

pub fn date_from_key(key: &str) -> Option<NaiveDate> {
    let digits = key.strip_prefix(KEY_PREFIX)?;
    if digits.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(digits, KEY_DATE_FORMAT).ok()
}

#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    tasks: Vec<JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTask {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Técnico")]
    technician: String,
    #[serde(rename = "Tarea")]
    task: String,
    #[serde(rename = "Inicio")]
    start: String,
    #[serde(rename = "Fin")]
    end: String,
    #[serde(rename = "Notas", default)]
    notes: Option<String>,
    #[serde(rename = "Fecha", default)]
    date: Option<String>,
}

impl StoredTask {
    fn encode(a: &Assignment, date: NaiveDate) -> Self {
        Self {
            id: Some(a.id.clone()),
            technician: a.technician.clone(),
            task: a.task.clone(),
            start: a.start.format(STORED_TIME_FORMAT).to_string(),
            end: a.end.format(STORED_TIME_FORMAT).to_string(),
            notes: Some(a.notes.clone()),
            date: Some(date.format("%Y-%m-%d").to_string()),
        }
    }

    fn decode(self) -> Result<(Option<String>, Assignment), PlanError> {
        let start = parse_time_text(&self.start)?;
        let end = parse_time_text(&self.end)?;
        check_window(start, end)?;
        let id = self
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok((
            id,
            Assignment {
                id: String::new(),
                technician: self.technician,
                task: self.task,
                start,
                end,
                notes: self.notes.unwrap_or_default(),
            },
        ))
    }
}

/// Non-fatal problem found while loading a stored document. `entry` is the
/// 1-based position in the stored `tasks` array when the problem is local to
/// one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub entry: Option<usize>,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(n) => write!(f, "entry {}: {}", n, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<LoadWarning>,
    /// Set when the stored document exists but could not be read at all.
    /// Saving over it would discard whatever it holds.
    pub read_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Saved,
    SessionOnly,
    Unchanged,
}

impl WriteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteStatus::Saved => "saved",
            WriteStatus::SessionOnly => "session_only",
            WriteStatus::Unchanged => "unchanged",
        }
    }
}

/// Stores one assignment list per calendar date. Chosen once at startup.
pub enum PersistenceAdapter {
    Durable(Connection),
    NoOp { reason: String },
}

impl PersistenceAdapter {
    pub fn open(workspace: Option<&Path>, busy_timeout: Duration) -> Self {
        let Some(path) = workspace else {
            return PersistenceAdapter::NoOp {
                reason: "no workspace configured".to_string(),
            };
        };
        match db::open_db(path, busy_timeout) {
            Ok(conn) => PersistenceAdapter::Durable(conn),
            Err(e) => {
                warn!(workspace = %path.display(), error = %format!("{e:#}"), "document store unavailable");
                PersistenceAdapter::NoOp {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    pub fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        db::init_schema(&conn)?;
        Ok(PersistenceAdapter::Durable(conn))
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, PersistenceAdapter::Durable(_))
    }

    /// Standing warning for session-only mode.
    pub fn unavailable(&self) -> Option<PlanError> {
        match self {
            PersistenceAdapter::Durable(_) => None,
            PersistenceAdapter::NoOp { reason } => Some(PlanError::PersistenceUnavailable(
                format!("{reason}; plans are kept for this session only"),
            )),
        }
    }

    pub fn load(&self, date: NaiveDate) -> LoadResult {
        let PersistenceAdapter::Durable(conn) = self else {
            return LoadResult::default();
        };
        let key = document_key(date);
        match db::document_get(conn, &key) {
            Ok(Some(body)) => decode_document(&body),
            Ok(None) => LoadResult::default(),
            Err(e) => {
                let message = format!("failed to read {key}: {e:#}");
                LoadResult {
                    assignments: Vec::new(),
                    warnings: vec![LoadWarning {
                        entry: None,
                        message: message.clone(),
                    }],
                    read_error: Some(message),
                }
            }
        }
    }

    pub fn save(
        &self,
        date: NaiveDate,
        assignments: &[Assignment],
    ) -> Result<WriteStatus, PlanError> {
        let PersistenceAdapter::Durable(conn) = self else {
            return Ok(WriteStatus::SessionOnly);
        };
        let key = document_key(date);
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let body = encode_document(date, assignments, &updated_at);
        db::document_set(conn, &key, &body, &updated_at)
            .map_err(|e| PlanError::PersistenceWriteFailure(format!("{key}: {e:#}")))?;
        debug!(%key, count = assignments.len(), "plan saved");
        Ok(WriteStatus::Saved)
    }

    pub fn stored_dates(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let PersistenceAdapter::Durable(conn) = self else {
            return Ok(Vec::new());
        };
        let keys = db::document_keys_with_prefix(conn, KEY_PREFIX)?;
        Ok(keys.iter().filter_map(|k| date_from_key(k)).collect())
    }
}

fn encode_document(date: NaiveDate, assignments: &[Assignment], updated_at: &str) -> String {
    let tasks: Vec<StoredTask> = assignments
        .iter()
        .map(|a| StoredTask::encode(a, date))
        .collect();
    json!({ "tasks": tasks, "updated_at": updated_at }).to_string()
}

fn decode_document(body: &str) -> LoadResult {
    let doc: StoredDocument = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return LoadResult {
                assignments: Vec::new(),
                warnings: vec![LoadWarning {
                    entry: None,
                    message: format!("stored document is not valid JSON: {e}"),
                }],
                read_error: None,
            }
        }
    };

    let mut out = LoadResult::default();
    let mut seen: HashSet<String> = HashSet::new();
    for (i, raw) in doc.tasks.into_iter().enumerate() {
        let entry = Some(i + 1);
        let decoded = serde_json::from_value::<StoredTask>(raw)
            .map_err(|e| e.to_string())
            .and_then(|t| t.decode().map_err(|e| e.to_string()));
        let (id, mut assignment) = match decoded {
            Ok(v) => v,
            Err(message) => {
                out.warnings.push(LoadWarning { entry, message });
                continue;
            }
        };
        assignment.id = match id {
            Some(id) if seen.contains(&id) => {
                out.warnings.push(LoadWarning {
                    entry,
                    message: format!("duplicate id {id} replaced"),
                });
                fresh_id()
            }
            Some(id) => id,
            None => fresh_id(),
        };
        seen.insert(assignment.id.clone());
        out.assignments.push(assignment);
    }
    out
}
