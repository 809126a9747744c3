use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;
use uuid::Uuid;

pub const STORED_TIME_FORMAT: &str = "%H:%M:%S";
pub const DISPLAY_TIME_FORMAT: &str = "%H:%M";

pub const DEFAULT_ROSTER: &[&str] = &[
    "GEORGE GAMARRA",
    "LEIDY YUPANQUI",
    "ALDO SULCA",
    "LUIS DELGADO",
    "JHONY CONDE",
    "GIANCARLO BEGAZOS",
    "MANUEL AYACHI",
    "ALEXANDRA MILLA",
    "LEONEL RODRIGUEZ",
];

pub const DEFAULT_CATALOG: &[&str] = &[
    "Carga de Transportistas",
    "Recepción de Importación",
    "Recepción de Primax",
    "Cambio de aceite",
    "Proveedores",
    "Asignación de ubicaciones",
    "Inventario de Ubicaciones",
    "Inventario de Lubricantes",
    "Ordenamiento",
    "Picking Taller",
    "Picking Mostrador",
    "Picking Sucursales",
    "Embalaje Sucursales",
    "Desembalaje Importaciones",
    "Ubicación Importaciones",
    "Devoluciones Sucursales",
    "Ubicación Devoluciones Sucursales",
    "Devoluciones Taller",
    "Inventario Cíclico",
    "Inventario Repuestos Controlados",
    "Atención Cores",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("start {start} must be before end {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },
    #[error("malformed time {0:?}")]
    MalformedTime(String),
    #[error("unknown technician {0:?}")]
    UnknownTechnician(String),
    #[error("unknown task {0:?}")]
    UnknownTask(String),
    #[error("duplicate id {0}")]
    DuplicateId(String),
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("failed to save plan: {0}")]
    PersistenceWriteFailure(String),
}

impl PlanError {
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::InvalidTimeRange { .. } => "invalid_time_range",
            PlanError::MalformedTime(_) => "malformed_time",
            PlanError::UnknownTechnician(_) => "unknown_technician",
            PlanError::UnknownTask(_) => "unknown_task",
            PlanError::DuplicateId(_) => "duplicate_id",
            PlanError::PersistenceUnavailable(_) => "persistence_unavailable",
            PlanError::PersistenceWriteFailure(_) => "persistence_write_failed",
        }
    }
}

/// One technician working one task inside a same-day time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    pub technician: String,
    pub task: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub notes: String,
}

impl Assignment {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub technician: String,
    pub task: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub notes: String,
}

pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), PlanError> {
    if start >= end {
        return Err(PlanError::InvalidTimeRange { start, end });
    }
    Ok(())
}

/// Accepts `HH:MM`, `HH:MM:SS`, or a full timestamp (older documents stored
/// datetimes); only the time of day is kept, truncated to whole seconds.
pub fn parse_time_text(raw: &str) -> Result<NaiveTime, PlanError> {
    let s = raw.trim();
    for fmt in [STORED_TIME_FORMAT, DISPLAY_TIME_FORMAT] {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            let t = dt.time();
            return Ok(t.with_nanosecond(0).unwrap_or(t));
        }
    }
    Err(PlanError::MalformedTime(raw.to_string()))
}

/// The fixed roster and task catalog supplied at startup.
#[derive(Debug, Clone)]
pub struct MasterData {
    roster: Vec<String>,
    catalog: Vec<String>,
}

impl Default for MasterData {
    fn default() -> Self {
        Self::new(
            DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            DEFAULT_CATALOG.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl MasterData {
    pub fn new(roster: Vec<String>, catalog: Vec<String>) -> Self {
        Self { roster, catalog }
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn has_technician(&self, name: &str) -> bool {
        self.roster.iter().any(|t| t == name)
    }

    pub fn check_technician(&self, name: &str) -> Result<(), PlanError> {
        if self.has_technician(name) {
            Ok(())
        } else {
            Err(PlanError::UnknownTechnician(name.to_string()))
        }
    }

    pub fn check_task(&self, name: &str) -> Result<(), PlanError> {
        if self.catalog.iter().any(|t| t == name) {
            Ok(())
        } else {
            Err(PlanError::UnknownTask(name.to_string()))
        }
    }

    /// Category axis order for charts: axes count bottom-up, so the roster is
    /// reversed to put its first technician on top.
    pub fn display_order(&self) -> Vec<String> {
        self.roster.iter().rev().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_date: NaiveDate,
    pub assignments: Vec<Assignment>,
}

/// Owns the ordered assignment list of the currently loaded date.
#[derive(Debug)]
pub struct AssignmentStore {
    session: SessionState,
}

impl AssignmentStore {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            session: SessionState {
                current_date: date,
                assignments: Vec::new(),
            },
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn current_date(&self) -> NaiveDate {
        self.session.current_date
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.session.assignments
    }

    pub fn add(
        &mut self,
        master: &MasterData,
        input: NewAssignment,
    ) -> Result<&Assignment, PlanError> {
        master.check_technician(&input.technician)?;
        master.check_task(&input.task)?;
        check_window(input.start, input.end)?;

        let mut id = fresh_id();
        while self.session.assignments.iter().any(|a| a.id == id) {
            id = fresh_id();
        }
        self.session.assignments.push(Assignment {
            id,
            technician: input.technician,
            task: input.task,
            start: input.start,
            end: input.end,
            notes: input.notes,
        });
        let last = self.session.assignments.len() - 1;
        Ok(&self.session.assignments[last])
    }

    pub fn remove_last(&mut self) -> Option<Assignment> {
        self.session.assignments.pop()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.session.assignments.len();
        self.session.assignments.clear();
        removed
    }

    pub fn replace_all(&mut self, assignments: Vec<Assignment>) {
        self.session.assignments = assignments;
    }

    /// Drops the in-memory list of the previous date.
    pub fn switch_date(&mut self, date: NaiveDate, assignments: Vec<Assignment>) {
        self.session = SessionState {
            current_date: date,
            assignments,
        };
    }
}
