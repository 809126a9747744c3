use crate::plan::{check_window, fresh_id, parse_time_text, Assignment, MasterData, PlanError};
use std::collections::HashSet;
use std::fmt;

/// One row of the editable grid as submitted by the UI. Every field is
/// optional because scratch rows may be half filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRow {
    pub id: Option<String>,
    pub technician: Option<String>,
    pub task: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based grid row.
    pub row: usize,
    pub error: PlanError,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub committed: Vec<Assignment>,
    pub skipped: Vec<usize>,
    pub diagnostics: Vec<RowError>,
}

impl BatchResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Any rejected row voids the whole batch.
    #[default]
    AllOrNothing,
    /// Rejected rows are dropped and the remaining rows are committed.
    DropInvalidRows,
}

impl CommitPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allOrNothing" => Some(CommitPolicy::AllOrNothing),
            "dropInvalidRows" => Some(CommitPolicy::DropInvalidRows),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommitPolicy::AllOrNothing => "allOrNothing",
            CommitPolicy::DropInvalidRows => "dropInvalidRows",
        }
    }

    pub fn permits(self, batch: &BatchResult) -> bool {
        match self {
            CommitPolicy::AllOrNothing => batch.is_clean(),
            CommitPolicy::DropInvalidRows => true,
        }
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validates every row of a replacement table. Rows missing a technician or a
/// task are skipped; every other row either lands in `committed` (in grid
/// order, keeping its ID) or produces exactly one diagnostic.
pub fn reconcile(master: &MasterData, rows: &[GridRow]) -> BatchResult {
    let mut out = BatchResult::default();
    let mut taken: HashSet<String> = HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        let row_no = i + 1;
        let (Some(technician), Some(task)) = (non_blank(&row.technician), non_blank(&row.task))
        else {
            out.skipped.push(row_no);
            continue;
        };

        match validate_row(master, technician, task, row, &taken) {
            Ok(assignment) => {
                taken.insert(assignment.id.clone());
                out.committed.push(assignment);
            }
            Err(error) => out.diagnostics.push(RowError { row: row_no, error }),
        }
    }
    out
}

fn validate_row(
    master: &MasterData,
    technician: &str,
    task: &str,
    row: &GridRow,
    taken: &HashSet<String>,
) -> Result<Assignment, PlanError> {
    let start = parse_time_text(row.start.as_deref().unwrap_or_default())?;
    let end = parse_time_text(row.end.as_deref().unwrap_or_default())?;
    check_window(start, end)?;
    master.check_technician(technician)?;
    master.check_task(task)?;

    let id = match non_blank(&row.id) {
        Some(id) if taken.contains(id) => return Err(PlanError::DuplicateId(id.to_string())),
        Some(id) => id.to_string(),
        None => {
            let mut id = fresh_id();
            while taken.contains(&id) {
                id = fresh_id();
            }
            id
        }
    };

    Ok(Assignment {
        id,
        technician: technician.to_string(),
        task: task.to_string(),
        start,
        end,
        notes: row.notes.clone().unwrap_or_default(),
    })
}
