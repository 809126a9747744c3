use crate::export;
use crate::persistence::{document_key, LoadWarning, PersistenceAdapter, WriteStatus};
use crate::plan::{
    Assignment, AssignmentStore, MasterData, NewAssignment, PlanError, SessionState,
};
use crate::reconcile::{reconcile, BatchResult, CommitPolicy, GridRow};
use crate::timeline::{build_timeline, Timeline};
use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

/// A mutation that was applied in memory, plus the outcome of the save that
/// followed it. A failed save does not undo the mutation.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub write: Result<WriteStatus, PlanError>,
}

#[derive(Debug)]
pub struct ReplaceOutcome {
    pub batch: BatchResult,
    pub committed: bool,
    pub write: Result<WriteStatus, PlanError>,
}

/// Write-through board: every effective mutation of the current date's list
/// is followed by a full save of that list.
///
/// A date whose stored document could not be read is never written: its
/// edits stay in memory until a later `select_date` reads it cleanly.
pub struct Board {
    master: MasterData,
    store: AssignmentStore,
    persistence: PersistenceAdapter,
    load_warnings: Vec<LoadWarning>,
    read_failure: Option<String>,
}

impl Board {
    pub fn new(master: MasterData, persistence: PersistenceAdapter, date: NaiveDate) -> Self {
        Self {
            master,
            store: AssignmentStore::new(date),
            persistence,
            load_warnings: Vec::new(),
            read_failure: None,
        }
    }

    pub fn master(&self) -> &MasterData {
        &self.master
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    /// Session-wide or current-date reason why edits are not being stored.
    pub fn persistence_warning(&self) -> Option<PlanError> {
        self.persistence.unavailable().or_else(|| {
            self.read_failure.as_ref().map(|reason| {
                PlanError::PersistenceUnavailable(format!(
                    "{reason}; changes to this date are kept for this session only"
                ))
            })
        })
    }

    /// Warnings from the last load of the current date. Cleared once the
    /// date's document has been rewritten.
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }

    pub fn current_date(&self) -> NaiveDate {
        self.store.current_date()
    }

    pub fn current_key(&self) -> String {
        document_key(self.store.current_date())
    }

    pub fn session(&self) -> &SessionState {
        self.store.session()
    }

    pub fn assignments(&self) -> &[Assignment] {
        self.store.assignments()
    }

    pub fn select_date(&mut self, date: NaiveDate) -> &[LoadWarning] {
        let loaded = self.persistence.load(date);
        if let Some(reason) = &loaded.read_error {
            error!(key = %document_key(date), %reason, "stored plan unreadable, saves suspended");
        }
        for w in &loaded.warnings {
            warn!(key = %document_key(date), warning = %w, "skipped stored entry");
        }
        info!(
            key = %document_key(date),
            count = loaded.assignments.len(),
            "plan loaded"
        );
        self.store.switch_date(date, loaded.assignments);
        self.read_failure = loaded.read_error;
        self.load_warnings = loaded.warnings;
        &self.load_warnings
    }

    pub fn add(&mut self, input: NewAssignment) -> Result<Applied<Assignment>, PlanError> {
        let created = self.store.add(&self.master, input)?.clone();
        debug!(id = %created.id, technician = %created.technician, "assignment added");
        Ok(Applied {
            value: created,
            write: self.persist(),
        })
    }

    pub fn remove_last(&mut self) -> Applied<Option<Assignment>> {
        match self.store.remove_last() {
            Some(removed) => {
                debug!(id = %removed.id, "last assignment removed");
                Applied {
                    value: Some(removed),
                    write: self.persist(),
                }
            }
            None => Applied {
                value: None,
                write: Ok(WriteStatus::Unchanged),
            },
        }
    }

    pub fn clear(&mut self) -> Applied<usize> {
        let removed = self.store.clear();
        debug!(removed, "plan cleared");
        Applied {
            value: removed,
            write: self.persist(),
        }
    }

    pub fn replace_all(&mut self, rows: &[GridRow], policy: CommitPolicy) -> ReplaceOutcome {
        let batch = reconcile(&self.master, rows);
        if !policy.permits(&batch) {
            info!(
                rejected = batch.diagnostics.len(),
                policy = policy.as_str(),
                "grid edit not committed"
            );
            return ReplaceOutcome {
                batch,
                committed: false,
                write: Ok(WriteStatus::Unchanged),
            };
        }

        self.store.replace_all(batch.committed.clone());
        debug!(
            count = batch.committed.len(),
            dropped = batch.diagnostics.len(),
            "grid edit committed"
        );
        ReplaceOutcome {
            batch,
            committed: true,
            write: self.persist(),
        }
    }

    pub fn timeline(&self) -> Timeline {
        build_timeline(self.current_date(), &self.master, self.assignments())
    }

    pub fn export_csv(&self) -> String {
        export::render_csv(self.assignments())
    }

    fn persist(&mut self) -> Result<WriteStatus, PlanError> {
        if self.read_failure.is_some() {
            warn!(key = %self.current_key(), "stored plan unread, change kept in memory only");
            return Ok(WriteStatus::SessionOnly);
        }
        let result = self
            .persistence
            .save(self.store.current_date(), self.store.assignments());
        match &result {
            Ok(WriteStatus::Saved) => self.load_warnings.clear(),
            Err(e) => error!(key = %self.current_key(), error = %e, "plan kept in memory only"),
            Ok(_) => {}
        }
        result
    }
}
