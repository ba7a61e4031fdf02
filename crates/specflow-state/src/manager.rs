//! State manager: creates, atomically updates, and reads status records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use specflow_core::{Error, Result, WorkStatus};
use tracing::{debug, warn};

use crate::record::StatusRecord;

/// Extension for status record files.
pub const RECORD_SUFFIX: &str = ".status";

/// Suffix for the single retained backup of a record.
pub const BACKUP_SUFFIX: &str = ".status.backup";

/// File name of the aggregate snapshot.
pub const SNAPSHOT_FILE: &str = "workflow.json";

/// Aggregate view of every record in the state directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// All parseable records, sorted by subject.
    pub records: Vec<StatusRecord>,
}

/// Owns the on-disk state directory and the record update discipline.
///
/// Every write serializes the full record to a temp file in the state
/// directory and renames it into place; before replacing an existing record
/// the prior version is copied to `<subject>.status.backup` (one backup
/// retained). Concurrent writers to the same subject are not supported: each
/// named unit of work has exactly one producing worker.
#[derive(Debug, Clone)]
pub struct StateManager {
    state_dir: PathBuf,
}

impl StateManager {
    /// Open (and create if needed) a manager over `state_dir`. The directory
    /// is an explicit parameter; there is no process-wide default.
    pub fn new(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let state_dir = state_dir.into();
        specflow_fs::ensure_dir(&state_dir)?;
        Ok(Self { state_dir })
    }

    /// The state directory.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of a subject's record file.
    pub fn record_path(&self, subject: &str) -> PathBuf {
        self.state_dir.join(format!("{subject}{RECORD_SUFFIX}"))
    }

    /// Path of a subject's backup file.
    pub fn backup_path(&self, subject: &str) -> PathBuf {
        self.state_dir.join(format!("{subject}{BACKUP_SUFFIX}"))
    }

    /// Announce intent to start: create a record in `pending`.
    pub fn begin(&self, subject: &str, input_files: Vec<String>) -> Result<StatusRecord> {
        self.begin_with(subject, input_files, WorkStatus::Pending)
    }

    /// Announce and immediately start: create a record in `in_progress`.
    pub fn begin_active(&self, subject: &str, input_files: Vec<String>) -> Result<StatusRecord> {
        self.begin_with(subject, input_files, WorkStatus::InProgress)
    }

    fn begin_with(
        &self,
        subject: &str,
        input_files: Vec<String>,
        status: WorkStatus,
    ) -> Result<StatusRecord> {
        specflow_model::ids::validate_id(subject)?;

        if self.record_path(subject).exists() {
            let existing = self.get(subject)?;
            let hint = if existing.status.is_terminal() {
                "reset it first"
            } else {
                "another worker already announced it"
            };
            return Err(Error::conflict(format!(
                "record for '{subject}' already exists in status '{}' ({hint})",
                existing.status
            )));
        }

        let record = StatusRecord::new(subject, status, input_files);
        self.write_record(&record)?;
        debug!(subject, status = %record.status, "created status record");
        Ok(record)
    }

    /// Update a subject's record. `output_files` / `errors` replace the
    /// stored lists when provided, making identical updates idempotent up to
    /// `updated_at`. Transitions must be monotonic.
    pub fn update(
        &self,
        subject: &str,
        status: WorkStatus,
        output_files: Option<Vec<String>>,
        errors: Option<Vec<String>>,
    ) -> Result<StatusRecord> {
        let mut record = self.get(subject)?;

        if !record.status.can_transition_to(status) {
            return Err(Error::conflict(format!(
                "invalid transition for '{subject}': {} -> {status} (transitions are monotonic; \
                 use reset to leave a terminal state)",
                record.status
            )));
        }

        record.status = status;
        if let Some(outputs) = output_files {
            record.output_files = outputs;
        }
        if let Some(errors) = errors {
            record.errors = errors;
        }
        record.updated_at = Utc::now();

        self.write_record(&record)?;
        debug!(subject, status = %record.status, "updated status record");
        Ok(record)
    }

    /// Set the downstream subjects that become eligible when this record
    /// completes. Does not touch status or timestamps' semantics beyond the
    /// write itself.
    pub fn link_next(&self, subject: &str, next_subjects: Vec<String>) -> Result<StatusRecord> {
        let mut record = self.get(subject)?;
        record.next_subjects = next_subjects;
        record.updated_at = Utc::now();
        self.write_record(&record)?;
        Ok(record)
    }

    /// Read a subject's record.
    pub fn get(&self, subject: &str) -> Result<StatusRecord> {
        let path = self.record_path(subject);
        if !path.exists() {
            return Err(Error::not_found(format!("status record '{subject}'")));
        }
        let text = specflow_fs::read_to_string(&path, 1_048_576)?;
        serde_json::from_str(&text).map_err(|e| Error::corruption(path, e.to_string()))
    }

    /// List parseable records, optionally filtered by subject prefix, sorted
    /// by subject. Corrupt files are skipped here; the recovery manager
    /// reports them.
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<StatusRecord>> {
        let mut records = Vec::new();

        for path in self.record_files()? {
            let Some(subject) = Self::subject_of(&path) else {
                continue;
            };
            if let Some(prefix) = prefix {
                if !subject.starts_with(prefix) {
                    continue;
                }
            }
            match self.get(&subject) {
                Ok(record) => records.push(record),
                Err(e) => warn!(subject, error = %e, "skipping unreadable record"),
            }
        }

        records.sort_by(|a, b| a.subject.cmp(&b.subject));
        Ok(records)
    }

    /// Explicitly reset a record to `pending`, clearing outputs and errors.
    /// The only sanctioned way out of a terminal state.
    pub fn reset(&self, subject: &str) -> Result<StatusRecord> {
        let prior = self.get(subject)?;
        let mut record = StatusRecord::new(subject, WorkStatus::Pending, prior.input_files);
        record.next_subjects = prior.next_subjects;
        self.write_record(&record)?;
        debug!(subject, "reset status record to pending");
        Ok(record)
    }

    /// Write the aggregate `workflow.json` snapshot and return it.
    pub fn snapshot(&self) -> Result<WorkflowSnapshot> {
        let snapshot = WorkflowSnapshot {
            generated_at: Utc::now(),
            records: self.list(None)?,
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::validation(format!("snapshot serialization failed: {e}")))?;
        specflow_fs::write_string_atomic(self.state_dir.join(SNAPSHOT_FILE), &json)?;
        Ok(snapshot)
    }

    /// Remove a subject's record and backup. Returns whether anything was
    /// removed.
    pub fn clear(&self, subject: &str) -> Result<bool> {
        let record = specflow_fs::remove_file_if_exists(self.record_path(subject))?;
        let backup = specflow_fs::remove_file_if_exists(self.backup_path(subject))?;
        Ok(record || backup)
    }

    /// Remove records (and their backups) not updated within `max_age`.
    /// Returns the number of records removed. Corrupt files are left for the
    /// recovery manager.
    pub fn cleanup_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0;

        for path in self.record_files()? {
            let Some(subject) = Self::subject_of(&path) else {
                continue;
            };
            let Ok(record) = self.get(&subject) else {
                continue;
            };
            if record.updated_at < cutoff {
                self.clear(&subject)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// All record files in the state directory.
    pub(crate) fn record_files(&self) -> Result<Vec<PathBuf>> {
        Ok(specflow_fs::list_files(&self.state_dir)?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(RECORD_SUFFIX))
            })
            .collect())
    }

    /// Subject encoded in a record file name.
    pub(crate) fn subject_of(path: &Path) -> Option<String> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(RECORD_SUFFIX))
            .map(str::to_string)
    }

    /// Serialize and atomically install a record, retaining the prior
    /// version as the single backup.
    pub(crate) fn write_record(&self, record: &StatusRecord) -> Result<()> {
        let path = self.record_path(&record.subject);
        if path.exists() {
            specflow_fs::copy_file(&path, self.backup_path(&record.subject), true)?;
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::validation(format!("record serialization failed: {e}")))?;
        specflow_fs::write_string_atomic(&path, &json)
    }

    /// Most recent valid backup for a subject, if any.
    pub(crate) fn read_backup(&self, subject: &str) -> Option<StatusRecord> {
        let path = self.backup_path(subject);
        let text = specflow_fs::read_to_string(&path, 1_048_576).ok()?;
        serde_json::from_str(&text).ok()
    }
}
