//! Recovery manager: detects stale or damaged status records and restores a
//! consistent state.
//!
//! Recovery produces accurate state; it never retries work itself, and every
//! repair appends a human-readable note to the affected record's error list
//! so the audit trail is never silently altered. This is the only component
//! permitted to rewrite another worker's record.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use specflow_core::{Result, WorkStatus};
use tracing::{info, warn};

use crate::manager::StateManager;
use crate::record::StatusRecord;

/// Default staleness threshold in seconds: five minutes without an update.
pub const DEFAULT_STALENESS_SECS: i64 = 300;

/// One detected inconsistency in the state directory.
#[derive(Debug, Clone)]
pub struct Anomaly {
    /// Subject of the affected record.
    pub subject: String,
    /// Path of the affected file.
    pub path: PathBuf,
    /// What is wrong.
    pub kind: AnomalyKind,
}

/// Kinds of anomaly the scanner detects.
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyKind {
    /// `in_progress` past the staleness threshold; candidate orphan from a
    /// crashed worker.
    Stale {
        /// Seconds since the last update.
        age_secs: i64,
    },
    /// Record file fails to parse (a partial write that escaped the rename
    /// discipline, e.g. an external tool bypassing the API).
    Corrupt {
        /// Parse failure detail.
        message: String,
    },
    /// Record references input/output files that no longer exist.
    MissingFiles {
        /// The paths that could not be found.
        missing: Vec<String>,
    },
}

impl AnomalyKind {
    /// Machine-readable kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stale { .. } => "stale",
            Self::Corrupt { .. } => "corrupt",
            Self::MissingFiles { .. } => "missing_files",
        }
    }
}

/// Outcome of a repair attempt.
#[derive(Debug, Clone)]
pub enum RepairOutcome {
    /// The record was rewritten into a consistent state.
    Repaired(StatusRecord),
    /// No valid backup exists; manual intervention required.
    Unrecoverable(String),
}

/// Scans a state directory for anomalies and repairs them.
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    manager: StateManager,
    staleness: Duration,
}

impl RecoveryManager {
    /// Create a recovery manager with the default staleness threshold.
    pub fn new(manager: StateManager) -> Self {
        Self::with_staleness(manager, Duration::seconds(DEFAULT_STALENESS_SECS))
    }

    /// Create a recovery manager with a caller-configured threshold.
    pub fn with_staleness(manager: StateManager, staleness: Duration) -> Self {
        Self { manager, staleness }
    }

    /// Scan every record file for anomalies. A genuinely completed record is
    /// never reported stale, whatever its age. Relative input/output paths
    /// are resolved against the state directory's parent (the workspace
    /// root), not the process working directory, so scanning from elsewhere
    /// does not produce spurious missing-file reports.
    pub fn scan(&self) -> Result<Vec<Anomaly>> {
        let now = Utc::now();
        let base = self
            .manager
            .state_dir()
            .parent()
            .unwrap_or_else(|| self.manager.state_dir())
            .to_path_buf();
        let mut anomalies = Vec::new();

        for path in self.manager.record_files()? {
            let Some(subject) = StateManager::subject_of(&path) else {
                continue;
            };

            let record = match self.manager.get(&subject) {
                Ok(record) => record,
                Err(specflow_core::Error::Corruption { message, .. }) => {
                    anomalies.push(Anomaly {
                        subject,
                        path,
                        kind: AnomalyKind::Corrupt { message },
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if record.status == WorkStatus::InProgress && record.age(now) > self.staleness {
                anomalies.push(Anomaly {
                    subject: subject.clone(),
                    path: path.clone(),
                    kind: AnomalyKind::Stale {
                        age_secs: record.age(now).num_seconds(),
                    },
                });
            }

            let missing: Vec<String> = record
                .input_files
                .iter()
                .chain(record.output_files.iter())
                .filter(|f| {
                    let path = Path::new(f);
                    let resolved = if path.is_absolute() {
                        path.to_path_buf()
                    } else {
                        base.join(path)
                    };
                    !resolved.exists()
                })
                .cloned()
                .collect();
            if !missing.is_empty() {
                anomalies.push(Anomaly {
                    subject,
                    path,
                    kind: AnomalyKind::MissingFiles { missing },
                });
            }
        }

        Ok(anomalies)
    }

    /// Repair one anomaly.
    ///
    /// Stale records transition to `failed` with an explanatory error entry
    /// (never silently to `completed`). Corrupt records are restored from the
    /// most recent valid backup when one exists. Missing referenced files get
    /// a warning appended without a status change: missing outputs after
    /// success is a data-hygiene issue, not a coordination failure.
    pub fn repair(&self, anomaly: &Anomaly) -> Result<RepairOutcome> {
        match &anomaly.kind {
            AnomalyKind::Stale { age_secs } => {
                let mut record = self.manager.get(&anomaly.subject)?;
                record.status = WorkStatus::Failed;
                record.errors.push(format!(
                    "recovery: marked failed after {age_secs}s without an update \
                     (staleness threshold {}s); presumed crashed worker",
                    self.staleness.num_seconds()
                ));
                record.updated_at = Utc::now();
                self.manager.write_record(&record)?;
                info!(subject = %anomaly.subject, "repaired stale record: in_progress -> failed");
                Ok(RepairOutcome::Repaired(record))
            }
            AnomalyKind::Corrupt { message } => {
                match self.manager.read_backup(&anomaly.subject) {
                    Some(mut backup) => {
                        backup.errors.push(format!(
                            "recovery: restored from backup after corrupt record ({message})"
                        ));
                        backup.updated_at = Utc::now();
                        self.manager.write_record(&backup)?;
                        info!(subject = %anomaly.subject, "repaired corrupt record from backup");
                        Ok(RepairOutcome::Repaired(backup))
                    }
                    None => {
                        warn!(
                            subject = %anomaly.subject,
                            "corrupt record has no valid backup; manual intervention required"
                        );
                        Ok(RepairOutcome::Unrecoverable(format!(
                            "no valid backup for '{}': {message}",
                            anomaly.subject
                        )))
                    }
                }
            }
            AnomalyKind::MissingFiles { missing } => {
                let mut record = self.manager.get(&anomaly.subject)?;
                for file in missing {
                    record
                        .errors
                        .push(format!("recovery: referenced file no longer exists: {file}"));
                }
                record.updated_at = Utc::now();
                self.manager.write_record(&record)?;
                Ok(RepairOutcome::Repaired(record))
            }
        }
    }
}
