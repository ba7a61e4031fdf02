//! The status record, unit of coordination state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specflow_core::WorkStatus;

/// One worker's coordination record, serialized as `<subject>.status`.
///
/// Created by the state manager when a worker announces intent, updated only
/// by the owning worker, read by any number of concurrent readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Subject name; the join key to the specification entry it reports on.
    pub subject: String,
    /// Current status.
    pub status: WorkStatus,
    /// When the record was created.
    pub started_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Input file paths consumed.
    #[serde(default)]
    pub input_files: Vec<String>,
    /// Output file paths produced.
    #[serde(default)]
    pub output_files: Vec<String>,
    /// Error messages; empty on success. Recovery appends audit notes here.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Downstream subjects that become eligible once this record completes.
    #[serde(default)]
    pub next_subjects: Vec<String>,
}

impl StatusRecord {
    /// Create a record in the given initial status.
    pub fn new(subject: impl Into<String>, status: WorkStatus, input_files: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            subject: subject.into(),
            status,
            started_at: now,
            updated_at: now,
            input_files,
            output_files: Vec::new(),
            errors: Vec::new(),
            next_subjects: Vec::new(),
        }
    }

    /// Age since the last write.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.updated_at
    }

    /// Whether this record counts as a satisfied prerequisite.
    pub fn is_completed(&self) -> bool {
        self.status == WorkStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let record = StatusRecord::new(
            "flow-diagram",
            WorkStatus::Pending,
            vec!["specs/checkout-flow.derived.yaml".to_string()],
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["subject"], "flow-diagram");
        assert_eq!(json["status"], "pending");
        assert!(json["started_at"].is_string());
        assert!(json["updated_at"].is_string());
        assert!(json["input_files"].is_array());
        assert!(json["output_files"].is_array());
        assert!(json["errors"].is_array());
        assert!(json["next_subjects"].is_array());
    }

    #[test]
    fn test_missing_lists_default_empty() {
        let json = r#"{
            "subject": "x",
            "status": "in_progress",
            "started_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        assert!(record.output_files.is_empty());
        assert!(record.errors.is_empty());
    }

    #[test]
    fn test_age() {
        let mut record = StatusRecord::new("x", WorkStatus::InProgress, Vec::new());
        record.updated_at = Utc::now() - chrono::Duration::seconds(90);
        assert!(record.age(Utc::now()) >= chrono::Duration::seconds(90));
    }
}
