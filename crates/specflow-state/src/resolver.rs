//! Dependency resolver: pure readiness decisions over status records.
//!
//! No side effects and no I/O; callers fetch records through the state
//! manager's `get`/`list` and pass them in, which makes readiness trivially
//! testable with synthetic record sets. The resolver must tolerate any
//! interleaving of independent workers completing.

use std::collections::{BTreeMap, HashMap};

use specflow_core::WorkStatus;
use specflow_model::DerivedSpecification;

use crate::record::StatusRecord;

/// Subject -> declared prerequisites, extracted from a derived specification
/// (artifact `depends_on` lists and content `artifact_refs` lists).
#[derive(Debug, Clone, Default)]
pub struct ReadinessPlan {
    prerequisites: BTreeMap<String, Vec<String>>,
    priorities: BTreeMap<String, u8>,
}

impl ReadinessPlan {
    /// Build a plan from a derived specification.
    pub fn from_derived(spec: &DerivedSpecification) -> Self {
        let mut prerequisites = BTreeMap::new();
        let mut priorities = BTreeMap::new();

        for artifact in &spec.artifacts {
            prerequisites.insert(artifact.id.clone(), artifact.depends_on.clone());
            priorities.insert(artifact.id.clone(), artifact.priority);
        }
        for content in &spec.contents {
            prerequisites.insert(content.id.clone(), content.artifact_refs.clone());
            // Composite documents run after their artifacts; advisory
            // priority below every artifact default.
            priorities.insert(content.id.clone(), 10);
        }

        Self {
            prerequisites,
            priorities,
        }
    }

    /// Build a plan from explicit subject -> prerequisites pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let mut prerequisites = BTreeMap::new();
        for (subject, deps) in pairs {
            prerequisites.insert(
                subject.into(),
                deps.into_iter().map(Into::into).collect(),
            );
        }
        Self {
            prerequisites,
            priorities: BTreeMap::new(),
        }
    }

    /// All subjects in the plan.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.prerequisites.keys().map(String::as_str)
    }

    /// Declared prerequisites of one subject, if the plan knows it.
    pub fn prerequisites(&self, subject: &str) -> Option<&[String]> {
        self.prerequisites.get(subject).map(Vec::as_slice)
    }

    /// May `subject` start, given the supplied records?
    ///
    /// True iff every declared prerequisite has a record with status
    /// `completed`. Missing, pending, in-progress, and failed prerequisites
    /// all read as "not ready"; an empty prerequisite list is trivially
    /// ready. Unknown subjects are never ready.
    pub fn can_start(&self, subject: &str, records: &[StatusRecord]) -> bool {
        let Some(required) = self.prerequisites(subject) else {
            return false;
        };
        deps_completed(required, records)
    }

    /// All subjects whose prerequisites are satisfied and which have not
    /// themselves started (no record, or a record still in `pending`).
    ///
    /// Ordered by advisory priority (ascending, 1 is highest), then by
    /// subject name; the ordering is a hint for callers, not an enforced
    /// schedule.
    pub fn ready_set(&self, records: &[StatusRecord]) -> Vec<String> {
        let by_subject: HashMap<&str, &StatusRecord> =
            records.iter().map(|r| (r.subject.as_str(), r)).collect();

        let mut ready: Vec<&str> = self
            .prerequisites
            .iter()
            .filter(|(subject, required)| {
                let not_started = match by_subject.get(subject.as_str()) {
                    None => true,
                    Some(record) => record.status == WorkStatus::Pending,
                };
                not_started && deps_completed(required, records)
            })
            .map(|(subject, _)| subject.as_str())
            .collect();

        ready.sort_by_key(|subject| {
            (
                self.priorities.get(*subject).copied().unwrap_or(5),
                *subject,
            )
        });
        ready.into_iter().map(str::to_string).collect()
    }
}

/// True iff every entry in `required` has a record with status `completed`.
pub fn deps_completed(required: &[String], records: &[StatusRecord]) -> bool {
    required.iter().all(|dep| {
        records
            .iter()
            .any(|record| record.subject == *dep && record.is_completed())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn record(subject: &str, status: WorkStatus) -> StatusRecord {
        StatusRecord::new(subject, status, Vec::new())
    }

    fn plan() -> ReadinessPlan {
        ReadinessPlan::from_pairs([
            ("flow-diagram", vec![]),
            ("erd", vec![]),
            ("summary", vec!["flow-diagram", "erd"]),
        ])
    }

    #[test]
    fn test_no_dependencies_is_trivially_ready() {
        let plan = plan();
        assert!(plan.can_start("flow-diagram", &[]));
    }

    #[test_case(WorkStatus::Pending, false)]
    #[test_case(WorkStatus::InProgress, false)]
    #[test_case(WorkStatus::Completed, true)]
    #[test_case(WorkStatus::Failed, false)]
    fn test_can_start_per_dependency_status(status: WorkStatus, expected: bool) {
        let plan = ReadinessPlan::from_pairs([("b", vec!["a"]), ("a", vec![])]);
        let records = vec![record("a", status)];
        assert_eq!(plan.can_start("b", &records), expected);
    }

    #[test]
    fn test_failed_dependency_never_ready() {
        let plan = plan();
        let records = vec![
            record("flow-diagram", WorkStatus::Completed),
            record("erd", WorkStatus::Failed),
        ];
        assert!(!plan.can_start("summary", &records));
    }

    #[test]
    fn test_missing_dependency_record_not_ready() {
        let plan = plan();
        let records = vec![record("flow-diagram", WorkStatus::Completed)];
        assert!(!plan.can_start("summary", &records));
    }

    #[test]
    fn test_unknown_subject_never_ready() {
        assert!(!plan().can_start("ghost", &[]));
    }

    #[test]
    fn test_ready_set_initial() {
        // Nothing started: only the independent subjects are ready.
        let ready = plan().ready_set(&[]);
        assert_eq!(ready, vec!["erd", "flow-diagram"]);
    }

    #[test]
    fn test_ready_set_unblocks_dependents() {
        let plan = plan();
        let records = vec![
            record("flow-diagram", WorkStatus::Completed),
            record("erd", WorkStatus::Completed),
        ];
        assert_eq!(plan.ready_set(&records), vec!["summary"]);
    }

    #[test]
    fn test_ready_set_excludes_started_subjects() {
        let plan = plan();
        let records = vec![
            record("flow-diagram", WorkStatus::InProgress),
            record("erd", WorkStatus::Pending),
        ];
        // flow-diagram already started; erd is pending and still eligible.
        assert_eq!(plan.ready_set(&records), vec!["erd"]);
    }

    #[test]
    fn test_failure_blast_radius_is_declared_dependents_only() {
        let plan = ReadinessPlan::from_pairs([
            ("a", vec![]),
            ("b", vec![]),
            ("needs-a", vec!["a"]),
            ("needs-b", vec!["b"]),
        ]);
        let records = vec![
            record("a", WorkStatus::Failed),
            record("b", WorkStatus::Completed),
        ];
        let ready = plan.ready_set(&records);
        // a's failure blocks only needs-a; needs-b is unaffected.
        assert!(!ready.contains(&"needs-a".to_string()));
        assert!(ready.contains(&"needs-b".to_string()));
    }

    #[test]
    fn test_ready_set_priority_ordering() {
        use specflow_model::{
            ArtifactKind, ArtifactSpec, DerivedSpecification, OutputConfig, ProducerKind,
        };

        let artifact = |id: &str, priority: u8| ArtifactSpec {
            id: id.to_string(),
            title: id.to_string(),
            kind: ArtifactKind::Flowchart,
            producer: ProducerKind::Mermaid,
            instructions: "Render the flow.".to_string(),
            output_path: format!("{id}.mmd"),
            depends_on: Vec::new(),
            priority,
        };
        let spec = DerivedSpecification {
            name: "p".to_string(),
            version: "1.0.0".to_string(),
            source_name: "p".to_string(),
            generated_at: chrono::Utc::now(),
            artifacts: vec![artifact("zebra", 1), artifact("aardvark", 9)],
            contents: Vec::new(),
            outputs: OutputConfig::default(),
            notes: Vec::new(),
        };

        let plan = ReadinessPlan::from_derived(&spec);
        // Priority 1 sorts ahead of 9 despite the name ordering.
        assert_eq!(plan.ready_set(&[]), vec!["zebra", "aardvark"]);
    }
}
