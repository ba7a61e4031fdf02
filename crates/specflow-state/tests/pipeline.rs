//! End-to-end pipeline coordination: specification store, state manager,
//! dependency resolver, and recovery working against one shared directory
//! tree, the way independent workers would.

use chrono::{Duration, Utc};
use specflow_core::WorkStatus;
use specflow_model::{
    ArtifactKind, ArtifactSpec, ContentBlock, ContentKind, ContentSpec, DerivedSpecification,
    GenerationRequest, OutputConfig, ProducerKind, SourceSpecification,
};
use specflow_state::{ChangeWatcher, ReadinessPlan, RecoveryManager, StateManager};
use specflow_store::SpecificationStore;
use tempfile::tempdir;

fn checkout_source() -> SourceSpecification {
    SourceSpecification::new(
        "checkout-flow",
        ContentBlock::inline("Customers move from cart to payment to confirmation."),
        vec![GenerationRequest::new("flowchart").with_description("show order flow")],
    )
}

fn checkout_derived() -> DerivedSpecification {
    DerivedSpecification {
        name: "checkout-flow".to_string(),
        version: "1.0.0".to_string(),
        source_name: "checkout-flow".to_string(),
        generated_at: Utc::now(),
        artifacts: vec![ArtifactSpec {
            id: "flow-diagram".to_string(),
            title: "Order flow".to_string(),
            kind: ArtifactKind::Flowchart,
            producer: ProducerKind::Mermaid,
            instructions: "Show the order flow from cart to confirmation.".to_string(),
            output_path: "flow-diagram.mmd".to_string(),
            depends_on: Vec::new(),
            priority: 5,
        }],
        contents: vec![ContentSpec {
            id: "summary".to_string(),
            output_path: "summary.md".to_string(),
            kind: ContentKind::Documentation,
            title: "Checkout summary".to_string(),
            template: None,
            sections: vec!["Overview".to_string()],
            artifact_refs: vec!["flow-diagram".to_string()],
            instructions: "Summarize the order flow with the diagram inline.".to_string(),
        }],
        outputs: OutputConfig::default(),
        notes: Vec::new(),
    }
}

#[test]
fn test_checkout_flow_end_to_end() {
    let root = tempdir().unwrap();
    let store = SpecificationStore::new(root.path().join("specs")).unwrap();
    let manager = StateManager::new(root.path().join("state")).unwrap();

    // Caller authors the source specification.
    let mut source = checkout_source();
    store.save_source(&mut source, false).unwrap();

    // Transformation worker derives the richer specification.
    let derived = checkout_derived();
    store.save_derived(&derived, false).unwrap();
    let derived = store.load_derived("checkout-flow").unwrap();

    let plan = ReadinessPlan::from_derived(&derived);

    // Before the diagram completes, the summary must report not-ready.
    assert!(!plan.can_start("summary", &manager.list(None).unwrap()));
    assert_eq!(
        plan.ready_set(&manager.list(None).unwrap()),
        vec!["flow-diagram"]
    );

    // Diagram worker runs.
    manager
        .begin_active(
            "flow-diagram",
            vec![store
                .path_for("checkout-flow", specflow_model::SpecKind::Derived)
                .to_string_lossy()
                .to_string()],
        )
        .unwrap();
    assert!(!plan.can_start("summary", &manager.list(None).unwrap()));

    manager
        .update(
            "flow-diagram",
            WorkStatus::Completed,
            Some(vec!["artifacts/flow-diagram.svg".to_string()]),
            None,
        )
        .unwrap();

    // Completion unblocks exactly the declared dependent.
    let records = manager.list(None).unwrap();
    assert!(plan.can_start("summary", &records));
    assert_eq!(plan.ready_set(&records), vec!["summary"]);

    manager.begin_active("summary", Vec::new()).unwrap();
    manager
        .update(
            "summary",
            WorkStatus::Completed,
            Some(vec!["contents/summary.md".to_string()]),
            None,
        )
        .unwrap();

    // Aggregate snapshot reflects the finished pipeline.
    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.records.iter().all(|r| r.is_completed()));
}

#[test]
fn test_staleness_scenario() {
    let root = tempdir().unwrap();
    let manager = StateManager::new(root.path().join("state")).unwrap();
    let recovery = RecoveryManager::with_staleness(manager.clone(), Duration::seconds(60));

    manager.begin_active("x", Vec::new()).unwrap();

    // Simulate T0+61s without touching the wall clock: age the record.
    let mut record = manager.get("x").unwrap();
    record.updated_at = Utc::now() - Duration::seconds(61);
    std::fs::write(
        manager.record_path("x"),
        serde_json::to_string(&record).unwrap(),
    )
    .unwrap();

    let anomalies = recovery.scan().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].subject, "x");
    assert_eq!(anomalies[0].kind.name(), "stale");

    match recovery.repair(&anomalies[0]).unwrap() {
        specflow_state::RepairOutcome::Repaired(repaired) => {
            assert_eq!(repaired.status, WorkStatus::Failed);
            assert!(!repaired.errors.is_empty());
        }
        specflow_state::RepairOutcome::Unrecoverable(reason) => {
            panic!("expected repair, got: {reason}")
        }
    }
}

#[test]
fn test_watcher_sees_store_and_state_writes() {
    let root = tempdir().unwrap();
    let store = SpecificationStore::new(root.path().join("specs")).unwrap();
    let manager = StateManager::new(root.path().join("state")).unwrap();

    let mut spec_watcher = ChangeWatcher::new(store.root());
    let mut state_watcher = ChangeWatcher::new(manager.state_dir());
    assert!(spec_watcher.poll().unwrap().is_empty());
    assert!(state_watcher.poll().unwrap().is_empty());

    store.save_source(&mut checkout_source(), false).unwrap();
    manager.begin("flow-diagram", Vec::new()).unwrap();

    let spec_events = spec_watcher.poll().unwrap();
    assert_eq!(spec_events.len(), 1);
    assert!(spec_events[0].path.ends_with("checkout-flow.source.yaml"));

    let state_events = state_watcher.poll().unwrap();
    assert_eq!(state_events.len(), 1);
    assert!(state_events[0].path.ends_with("flow-diagram.status"));
}

#[test]
fn test_crash_mid_write_preserves_committed_view() {
    let root = tempdir().unwrap();
    let manager = StateManager::new(root.path().join("state")).unwrap();
    let recovery = RecoveryManager::with_staleness(manager.clone(), Duration::seconds(60));

    manager.begin_active("x", Vec::new()).unwrap();
    manager
        .update("x", WorkStatus::Completed, None, None)
        .unwrap();
    let committed = manager.get("x").unwrap();

    // A writer died mid-update: temp file present, rename never happened.
    std::fs::write(
        manager.state_dir().join(".x.status.tmp"),
        "{\"subject\": \"x\", \"status\":",
    )
    .unwrap();

    // The committed record is intact and visible.
    assert_eq!(manager.get("x").unwrap(), committed);

    // No false staleness anomaly for the genuinely completed record.
    assert!(recovery.scan().unwrap().is_empty());
}
