//! Command execution: each command produces one JSON value for stdout.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use specflow_core::{Error, Result, WorkStatus};
use specflow_model::{DerivedSpecification, SourceSpecification, SpecKind};
use specflow_state::{
    ChangeWatcher, ReadinessPlan, RecoveryManager, RepairOutcome, StateManager,
};
use specflow_store::{Specification, SpecificationStore};

use crate::cli::{Cli, Command};

/// Read cap for YAML files passed on the command line.
const MAX_FILE_SIZE: u64 = 1_048_576;

pub fn run(cli: &Cli) -> Result<Value> {
    match &cli.command {
        Command::List { kind } => list(cli, kind),
        Command::Show { name, kind } => show(cli, name, kind),
        Command::Save {
            name,
            kind,
            file,
            force,
        } => save(cli, name, kind, file, *force),
        Command::Validate { name, kind, file } => validate(cli, name.as_deref(), kind, file.as_deref()),
        Command::Schema { kind } => schema(cli, kind),
        Command::Delete { name, kind, yes } => delete(cli, name, kind, *yes),
        Command::Status { prefix } => status(cli, prefix.as_deref()),
        Command::Begin {
            subject,
            inputs,
            next,
            active,
        } => begin(cli, subject, inputs.clone(), next, *active),
        Command::Update {
            subject,
            status,
            outputs,
            errors,
            next,
        } => update(cli, subject, status, outputs, errors, next),
        Command::Reset { subject } => reset(cli, subject),
        Command::Ready { name } => ready(cli, name),
        Command::Recover { threshold, apply } => recover(cli, *threshold, *apply),
        Command::Watch { dir, since } => watch(dir, since.as_deref()),
        Command::Snapshot => snapshot(cli),
    }
}

fn store(cli: &Cli) -> Result<SpecificationStore> {
    SpecificationStore::new(&cli.spec_dir)
}

fn manager(cli: &Cli) -> Result<StateManager> {
    StateManager::new(&cli.state_dir)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::validation(format!("serialization failed: {e}")))
}

fn list(cli: &Cli, kind: &str) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;
    let summaries = store(cli)?.list(kind)?;
    Ok(json!({ "ok": true, "kind": kind, "specifications": to_json(&summaries)? }))
}

fn show(cli: &Cli, name: &str, kind: &str) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;
    let doc = match store(cli)?.load(name, kind)? {
        Specification::Source(spec) => to_json(&spec)?,
        Specification::Derived(spec) => to_json(&spec)?,
    };
    Ok(json!({ "ok": true, "name": name, "kind": kind, "specification": doc }))
}

fn save(cli: &Cli, name: &str, kind: &str, file: &Path, force: bool) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;
    let text = specflow_fs::read_to_string(file, MAX_FILE_SIZE)?;
    let store = store(cli)?;

    let path = match kind {
        SpecKind::Source => {
            let mut spec: SourceSpecification = parse_yaml(&text, kind)?;
            check_name(name, &spec.name)?;
            store.save_source(&mut spec, force)?
        }
        SpecKind::Derived => {
            let spec: DerivedSpecification = parse_yaml(&text, kind)?;
            check_name(name, &spec.name)?;
            store.save_derived(&spec, force)?
        }
    };

    Ok(json!({ "ok": true, "name": name, "kind": kind, "path": path }))
}

fn validate(cli: &Cli, name: Option<&str>, kind: &str, file: Option<&Path>) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;

    let validated_name = match (name, file) {
        (Some(name), None) => store(cli)?.load(name, kind)?.name().to_string(),
        (None, Some(file)) => {
            let text = specflow_fs::read_to_string(file, MAX_FILE_SIZE)?;
            match kind {
                SpecKind::Source => {
                    let mut spec: SourceSpecification = parse_yaml(&text, kind)?;
                    spec.validate()?;
                    spec.name
                }
                SpecKind::Derived => {
                    let spec: DerivedSpecification = parse_yaml(&text, kind)?;
                    spec.validate()?;
                    spec.name
                }
            }
        }
        _ => {
            return Err(Error::validation(
                "pass exactly one of a document name or --file",
            ))
        }
    };

    Ok(json!({ "ok": true, "name": validated_name, "kind": kind, "valid": true }))
}

fn schema(cli: &Cli, kind: &str) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;
    store(cli)?.schema(kind)
}

fn delete(cli: &Cli, name: &str, kind: &str, yes: bool) -> Result<Value> {
    let kind: SpecKind = kind.parse()?;
    if !yes {
        return Err(Error::conflict(format!(
            "refusing to delete {kind} specification '{name}' without --yes"
        )));
    }
    let removed = store(cli)?.delete(name, kind)?;
    Ok(json!({ "ok": true, "name": name, "kind": kind, "removed": removed }))
}

fn status(cli: &Cli, prefix: Option<&str>) -> Result<Value> {
    let records = manager(cli)?.list(prefix)?;
    Ok(json!({ "ok": true, "count": records.len(), "records": to_json(&records)? }))
}

fn begin(
    cli: &Cli,
    subject: &str,
    inputs: Vec<String>,
    next: &[String],
    active: bool,
) -> Result<Value> {
    let manager = manager(cli)?;
    let mut record = if active {
        manager.begin_active(subject, inputs)?
    } else {
        manager.begin(subject, inputs)?
    };
    if !next.is_empty() {
        record = manager.link_next(subject, next.to_vec())?;
    }
    Ok(json!({ "ok": true, "record": to_json(&record)? }))
}

fn update(
    cli: &Cli,
    subject: &str,
    status: &str,
    outputs: &[String],
    errors: &[String],
    next: &[String],
) -> Result<Value> {
    let status: WorkStatus = status.parse()?;
    let outputs = (!outputs.is_empty()).then(|| outputs.to_vec());
    let errors = (!errors.is_empty()).then(|| errors.to_vec());
    let manager = manager(cli)?;
    let mut record = manager.update(subject, status, outputs, errors)?;
    if !next.is_empty() {
        record = manager.link_next(subject, next.to_vec())?;
    }
    Ok(json!({ "ok": true, "record": to_json(&record)? }))
}

fn reset(cli: &Cli, subject: &str) -> Result<Value> {
    let record = manager(cli)?.reset(subject)?;
    Ok(json!({ "ok": true, "record": to_json(&record)? }))
}

fn ready(cli: &Cli, name: &str) -> Result<Value> {
    let derived = store(cli)?.load_derived(name)?;
    let plan = ReadinessPlan::from_derived(&derived);
    let records = manager(cli)?.list(None)?;

    let ready = plan.ready_set(&records);
    let blocked: Vec<Value> = plan
        .subjects()
        .filter(|s| !ready.iter().any(|r| r == s) && !plan.can_start(s, &records))
        .map(|s| {
            json!({
                "subject": s,
                "prerequisites": plan.prerequisites(s),
            })
        })
        .collect();

    Ok(json!({ "ok": true, "name": name, "ready": ready, "blocked": blocked }))
}

fn recover(cli: &Cli, threshold: Option<i64>, apply: bool) -> Result<Value> {
    let manager = manager(cli)?;
    let recovery = match threshold {
        Some(secs) => {
            RecoveryManager::with_staleness(manager, chrono::Duration::seconds(secs))
        }
        None => RecoveryManager::new(manager),
    };

    let anomalies = recovery.scan()?;
    let mut report = Vec::with_capacity(anomalies.len());

    for anomaly in &anomalies {
        let mut entry = json!({
            "subject": anomaly.subject,
            "path": anomaly.path,
            "kind": anomaly.kind.name(),
        });
        if apply {
            let outcome = match recovery.repair(anomaly)? {
                RepairOutcome::Repaired(record) => {
                    json!({ "repaired": true, "status": record.status })
                }
                RepairOutcome::Unrecoverable(reason) => {
                    json!({ "repaired": false, "reason": reason })
                }
            };
            entry["outcome"] = outcome;
        }
        report.push(entry);
    }

    Ok(json!({ "ok": true, "applied": apply, "anomalies": report }))
}

fn watch(dir: &Path, since: Option<&str>) -> Result<Value> {
    let since = since
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| Error::validation(format!("invalid --since timestamp '{s}': {e}")))
        })
        .transpose()?;

    let mut watcher = ChangeWatcher::since(dir, since);
    let events: Vec<Value> = watcher
        .poll()?
        .into_iter()
        .map(|e| {
            json!({
                "path": e.path,
                "kind": match e.kind {
                    specflow_state::ChangeKind::Created => "created",
                    specflow_state::ChangeKind::Modified => "modified",
                },
                "timestamp": e.timestamp,
            })
        })
        .collect();

    Ok(json!({ "ok": true, "events": events, "cursor": watcher.cursor() }))
}

fn snapshot(cli: &Cli) -> Result<Value> {
    let snapshot = manager(cli)?.snapshot()?;
    Ok(json!({ "ok": true, "snapshot": to_json(&snapshot)? }))
}

fn parse_yaml<T: serde::de::DeserializeOwned>(text: &str, kind: SpecKind) -> Result<T> {
    serde_yaml::from_str(text)
        .map_err(|e| Error::validation(format!("invalid {kind} specification: {e}")))
}

fn check_name(expected: &str, actual: &str) -> Result<()> {
    if expected != actual {
        return Err(Error::validation(format!(
            "document name '{actual}' does not match argument '{expected}'"
        )));
    }
    Ok(())
}
