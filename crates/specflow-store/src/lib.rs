//! Specification store: validated, durable persistence for source and
//! derived specification documents.
//!
//! The store owns the spec root directory. Documents are YAML files named
//! `<name>.source.yaml` / `<name>.derived.yaml`. Every save validates first,
//! then writes the full serialization through the atomic temp-then-rename
//! discipline, so a concurrent reader never observes a half-written document.
//! The store never retries; it returns a typed error and lets the caller
//! decide.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use specflow_core::{Error, Result};
use specflow_model::{DerivedSpecification, SourceSpecification, SpecKind};
use tracing::debug;

/// Read cap for a single specification file (1 MiB, matching the inline
/// content cap).
const MAX_SPEC_FILE_SIZE: u64 = 1_048_576;

/// A loaded specification of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Specification {
    /// User-authored document.
    Source(SourceSpecification),
    /// Machine-derived document.
    Derived(DerivedSpecification),
}

impl Specification {
    /// Document name.
    pub fn name(&self) -> &str {
        match self {
            Self::Source(s) => &s.name,
            Self::Derived(d) => &d.name,
        }
    }

    /// Document kind.
    pub fn kind(&self) -> SpecKind {
        match self {
            Self::Source(_) => SpecKind::Source,
            Self::Derived(_) => SpecKind::Derived,
        }
    }
}

/// Lightweight listing entry. Unparseable files appear with `valid: false`
/// rather than failing the whole listing.
#[derive(Debug, Clone, Serialize)]
pub struct SpecSummary {
    /// Document name (file stem for unparseable files).
    pub name: String,
    /// Document kind.
    pub kind: SpecKind,
    /// Version, when the file parsed.
    pub version: Option<String>,
    /// On-disk path.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Number of requests (source) or artifacts (derived).
    pub entry_count: usize,
    /// Whether the file parsed and validated.
    pub valid: bool,
}

/// Store for specification documents under one root directory.
///
/// The root is an explicit constructor parameter; there is no process-wide
/// default.
#[derive(Debug, Clone)]
pub struct SpecificationStore {
    root: PathBuf,
}

impl SpecificationStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        specflow_fs::ensure_dir(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path for a named document of a kind.
    pub fn path_for(&self, name: &str, kind: SpecKind) -> PathBuf {
        self.root.join(format!("{name}{}", kind.file_suffix()))
    }

    /// JSON schema for a document kind.
    pub fn schema(&self, kind: SpecKind) -> Result<serde_json::Value> {
        kind.schema()
    }

    /// Load a document of either kind by name.
    pub fn load(&self, name: &str, kind: SpecKind) -> Result<Specification> {
        match kind {
            SpecKind::Source => self.load_source(name).map(Specification::Source),
            SpecKind::Derived => self.load_derived(name).map(Specification::Derived),
        }
    }

    /// Load and validate a source specification.
    pub fn load_source(&self, name: &str) -> Result<SourceSpecification> {
        let path = self.path_for(name, SpecKind::Source);
        let mut spec: SourceSpecification = self.read_yaml(name, SpecKind::Source, &path)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load and validate a derived specification.
    pub fn load_derived(&self, name: &str) -> Result<DerivedSpecification> {
        let path = self.path_for(name, SpecKind::Derived);
        let spec: DerivedSpecification = self.read_yaml(name, SpecKind::Derived, &path)?;
        spec.validate()?;
        Ok(spec)
    }

    fn read_yaml<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        kind: SpecKind,
        path: &Path,
    ) -> Result<T> {
        if !path.exists() {
            return Err(Error::not_found(format!(
                "{kind} specification '{name}'"
            )));
        }
        let text = specflow_fs::read_to_string(path, MAX_SPEC_FILE_SIZE)?;
        serde_yaml::from_str(&text)
            .map_err(|e| Error::validation(format!("invalid {kind} specification '{name}': {e}")))
    }

    /// Validate and save a source specification. `overwrite=false` on an
    /// existing name is a conflict; a re-save supersedes, never merges.
    pub fn save_source(
        &self,
        spec: &mut SourceSpecification,
        overwrite: bool,
    ) -> Result<PathBuf> {
        spec.validate()?;
        let path = self.path_for(&spec.name, SpecKind::Source);
        self.check_overwrite(&path, &spec.name, SpecKind::Source, overwrite)?;
        self.write_yaml(&path, spec)?;
        debug!(name = %spec.name, path = %path.display(), "saved source specification");
        Ok(path)
    }

    /// Validate and save a derived specification.
    ///
    /// Beyond the overwrite check, `generated_at` must be monotonically
    /// non-decreasing across successive saves for the same name.
    pub fn save_derived(
        &self,
        spec: &DerivedSpecification,
        overwrite: bool,
    ) -> Result<PathBuf> {
        spec.validate()?;
        let path = self.path_for(&spec.name, SpecKind::Derived);
        self.check_overwrite(&path, &spec.name, SpecKind::Derived, overwrite)?;

        if path.exists() {
            if let Ok(prior) = self.load_derived(&spec.name) {
                if spec.generated_at < prior.generated_at {
                    return Err(Error::validation(format!(
                        "generated_at regresses for '{}': {} < {}",
                        spec.name, spec.generated_at, prior.generated_at
                    )));
                }
            }
        }

        self.write_yaml(&path, spec)?;
        debug!(name = %spec.name, path = %path.display(), "saved derived specification");
        Ok(path)
    }

    fn check_overwrite(
        &self,
        path: &Path,
        name: &str,
        kind: SpecKind,
        overwrite: bool,
    ) -> Result<()> {
        if path.exists() && !overwrite {
            return Err(Error::conflict(format!(
                "{kind} specification '{name}' already exists (pass overwrite to replace)"
            )));
        }
        Ok(())
    }

    fn write_yaml<T: Serialize>(&self, path: &Path, doc: &T) -> Result<()> {
        let yaml = serde_yaml::to_string(doc)
            .map_err(|e| Error::validation(format!("serialization failed: {e}")))?;
        specflow_fs::write_string_atomic(path, &yaml)
    }

    /// Delete a named document. Returns whether anything was removed.
    pub fn delete(&self, name: &str, kind: SpecKind) -> Result<bool> {
        let path = self.path_for(name, kind);
        let removed = specflow_fs::remove_file_if_exists(&path)?;
        if removed {
            debug!(name, kind = %kind, "deleted specification");
        }
        Ok(removed)
    }

    /// List documents of one kind as lightweight summaries, sorted by name.
    pub fn list(&self, kind: SpecKind) -> Result<Vec<SpecSummary>> {
        let mut summaries = Vec::new();

        for path in specflow_fs::list_files(&self.root)? {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(kind.file_suffix()) else {
                continue;
            };

            let modified = specflow_fs::modified_at(&path)
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            let summary = match self.load(name, kind) {
                Ok(Specification::Source(spec)) => SpecSummary {
                    name: spec.name,
                    kind,
                    version: Some(spec.version),
                    path,
                    modified,
                    entry_count: spec.requests.len(),
                    valid: true,
                },
                Ok(Specification::Derived(spec)) => SpecSummary {
                    name: spec.name,
                    kind,
                    version: Some(spec.version),
                    path,
                    modified,
                    entry_count: spec.artifacts.len(),
                    valid: true,
                },
                Err(_) => SpecSummary {
                    name: name.to_string(),
                    kind,
                    version: None,
                    path,
                    modified,
                    entry_count: 0,
                    valid: false,
                },
            };
            summaries.push(summary);
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use specflow_model::{ArtifactKind, ArtifactSpec, ContentBlock, GenerationRequest, OutputConfig, ProducerKind};
    use std::fs;
    use tempfile::tempdir;

    fn source(name: &str) -> SourceSpecification {
        SourceSpecification::new(
            name,
            ContentBlock::inline("The checkout flow starts at the cart page."),
            vec![GenerationRequest::new("flowchart").with_description("show order flow")],
        )
    }

    fn derived(name: &str) -> DerivedSpecification {
        DerivedSpecification {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            source_name: name.to_string(),
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
            contents: Vec::new(),
            outputs: OutputConfig::default(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        let mut spec = source("checkout-flow");
        store.save_source(&mut spec, false).unwrap();

        let loaded = store.load_source("checkout-flow").unwrap();
        assert_eq!(loaded, spec);

        // A second independent reader sees the same content.
        let again = store.load("checkout-flow", SpecKind::Source).unwrap();
        assert_eq!(again, Specification::Source(spec));
    }

    #[test]
    fn test_overwrite_requires_force() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        let mut spec = source("checkout-flow");
        store.save_source(&mut spec, false).unwrap();

        let err = store.save_source(&mut spec, false).unwrap_err();
        assert_eq!(err.kind(), "conflict");

        spec.version = "1.1.0".to_string();
        store.save_source(&mut spec, true).unwrap();
        assert_eq!(store.load_source("checkout-flow").unwrap().version, "1.1.0");
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();
        let err = store.load_source("ghost").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_invalid_yaml_is_validation_error() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("bad.source.yaml"), "name: [unclosed").unwrap();

        let err = store.load_source("bad").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_generated_at_monotonic() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        let newer = derived("checkout-flow");
        store.save_derived(&newer, false).unwrap();

        let mut older = newer.clone();
        older.generated_at = newer.generated_at - Duration::seconds(30);
        let err = store.save_derived(&older, true).unwrap_err();
        assert_eq!(err.kind(), "validation");

        // Equal or newer timestamps are accepted.
        store.save_derived(&newer, true).unwrap();
    }

    #[test]
    fn test_list_summaries() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        store.save_source(&mut source("beta"), false).unwrap();
        store.save_source(&mut source("alpha"), false).unwrap();
        store.save_derived(&derived("alpha"), false).unwrap();
        fs::write(dir.path().join("broken.source.yaml"), ": not yaml").unwrap();

        let sources = store.list(SpecKind::Source).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].name, "alpha");
        assert!(sources[0].valid);
        assert_eq!(sources[1].name, "beta");
        let broken = sources.iter().find(|s| s.name == "broken").unwrap();
        assert!(!broken.valid);

        let deriveds = store.list(SpecKind::Derived).unwrap();
        assert_eq!(deriveds.len(), 1);
        assert_eq!(deriveds[0].entry_count, 1);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        store.save_source(&mut source("checkout-flow"), false).unwrap();
        assert!(store.delete("checkout-flow", SpecKind::Source).unwrap());
        assert!(!store.delete("checkout-flow", SpecKind::Source).unwrap());
        assert_eq!(
            store.load_source("checkout-flow").unwrap_err().kind(),
            "not_found"
        );
    }

    #[test]
    fn test_invalid_document_rejected_on_save() {
        let dir = tempdir().unwrap();
        let store = SpecificationStore::new(dir.path()).unwrap();

        let mut spec = source("checkout-flow");
        spec.requests.clear();
        let err = store.save_source(&mut spec, false).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(!store.path_for("checkout-flow", SpecKind::Source).exists());
    }
}
