//! Machine-derived specification: the transformation worker's output and the
//! downstream producers' work orders.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use specflow_core::{Error, Result};

use crate::ids;

/// Closed enumeration of artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Box-and-arrow flow diagram.
    Flowchart,
    /// Message sequence diagram.
    Sequence,
    /// State machine diagram.
    State,
    /// Class diagram.
    Class,
    /// Entity-relationship diagram.
    Erd,
    /// Gantt chart.
    Gantt,
    /// System architecture diagram.
    Architecture,
    /// C4 context diagram.
    C4Context,
    /// C4 container diagram.
    C4Container,
    /// Mind map.
    Mindmap,
    /// Timeline.
    Timeline,
}

/// Producer/framework assigned to render an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProducerKind {
    /// Mermaid renderer.
    Mermaid,
    /// D2 renderer.
    D2,
    /// PlantUML renderer.
    Plantuml,
    /// Graphviz renderer.
    Graphviz,
    /// Let the transformation worker pick.
    Auto,
}

/// Kind of composite content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Multi-page documentation.
    Documentation,
    /// Slide deck.
    Presentation,
}

fn default_priority() -> u8 {
    5
}

/// One requested derived artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSpec {
    /// Unique id within the document; doubles as the status-record subject.
    pub id: String,
    /// Human title.
    pub title: String,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Assigned producer.
    pub producer: ProducerKind,
    /// Free-text instructions for the producer.
    pub instructions: String,
    /// Expected output path, relative to the configured artifacts directory.
    pub output_path: String,
    /// Ids of artifacts that must complete first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Advisory priority, 1 (highest) to 10.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

/// One requested composite document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContentSpec {
    /// Unique id within the document; doubles as the status-record subject.
    pub id: String,
    /// Output path, relative to the configured contents directory.
    pub output_path: String,
    /// Content kind.
    pub kind: ContentKind,
    /// Human title.
    pub title: String,
    /// Optional template id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Ordered section list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
    /// Ids of artifacts this document embeds; also its prerequisites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_refs: Vec<String>,
    /// Free-text generation instructions.
    pub instructions: String,
}

/// Output directory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving rendered artifacts.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
    /// Directory receiving composite documents.
    #[serde(default = "default_contents_dir")]
    pub contents_dir: String,
}

fn default_artifacts_dir() -> String {
    "artifacts".to_string()
}

fn default_contents_dir() -> String {
    "contents".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            contents_dir: default_contents_dir(),
        }
    }
}

/// Machine-produced specification derived from a source specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DerivedSpecification {
    /// Name, matching the source specification's store entry.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Back-reference to the source specification name.
    pub source_name: String,
    /// When this document was generated. Never in the future; monotonically
    /// non-decreasing across successive saves for the same name.
    pub generated_at: DateTime<Utc>,
    /// Ordered artifact work orders.
    pub artifacts: Vec<ArtifactSpec>,
    /// Ordered composite-document work orders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentSpec>,
    /// Output directories.
    #[serde(default)]
    pub outputs: OutputConfig,
    /// Free-text generation notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl DerivedSpecification {
    /// Validate field formats, referential integrity, and output-path
    /// uniqueness.
    pub fn validate(&self) -> Result<()> {
        ids::validate_name(&self.name)?;
        ids::validate_version(&self.version)?;
        ids::validate_name(&self.source_name)?;

        if self.generated_at > Utc::now() {
            return Err(Error::validation(
                "generated_at cannot be in the future",
            ));
        }
        if self.artifacts.is_empty() {
            return Err(Error::validation(
                "derived specification must contain at least one artifact",
            ));
        }

        let mut subject_ids = HashSet::new();
        for artifact in &self.artifacts {
            ids::validate_id(&artifact.id)?;
            ids::validate_path(&artifact.output_path)?;
            if artifact.title.trim().is_empty() {
                return Err(Error::validation(format!(
                    "artifact '{}' must have a title",
                    artifact.id
                )));
            }
            if !(1..=10).contains(&artifact.priority) {
                return Err(Error::validation(format!(
                    "artifact '{}' priority must be 1-10, got {}",
                    artifact.id, artifact.priority
                )));
            }
            if !subject_ids.insert(artifact.id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate artifact id: '{}'",
                    artifact.id
                )));
            }
        }

        let artifact_ids: HashSet<&str> =
            self.artifacts.iter().map(|a| a.id.as_str()).collect();

        for artifact in &self.artifacts {
            for dep in &artifact.depends_on {
                if dep == &artifact.id {
                    return Err(Error::validation(format!(
                        "artifact '{}' depends on itself",
                        artifact.id
                    )));
                }
                if !artifact_ids.contains(dep.as_str()) {
                    return Err(Error::validation(format!(
                        "artifact '{}' depends on unknown id '{dep}'",
                        artifact.id
                    )));
                }
            }
        }

        let mut output_paths = HashSet::new();
        for content in &self.contents {
            ids::validate_id(&content.id)?;
            ids::validate_path(&content.output_path)?;
            if !subject_ids.insert(content.id.as_str()) {
                return Err(Error::validation(format!(
                    "content id '{}' collides with another entry",
                    content.id
                )));
            }
            if !output_paths.insert(content.output_path.as_str()) {
                return Err(Error::validation(format!(
                    "two content entries target the same output path: '{}'",
                    content.output_path
                )));
            }
            if content.sections.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::validation(format!(
                    "content '{}' has an empty section name",
                    content.id
                )));
            }
            for dep in &content.artifact_refs {
                if !artifact_ids.contains(dep.as_str()) {
                    return Err(Error::validation(format!(
                        "content '{}' references unknown artifact '{dep}'",
                        content.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// All subjects this document defines, artifacts first, in declared
    /// order.
    pub fn subjects(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .map(|a| a.id.as_str())
            .chain(self.contents.iter().map(|c| c.id.as_str()))
            .collect()
    }

    /// Declared prerequisites for one subject, if it exists in the document.
    pub fn prerequisites(&self, subject: &str) -> Option<Vec<&str>> {
        if let Some(artifact) = self.artifacts.iter().find(|a| a.id == subject) {
            return Some(artifact.depends_on.iter().map(String::as_str).collect());
        }
        self.contents
            .iter()
            .find(|c| c.id == subject)
            .map(|c| c.artifact_refs.iter().map(String::as_str).collect())
    }
}
