//! User-authored source specification.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use specflow_core::{Error, Result};

use crate::derived::ProducerKind;
use crate::ids::{self, MAX_CONTENT_LEN};

/// Content carried by a source specification: inline text or a reference to
/// an external file, mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContentBlock {
    /// Inline content text (max 1 MiB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Path to an external content file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ContentBlock {
    /// Create an inline content block.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file: None,
        }
    }

    /// Create a file-reference content block.
    pub fn file_ref(path: impl Into<String>) -> Self {
        Self {
            text: None,
            file: Some(path.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        match (&self.text, &self.file) {
            (None, None) => Err(Error::validation(
                "content must provide either text or file",
            )),
            (Some(_), Some(_)) => Err(Error::validation(
                "content cannot provide both text and file",
            )),
            (Some(text), None) => {
                if text.trim().is_empty() {
                    return Err(Error::validation("inline content must not be empty"));
                }
                if text.len() > MAX_CONTENT_LEN {
                    return Err(Error::validation(format!(
                        "inline content too large: {} bytes (max {MAX_CONTENT_LEN})",
                        text.len()
                    )));
                }
                Ok(())
            }
            (None, Some(file)) => {
                ids::validate_path(file)?;
                if Path::new(file).extension().is_none() {
                    return Err(Error::validation(format!(
                        "content file must have an extension: '{file}'"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Resolve the content to non-empty text, reading the referenced file
    /// relative to `base_dir` when the block is a file reference.
    pub fn resolve(&self, base_dir: impl AsRef<Path>) -> Result<String> {
        self.validate()?;
        let text = match (&self.text, &self.file) {
            (Some(text), _) => text.clone(),
            (_, Some(file)) => {
                let path = Path::new(file);
                let full = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base_dir.as_ref().join(path)
                };
                specflow_fs::read_to_string(&full, MAX_CONTENT_LEN as u64)?
            }
            _ => unreachable!("validate guarantees one source"),
        };
        if text.trim().is_empty() {
            return Err(Error::validation("content resolved to empty text"));
        }
        Ok(text)
    }
}

/// One typed generation request in a source specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerationRequest {
    /// Request kind, lower snake case (e.g. `flowchart`, `sequence`).
    pub kind: String,
    /// Free-text description of what to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preferred producer for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<ProducerKind>,
}

impl GenerationRequest {
    /// Create a request of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: None,
            producer: None,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Optional generation preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    /// Default producer when a request does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<ProducerKind>,
    /// Visual style hint, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Theme hint, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// User-authored specification: the pipeline's input document.
///
/// Read-only to the coordination core; superseded, never merged, on re-save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SourceSpecification {
    /// Unique name within a store.
    pub name: String,
    /// Semantic version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Source content, inline or referenced.
    pub content: ContentBlock,
    /// What to generate. Must contain at least one request.
    pub requests: Vec<GenerationRequest>,
    /// Optional generation preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    /// Optional caller metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl SourceSpecification {
    /// Create a specification with one request and inline content.
    pub fn new(
        name: impl Into<String>,
        content: ContentBlock,
        requests: Vec<GenerationRequest>,
    ) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            content,
            requests,
            preferences: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Validate structural completeness and field formats, normalizing
    /// request kinds in place.
    pub fn validate(&mut self) -> Result<()> {
        ids::validate_name(&self.name)?;
        ids::validate_version(&self.version)?;
        self.content.validate()?;

        if self.requests.is_empty() {
            return Err(Error::validation(
                "specification must contain at least one generation request",
            ));
        }

        let mut seen = HashSet::new();
        for request in &mut self.requests {
            request.kind = ids::normalize_kind(&request.kind)?;
            let key = format!(
                "{}::{}",
                request.kind,
                request.description.as_deref().unwrap_or_default()
            );
            if !seen.insert(key) {
                return Err(Error::validation(format!(
                    "duplicate generation request: '{}'",
                    request.kind
                )));
            }
        }
        Ok(())
    }
}
