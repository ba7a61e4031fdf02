//! Document kinds and queryable JSON schemas.

use schemars::schema_for;
use serde::{Deserialize, Serialize};
use specflow_core::{Error, Result};

use crate::{DerivedSpecification, SourceSpecification};

/// The two specification document kinds a store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    /// User-authored input.
    Source,
    /// Machine-derived output.
    Derived,
}

impl SpecKind {
    /// File suffix for this kind under the spec root.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Source => ".source.yaml",
            Self::Derived => ".derived.yaml",
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Derived => "derived",
        }
    }

    /// JSON schema for this kind, derived from the serde types themselves so
    /// the advertised schema and the validation logic cannot diverge.
    pub fn schema(&self) -> Result<serde_json::Value> {
        let schema = match self {
            Self::Source => schema_for!(SourceSpecification),
            Self::Derived => schema_for!(DerivedSpecification),
        };
        serde_json::to_value(schema)
            .map_err(|e| Error::validation(format!("schema serialization failed: {e}")))
    }
}

impl std::fmt::Display for SpecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "source" => Ok(Self::Source),
            "derived" => Ok(Self::Derived),
            other => Err(Error::validation(format!(
                "unknown specification kind '{other}' (expected source or derived)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_suffixes() {
        assert_eq!(SpecKind::Source.file_suffix(), ".source.yaml");
        assert_eq!(SpecKind::Derived.file_suffix(), ".derived.yaml");
    }

    #[test]
    fn test_parse() {
        assert_eq!("source".parse::<SpecKind>().unwrap(), SpecKind::Source);
        assert_eq!("derived".parse::<SpecKind>().unwrap(), SpecKind::Derived);
        assert!("recipe".parse::<SpecKind>().is_err());
    }

    #[test]
    fn test_schema_mentions_required_fields() {
        let schema = SpecKind::Source.schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("requests"));
        assert!(text.contains("content"));

        let schema = SpecKind::Derived.schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("artifacts"));
        assert!(text.contains("generated_at"));
    }
}
