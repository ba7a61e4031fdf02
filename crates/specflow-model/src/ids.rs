//! Identifier and version validation shared by both document kinds.

use specflow_core::{Error, Result};

/// Maximum length for names and entry ids.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum inline content size in bytes (1 MiB).
pub const MAX_CONTENT_LEN: usize = 1_048_576;

/// Validate a specification name: starts with a letter, then alphanumeric,
/// hyphen, or underscore.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "name must be 1-{MAX_NAME_LEN} characters: '{name}'"
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or(' ');
    if !first.is_ascii_alphabetic() {
        return Err(Error::validation(format!(
            "name must start with a letter: '{name}'"
        )));
    }
    if let Some(bad) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_') {
        return Err(Error::validation(format!(
            "name contains invalid character '{bad}': '{name}'"
        )));
    }
    Ok(())
}

/// Validate an entry id: alphanumeric, hyphen, or underscore throughout.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "id must be 1-{MAX_NAME_LEN} characters: '{id}'"
        )));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(Error::validation(format!(
            "id contains invalid character '{bad}': '{id}'"
        )));
    }
    Ok(())
}

/// Validate a semantic version string.
pub fn validate_version(version: &str) -> Result<()> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|e| Error::validation(format!("invalid version '{version}': {e}")))
}

/// Validate a relative output/input path: non-empty, no traversal.
pub fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::validation("path must not be empty"));
    }
    if path.len() > 500 {
        return Err(Error::validation(format!(
            "path too long ({} chars, max 500)",
            path.len()
        )));
    }
    if path.split(['/', '\\']).any(|part| part == "..") {
        return Err(Error::validation(format!(
            "path traversal not allowed: '{path}'"
        )));
    }
    Ok(())
}

/// Normalize a free-form request kind to lower snake case and validate it.
pub fn normalize_kind(kind: &str) -> Result<String> {
    let normalized = kind.trim().to_lowercase().replace([' ', '-'], "_");
    if normalized.is_empty() || normalized.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "request kind must be 1-{MAX_NAME_LEN} characters: '{kind}'"
        )));
    }
    let mut chars = normalized.chars();
    let first = chars.next().unwrap_or(' ');
    if !first.is_ascii_lowercase() {
        return Err(Error::validation(format!(
            "request kind must start with a letter: '{kind}'"
        )));
    }
    if chars.any(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_') {
        return Err(Error::validation(format!(
            "request kind must be alphanumeric with underscores: '{kind}'"
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("checkout-flow", true; "hyphenated")]
    #[test_case("Flow_2", true; "mixed case and underscore")]
    #[test_case("a", true; "single letter")]
    #[test_case("", false; "empty")]
    #[test_case("2flow", false; "leading digit")]
    #[test_case("-flow", false; "leading hyphen")]
    #[test_case("flow diagram", false; "embedded space")]
    fn test_validate_name(name: &str, ok: bool) {
        assert_eq!(validate_name(name).is_ok(), ok, "name: '{name}'");
    }

    #[test_case("1.0.0", true)]
    #[test_case("2.13.4", true)]
    #[test_case("1.0", false)]
    #[test_case("v1.0.0", false)]
    fn test_validate_version(version: &str, ok: bool) {
        assert_eq!(validate_version(version).is_ok(), ok);
    }

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("Sequence Diagram").unwrap(), "sequence_diagram");
        assert_eq!(normalize_kind("c4-context").unwrap(), "c4_context");
        assert!(normalize_kind("2nd").is_err());
        assert!(normalize_kind("").is_err());
    }

    #[test]
    fn test_validate_path_rejects_traversal() {
        assert!(validate_path("docs/assets/flow.svg").is_ok());
        assert!(validate_path("../escape.svg").is_err());
        assert!(validate_path("a/../b.svg").is_err());
        assert!(validate_path("").is_err());
    }

    #[test]
    fn test_validate_id_allows_leading_digit() {
        assert!(validate_id("01-flow").is_ok());
        assert!(validate_id("flow diagram").is_err());
    }
}
