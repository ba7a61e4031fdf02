//! Specification data model: user-authored sources, machine-derived
//! documents, and their validation contracts.
//!
//! Documents are tagged variants rather than open maps: the kind, producer,
//! and status fields are schema-checked enumerations, and the JSON schema a
//! caller can fetch is derived from the very same types that drive
//! deserialization, so the advertised schema and the validation logic cannot
//! diverge.

pub mod derived;
pub mod ids;
pub mod schema;
pub mod source;

pub use derived::{ArtifactKind, ArtifactSpec, ContentKind, ContentSpec, DerivedSpecification, OutputConfig, ProducerKind};
pub use schema::SpecKind;
pub use source::{ContentBlock, GenerationRequest, Preferences, SourceSpecification};
