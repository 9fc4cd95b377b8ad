//! Structured, accumulated error values.
//!
//! Linking reports every problem it finds in one pass: errors collect into a
//! `Vec` and the "fail if any error exists" decision stays with the caller.
//! Every variant carries the [`Location`] of the offending declaration.

use lattice_core::Location;
use thiserror::Error;

/// A problem found while building the linked schema graph.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("unresolved reference to {reference} in {context} ({location})")]
    UnresolvedReference {
        reference: String,
        context: String,
        location: Location,
    },

    #[error("ambiguous reference to {reference} in {context}, candidates: {}", candidates.join(", "))]
    AmbiguousReference {
        reference: String,
        context: String,
        candidates: Vec<String>,
        location: Location,
    },

    #[error("{name} is declared more than once ({location})")]
    DuplicateType { name: String, location: Location },

    #[error("tag {tag} is used more than once in {type_name} ({location})")]
    DuplicateTag {
        tag: i32,
        type_name: String,
        location: Location,
    },

    #[error("field {name} is declared more than once in {type_name} ({location})")]
    DuplicateFieldName {
        name: String,
        type_name: String,
        location: Location,
    },

    #[error("tag {tag} of field {field} is out of range ({location})")]
    TagOutOfRange {
        tag: i32,
        field: String,
        location: Location,
    },

    #[error("tag {tag} of field {field} is reserved in {type_name} ({location})")]
    ReservedTag {
        tag: i32,
        field: String,
        type_name: String,
        location: Location,
    },

    #[error("field name {field} is reserved in {type_name} ({location})")]
    ReservedName {
        field: String,
        type_name: String,
        location: Location,
    },

    #[error(
        "extension tag {tag} of field {field} is outside the extension ranges of {target} \
         ({location})"
    )]
    ExtensionOutOfRange {
        tag: i32,
        field: String,
        target: String,
        location: Location,
    },

    #[error(
        "constant {constant} shares value {value} in {enum_name}; set allow_alias to permit \
         aliases ({location})"
    )]
    EnumValueCollision {
        constant: String,
        value: i32,
        enum_name: String,
        location: Location,
    },

    #[error("expected a message for {context} but {name} is not one ({location})")]
    ExpectedMessage {
        name: String,
        context: String,
        location: Location,
    },

    #[error("map key of field {field} must be an integral, string, or bool type ({location})")]
    InvalidMapKey { field: String, location: Location },

    #[error("unable to find {path} imported by {importer} ({location})")]
    ImportNotFound {
        path: String,
        importer: String,
        location: Location,
    },

    #[error("packages form a dependency cycle: {cycle} ({location})")]
    PackageCycle { cycle: String, location: Location },

    #[error("{message} ({location})")]
    Source { message: String, location: Location },
}

impl LinkError {
    /// The location of the offending declaration.
    pub fn location(&self) -> &Location {
        match self {
            LinkError::UnresolvedReference { location, .. }
            | LinkError::AmbiguousReference { location, .. }
            | LinkError::DuplicateType { location, .. }
            | LinkError::DuplicateTag { location, .. }
            | LinkError::DuplicateFieldName { location, .. }
            | LinkError::TagOutOfRange { location, .. }
            | LinkError::ReservedTag { location, .. }
            | LinkError::ReservedName { location, .. }
            | LinkError::ExtensionOutOfRange { location, .. }
            | LinkError::EnumValueCollision { location, .. }
            | LinkError::ExpectedMessage { location, .. }
            | LinkError::InvalidMapKey { location, .. }
            | LinkError::ImportNotFound { location, .. }
            | LinkError::PackageCycle { location, .. }
            | LinkError::Source { location, .. } => location,
        }
    }
}

/// A problem found while resolving a profile. These fail fast at
/// profile-load time; profile resolution is a separate on-demand step.
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("{profile_path} needs to import {file_path} ({location})")]
    MissingImport {
        profile_path: String,
        file_path: String,
        location: Location,
    },

    #[error("malformed directive for {type_name}: {reason} ({location})")]
    MalformedDirective {
        type_name: String,
        reason: String,
        location: Location,
    },

    #[error("failed to load {path}: {reason} ({location})")]
    Unreadable {
        path: String,
        reason: String,
        location: Location,
    },
}

/// A failure reported by the element source collaborator while reading or
/// parsing one file.
#[derive(Debug, Clone, Error)]
#[error("failed to read {path}: {reason}")]
pub struct SourceError {
    pub path: String,
    pub reason: String,
}
