//! Error types for store operations.
//!
//! Missing-target updates and deletes are deliberately *not* errors — they
//! are no-ops that return empty results. Only structural problems surface
//! here: an entity type with no registered schema, input data without a
//! usable identity, or a commit/dispatch that names an unregistered
//! mutation or action.

use std::fmt;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No field mapping registered for the entity type
    SchemaMissing(String),
    /// Input data carried no usable `id` field
    IdentityMissing(String),
    /// Commit referenced an unregistered mutation name
    UnknownMutation(String),
    /// Dispatch referenced an unregistered action name
    UnknownAction(String),
    /// The named field is not a relationship on the entity
    UnknownRelation { entity: String, field: String },
    /// A known mutation or action was invoked with the wrong payload shape
    PayloadMismatch(String),
}

impl StoreError {
    pub(crate) fn unknown_relation(entity: &str, field: &str) -> Self {
        StoreError::UnknownRelation {
            entity: entity.to_owned(),
            field: field.to_owned(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SchemaMissing(entity) => {
                write!(f, "no schema registered for entity type: {entity}")
            }
            StoreError::IdentityMissing(entity) => {
                write!(f, "record for entity type {entity} has no usable id")
            }
            StoreError::UnknownMutation(name) => {
                write!(f, "unknown mutation: {name}")
            }
            StoreError::UnknownAction(name) => {
                write!(f, "unknown action: {name}")
            }
            StoreError::UnknownRelation { entity, field } => {
                write!(f, "{field} is not a relationship field on {entity}")
            }
            StoreError::PayloadMismatch(name) => {
                write!(f, "payload does not match the shape expected by {name}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
