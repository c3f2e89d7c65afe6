//! AppModel - configuration-model builder and validator
//!
//! AppModel turns raw, pre-parsed configuration documents into a single tree of
//! typed components, resolves `${key}` placeholders through a layered property
//! chain and enforces the structural rules of the configuration language before
//! the model is handed to an object-assembly stage.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod properties;
pub mod services;

pub use models::*;
pub use properties::{ConfigurationProperties, PropertyError, PropertyResolver};
pub use services::{ApplicationModel, ApplicationModelBuilder};

use std::fmt;

/// Result type alias for model construction
pub type Result<T> = std::result::Result<T, ModelError>;

/// Coarse classification of a [`ModelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedReference,
    DuplicateDeclaration,
    StructuralViolation,
    UnresolvedProperty,
    TypeResolutionFailure,
    ProviderFailure,
    Expansion,
}

/// Error types raised while building or validating an application model
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Malformed reference: {message}{}", Located(.location))]
    MalformedReference {
        target: String,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("Duplicate declaration: {message}{}", Located(.location))]
    DuplicateDeclaration {
        name: String,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("Structural violation: {message}{}", Located(.location))]
    StructuralViolation {
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("Unresolved property: {cause}{}", Located(.location))]
    UnresolvedProperty {
        #[source]
        cause: PropertyError,
        location: Option<SourceLocation>,
    },

    #[error("Could not resolve class '{class_name}' for component {component}{}", Located(.location))]
    TypeResolutionFailure {
        class_name: String,
        component: ComponentIdentifier,
        location: Option<SourceLocation>,
    },

    #[error("Property provider failure for {component}: {message}")]
    ProviderFailure {
        component: ComponentIdentifier,
        message: String,
    },

    #[error("Module expansion failed: {0}")]
    Expansion(String),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::MalformedReference { .. } => ErrorKind::MalformedReference,
            ModelError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            ModelError::StructuralViolation { .. } => ErrorKind::StructuralViolation,
            ModelError::UnresolvedProperty { .. } => ErrorKind::UnresolvedProperty,
            ModelError::TypeResolutionFailure { .. } => ErrorKind::TypeResolutionFailure,
            ModelError::ProviderFailure { .. } => ErrorKind::ProviderFailure,
            ModelError::Expansion(_) => ErrorKind::Expansion,
        }
    }

    pub(crate) fn structural(message: impl Into<String>, location: Option<&SourceLocation>) -> Self {
        ModelError::StructuralViolation {
            message: message.into(),
            location: location.cloned(),
        }
    }

    pub(crate) fn unresolved(cause: PropertyError, location: Option<&SourceLocation>) -> Self {
        ModelError::UnresolvedProperty {
            cause,
            location: location.cloned(),
        }
    }
}

/// Renders ` at file:line` when a location is known
struct Located<'a>(&'a Option<SourceLocation>);

impl fmt::Display for Located<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(location) => write!(f, " at {}", location),
            None => Ok(()),
        }
    }
}
