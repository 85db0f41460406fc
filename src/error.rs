//! Error types for declaration, resolution and validation

use thiserror::Error;

/// Errors raised by the container and its collaborators.
///
/// Every variant is returned to the immediate caller. Nothing in this crate
/// logs an error and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A declaration was rejected before it reached the container
    #[error("Invalid declaration of `{field}` on {type_name}: {reason}")]
    InvalidDeclaration {
        type_name: &'static str,
        field: String,
        reason: String,
    },

    /// The container is locked and refuses new declarations
    #[error("Container is locked - cannot declare new injections")]
    Locked,

    /// The constructor of a type failed
    #[error("Failed to create {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// A type was reached again while it was still being wired
    #[error("Circular dependency detected while resolving {type_name}: {path}")]
    CircularDependency {
        type_name: &'static str,
        path: String,
    },

    /// A guarded value failed one of its field rules
    #[error("Validation failed for {type_name}.{field}")]
    ValidationFailed {
        type_name: &'static str,
        field: &'static str,
    },

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a CreationFailed error for `T`
    #[inline]
    pub fn creation_failed<T: 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a CircularDependency error for `T`
    #[inline]
    pub fn circular<T: 'static>(path: impl Into<String>) -> Self {
        Self::CircularDependency {
            type_name: std::any::type_name::<T>(),
            path: path.into(),
        }
    }

    /// Create an InvalidDeclaration error for a field of `T`
    #[inline]
    pub fn invalid_declaration<T: 'static>(
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDeclaration {
            type_name: std::any::type_name::<T>(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a ValidationFailed error for a field of `T`
    #[inline]
    pub fn validation_failed<T: 'static>(field: &'static str) -> Self {
        Self::ValidationFailed {
            type_name: std::any::type_name::<T>(),
            field,
        }
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, DiError>;
