// Copyright 2025 Cowboy AI, LLC.

//! Error types for domain operations

use crate::persistence::RepositoryError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldViolation {
    /// Field path, e.g. `relativeWeeks[2]`
    pub field: String,
    /// Human readable message
    pub message: String,
}

impl FieldViolation {
    /// Create a new violation
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found by one validation pass
///
/// Validators collect every problem instead of stopping at the first, so the
/// caller can report them together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    /// Empty violation list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    /// Append violations collected elsewhere
    pub fn extend(&mut self, other: impl IntoIterator<Item = FieldViolation>) {
        self.violations.extend(other);
    }

    /// Whether no violation was recorded
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// The recorded violations, in the order they were found
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Whether some violation targets `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// `Ok(())` when empty, otherwise a [`DomainError::Validation`]
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl From<Vec<FieldViolation>> for ValidationErrors {
    fn from(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Errors that can occur in domain operations
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// One or more field violations
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Operation not allowed in the entity's current status
    #[error("{entity} cannot {action}: requires status {required}, current status is {actual}")]
    InvalidState {
        /// Kind of entity, e.g. `plan`
        entity: &'static str,
        /// Attempted operation
        action: &'static str,
        /// Status (or statuses) the operation requires
        required: String,
        /// Status the entity was in
        actual: String,
    },

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    EntityNotFound {
        /// Type of entity that wasn't found
        entity_type: String,
        /// ID that was searched for
        id: String,
    },

    /// Already exists error (generic)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Concurrency conflict
    #[error("Concurrency conflict: expected version {expected}, but found {actual}")]
    ConcurrencyConflict {
        /// Expected version
        expected: u64,
        /// Actual version
        actual: u64,
    },

    /// Infrastructure failure from a repository
    #[error("Persistence error: {0}")]
    Persistence(RepositoryError),

    /// External service error
    #[error("External service error: {service} - {message}")]
    ExternalService {
        /// Name of the external service
        service: String,
        /// Error message from the service
        message: String,
    },
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { expected, actual } => {
                DomainError::ConcurrencyConflict { expected, actual }
            }
            other => DomainError::Persistence(other),
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors)
    }
}

impl DomainError {
    /// Validation error with a single violation
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(ValidationErrors::from(vec![FieldViolation::new(
            field, message,
        )]))
    }

    /// Create an entity not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        DomainError::EntityNotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Create an external service error
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }

    /// Check if this is a state-precondition error
    pub fn is_state_error(&self) -> bool {
        matches!(self, DomainError::InvalidState { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::EntityNotFound { .. }
                | DomainError::Persistence(RepositoryError::NotFound(_))
        )
    }

    /// Check if this is a concurrency error
    pub fn is_concurrency_error(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict { .. })
    }

    /// Violations carried by a validation error
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            DomainError::Validation(errors) => errors.violations(),
            _ => &[],
        }
    }
}
