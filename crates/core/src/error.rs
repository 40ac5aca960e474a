//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is detected before any state is mutated, so a caller that
/// receives one of these can assume nothing changed. Delivery failures of
/// notifications and emails are not domain errors and never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input (non-positive quantity, unknown router type, non-positive price, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier did not resolve to a known record.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A transition was invoked without one of the fields its target status requires.
    #[error("missing required field '{field}' for transition to {status}")]
    MissingRequiredField { status: String, field: &'static str },

    /// The target status is not a legal successor of the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The acting identity is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Concurrent access failed (e.g. a poisoned store lock).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn missing_field(status: impl core::fmt::Display, field: &'static str) -> Self {
        Self::MissingRequiredField {
            status: status.to_string(),
            field,
        }
    }

    pub fn invalid_transition(
        from: impl core::fmt::Display,
        to: impl core::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = DomainError::not_found("requisition", "REQ-042");
        assert_eq!(err.to_string(), "requisition not found: REQ-042");

        let err = DomainError::missing_field("rejected", "rejection_reason");
        assert_eq!(
            err.to_string(),
            "missing required field 'rejection_reason' for transition to rejected"
        );

        let err = DomainError::invalid_transition("pending", "deployed");
        assert_eq!(err.to_string(), "invalid transition from pending to deployed");
    }

    #[test]
    fn is_not_found_only_matches_not_found() {
        assert!(DomainError::not_found("notification", "x").is_not_found());
        assert!(!DomainError::validation("x").is_not_found());
    }
}
