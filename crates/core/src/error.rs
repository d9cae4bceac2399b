//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, unresolved references). Persistence concerns belong to the
/// data-access seam.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A record referenced another record that could not be resolved.
    #[error("{kind} {id} not found")]
    UnresolvedReference { kind: &'static str, id: i64 },

    /// The same child was attached to an aggregate twice.
    #[error("duplicate {kind} for {parent} {parent_id}: {child_id}")]
    Duplicate {
        kind: &'static str,
        parent: &'static str,
        parent_id: i64,
        child_id: i64,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn unresolved(kind: &'static str, id: impl Into<i64>) -> Self {
        Self::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_names_kind_and_id() {
        let err = DomainError::unresolved("employee", 42);
        assert_eq!(err.to_string(), "employee 42 not found");
    }

    #[test]
    fn duplicate_message_names_parent() {
        let err = DomainError::Duplicate {
            kind: "notification",
            parent: "message",
            parent_id: 1,
            child_id: 5,
        };
        assert_eq!(err.to_string(), "duplicate notification for message 1: 5");
    }
}
