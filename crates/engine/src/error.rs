//! Job failure taxonomy.
//!
//! Programming errors (executing before initialising) are not represented
//! here: they panic, see [`crate::ContextSlot`].

use thiserror::Error;

use crewjobs_core::DomainError;

use crate::data_access::PersistenceError;
use crate::parameters::ParameterError;

#[derive(Debug, Error)]
pub enum JobError {
    /// Malformed or missing parameter; raised before persistence is touched.
    #[error("parameter binding failed: {0}")]
    ParameterBinding(#[from] ParameterError),

    /// A seam call failed. Never retried inside the job.
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Data read through the seam broke a domain rule.
    #[error("domain invariant violated: {0}")]
    DomainInvariant(#[from] DomainError),
}

impl JobError {
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::ParameterBinding(_) => "parameter_binding",
            JobError::Persistence(_) => "persistence",
            JobError::DomainInvariant(_) => "domain_invariant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_cause() {
        let err: JobError = ParameterError::Missing {
            name: "X".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "parameter_binding");
        assert_eq!(
            err.to_string(),
            "parameter binding failed: parameter `X` is required but was not supplied"
        );

        let err: JobError = PersistenceError::Unavailable("db down".to_string()).into();
        assert_eq!(err.to_string(), "persistence failed: store unavailable: db down");

        let err: JobError = DomainError::unresolved("employee", 9).into();
        assert_eq!(err.kind(), "domain_invariant");
    }
}
