//! `crewjobs-core`: shared identity and error primitives.
//!
//! This crate contains **pure domain** primitives (no persistence, no job engine).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::RecordId;
