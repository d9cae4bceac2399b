//! `crewjobs-engine`
//!
//! **Responsibility:** the batch job contract and the harness that runs it.
//!
//! - Jobs depend on persistence only through [`DataAccess`].
//! - Jobs receive their dependencies once, through [`Job::initialise`].
//! - Every run ends in a [`JobResult`]; the runner never retries.

pub mod clock;
pub mod config;
pub mod context;
pub mod data_access;
pub mod error;
pub mod job;
pub mod logger;
pub mod parameters;
pub mod queue;
pub mod registry;
pub mod result;
pub mod runner;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, RunnerConfig};
pub use context::{ContextSlot, JobContext, JobState};
pub use data_access::{DataAccess, Operation, PersistenceError, PersistenceResult, Record};
pub use error::JobError;
pub use job::{Job, JobType};
pub use logger::{CapturingLogger, JobLogger, LogLevel, LogLine, NullLogger, TracingLogger};
pub use parameters::{JobParameter, JobParameterSet, ParameterError, ParameterSpec};
pub use queue::{JobQueue, QueuedWork};
pub use registry::{JobRegistry, RegistryError};
pub use result::{JobResult, RunStatus};
pub use runner::{JobRunReport, JobRunner};
