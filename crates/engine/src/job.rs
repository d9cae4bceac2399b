use serde::Serialize;

use crate::context::JobContext;
use crate::data_access::DataAccess;
use crate::error::JobError;
use crate::parameters::ParameterSpec;
use crate::result::JobResult;

/// Fixed identifier a host uses to route/trigger a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JobType(&'static str);

impl JobType {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0)
    }
}

/// One unit of batch work.
///
/// Lifecycle per instance: constructed → [`initialise`](Job::initialise)d
/// exactly once → [`execute`](Job::execute)d exactly once → dropped.
///
/// `execute` must be idempotent at the persisted-state level: re-running with
/// unchanged input data leaves the same end state, because hosts may re-run a
/// job after a transient failure.
pub trait Job<D: DataAccess>: Send {
    fn job_type(&self) -> JobType;

    /// Parameters this job recognises.
    fn parameters(&self) -> &'static [ParameterSpec] {
        &[]
    }

    /// Inject the run's dependencies.
    fn initialise(&mut self, context: JobContext<D>);

    /// Run the business logic.
    ///
    /// # Panics
    ///
    /// Implementations panic when called before [`initialise`](Job::initialise).
    fn execute(&mut self) -> Result<JobResult, JobError>;
}

impl<D, J> Job<D> for Box<J>
where
    D: DataAccess,
    J: Job<D> + ?Sized,
{
    fn job_type(&self) -> JobType {
        (**self).job_type()
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        (**self).parameters()
    }

    fn initialise(&mut self, context: JobContext<D>) {
        (**self).initialise(context)
    }

    fn execute(&mut self) -> Result<JobResult, JobError> {
        (**self).execute()
    }
}
