//! Per-run dependencies and the job lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::data_access::DataAccess;
use crate::logger::{JobLogger, NullLogger};
use crate::parameters::JobParameterSet;
use crate::queue::JobQueue;

/// Lifecycle of one job instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Initialised,
    Running,
    Succeeded,
    Failed,
}

/// Everything a job may use during one run.
///
/// The job holds shared handles only; the seam, queue and logger outlive the
/// job and are never retained past the run by well-behaved jobs.
pub struct JobContext<D> {
    pub queue: JobQueue,
    pub data_access: Arc<D>,
    pub logger: Arc<dyn JobLogger>,
    pub parameters: Arc<JobParameterSet>,
    pub clock: Arc<dyn Clock>,
}

impl<D: DataAccess> JobContext<D> {
    /// Context with a fresh queue, no parameters, a null logger and the wall clock.
    pub fn new(data_access: Arc<D>) -> Self {
        Self {
            queue: JobQueue::new(),
            data_access,
            logger: Arc::new(NullLogger),
            parameters: Arc::new(JobParameterSet::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_queue(mut self, queue: JobQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn JobLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_parameters(mut self, parameters: JobParameterSet) -> Self {
        self.parameters = Arc::new(parameters);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl<D> Clone for JobContext<D> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            data_access: self.data_access.clone(),
            logger: self.logger.clone(),
            parameters: self.parameters.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Holder for a job's injected context.
///
/// Misuse of the lifecycle is a programming error, not a job failure, so it
/// panics instead of producing a `JobResult`.
pub struct ContextSlot<D> {
    context: Option<JobContext<D>>,
}

impl<D> ContextSlot<D> {
    pub const fn empty() -> Self {
        Self { context: None }
    }

    /// # Panics
    ///
    /// When the slot was already filled.
    #[track_caller]
    pub fn fill(&mut self, context: JobContext<D>) {
        if self.context.is_some() {
            panic!("job initialised more than once");
        }
        self.context = Some(context);
    }

    /// # Panics
    ///
    /// When the job has not been initialised.
    #[track_caller]
    pub fn get(&self) -> &JobContext<D> {
        match &self.context {
            Some(context) => context,
            None => panic!("job executed before initialise"),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.context.is_some()
    }
}

impl<D> Default for ContextSlot<D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<D> core::fmt::Debug for ContextSlot<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextSlot")
            .field("initialised", &self.is_filled())
            .finish()
    }
}
