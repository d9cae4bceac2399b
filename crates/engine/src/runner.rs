//! Job runner: the harness an external trigger calls for one job instance.

use std::sync::{mpsc, Arc};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::RunnerConfig;
use crate::context::{JobContext, JobState};
use crate::data_access::DataAccess;
use crate::error::JobError;
use crate::job::{Job, JobType};
use crate::logger::{CapturingLogger, JobLogger, TracingLogger};
use crate::parameters::JobParameterSet;
use crate::queue::{JobQueue, QueuedWork};
use crate::registry::{JobRegistry, RegistryError};
use crate::result::JobResult;

/// Everything the host gets back from one run.
#[derive(Debug, Clone, Serialize)]
pub struct JobRunReport {
    pub run_id: Uuid,
    pub job_type: JobType,
    pub state: JobState,
    pub result: JobResult,
    /// Follow-on work the job enqueued, for the host to dispatch.
    pub queued: Vec<QueuedWork>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobRunReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Shared, cloneable part of the runner (moved onto worker threads).
struct Invocation<D> {
    config: RunnerConfig,
    data_access: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<D> Clone for Invocation<D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            data_access: self.data_access.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<D: DataAccess> Invocation<D> {
    fn run<J: Job<D>>(&self, mut job: J, parameters: JobParameterSet, run_id: Uuid) -> JobRunReport {
        let job_type = job.job_type();
        let started_at = self.clock.now();

        let span = tracing::info_span!(
            "job_run",
            runner = %self.config.name,
            job_type = %job_type,
            run_id = %run_id
        );
        let _entered = span.enter();

        let tracing_logger: Arc<dyn JobLogger> = Arc::new(TracingLogger::new(job_type, run_id));
        let capture = Arc::new(CapturingLogger::forwarding(tracing_logger.clone()));
        let logger: Arc<dyn JobLogger> = if self.config.capture_output {
            capture.clone()
        } else {
            tracing_logger
        };

        let queue = JobQueue::new();
        let specs = job.parameters();
        for name in parameters.unrecognised(specs) {
            logger.warn(&format!("ignoring unrecognised parameter `{name}`"));
        }

        let mut state = JobState::Created;
        let outcome = match parameters.check_required(specs) {
            Err(e) => Err(JobError::from(e)),
            Ok(()) => {
                job.initialise(JobContext {
                    queue: queue.clone(),
                    data_access: self.data_access.clone(),
                    logger: logger.clone(),
                    parameters: Arc::new(parameters),
                    clock: self.clock.clone(),
                });
                state = JobState::Initialised;
                debug!(?state, "job initialised");

                state = JobState::Running;
                job.execute()
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, kind = e.kind(), ?state, "job failed");
                JobResult::failure(e.to_string())
            }
        };

        state = if result.is_success() {
            JobState::Succeeded
        } else {
            JobState::Failed
        };

        let result = if self.config.capture_output {
            result.with_trail(&capture.render())
        } else {
            result
        };

        let queued = queue.drain();
        info!(status = ?result.status(), queued = queued.len(), "job finished");

        JobRunReport {
            run_id,
            job_type,
            state,
            result,
            queued,
            started_at,
            finished_at: self.clock.now(),
        }
    }

    fn synthesized_failure(&self, job_type: JobType, run_id: Uuid, output: String) -> JobRunReport {
        let now = self.clock.now();
        JobRunReport {
            run_id,
            job_type,
            state: JobState::Failed,
            result: JobResult::failure(output),
            queued: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }
}

/// Runs jobs synchronously against one data-access seam.
///
/// The runner never retries: a failed run is reported and the host decides
/// what happens next. Two runs of the same job type against overlapping data
/// are not coordinated; callers that need mutual exclusion must serialize
/// invocations themselves.
pub struct JobRunner<D: DataAccess> {
    invocation: Invocation<D>,
    registry: JobRegistry<D>,
}

impl<D: DataAccess + 'static> JobRunner<D> {
    pub fn new(config: RunnerConfig, data_access: Arc<D>) -> Self {
        Self {
            invocation: Invocation {
                config,
                data_access,
                clock: Arc::new(SystemClock),
            },
            registry: JobRegistry::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.invocation.clock = clock;
        self
    }

    pub fn with_registry(mut self, registry: JobRegistry<D>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.invocation.config
    }

    pub fn registry(&self) -> &JobRegistry<D> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut JobRegistry<D> {
        &mut self.registry
    }

    /// Initialise and execute `job` on the calling thread.
    ///
    /// # Panics
    ///
    /// Programming errors inside the job (e.g. executing an uninitialised
    /// job from its own code) propagate as panics.
    pub fn run<J: Job<D>>(&self, job: J, parameters: JobParameterSet) -> JobRunReport {
        self.invocation.run(job, parameters, Uuid::now_v7())
    }

    /// Construct the job registered for `job_type` and run it.
    pub fn run_type(
        &self,
        job_type: &str,
        parameters: JobParameterSet,
    ) -> Result<JobRunReport, RegistryError> {
        let job = self.registry.create(job_type)?;
        Ok(self.run(job, parameters))
    }

    /// Like [`run`](Self::run), bounded by the configured timeout.
    ///
    /// The job executes on a dedicated thread. When the timeout elapses the
    /// run is reported as failed; the worker thread is not cancelled and is
    /// left to finish on its own. Without a configured timeout this is the
    /// same as `run`.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the worker thread on the calling thread.
    pub fn run_with_timeout<J>(&self, job: J, parameters: JobParameterSet) -> JobRunReport
    where
        J: Job<D> + 'static,
    {
        let Some(timeout) = self.invocation.config.timeout else {
            return self.run(job, parameters);
        };

        let run_id = Uuid::now_v7();
        let job_type = job.job_type();
        let invocation = self.invocation.clone();
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.invocation.config.name, job_type))
            .spawn(move || {
                let report = invocation.run(job, parameters, run_id);
                let _ = tx.send(report);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!(job_type = %job_type, error = %e, "failed to spawn job thread");
                return self.invocation.synthesized_failure(
                    job_type,
                    run_id,
                    format!("failed to start job thread: {e}"),
                );
            }
        };

        match rx.recv_timeout(timeout) {
            Ok(report) => {
                let _ = handle.join();
                report
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(job_type = %job_type, run_id = %run_id, ?timeout, "job run timed out");
                self.invocation.synthesized_failure(
                    job_type,
                    run_id,
                    format!("job {job_type} did not finish within {}s", timeout.as_secs_f64()),
                )
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
                Err(panic) => std::panic::resume_unwind(panic),
                Ok(()) => self.invocation.synthesized_failure(
                    job_type,
                    run_id,
                    "job thread exited without a result".to_string(),
                ),
            },
        }
    }
}

impl<D: DataAccess> core::fmt::Debug for JobRunner<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobRunner")
            .field("config", &self.invocation.config)
            .field("registry", &self.registry)
            .finish()
    }
}
