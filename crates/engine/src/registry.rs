//! Job type → constructor mapping used by hosts that trigger jobs by name.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::data_access::DataAccess;
use crate::job::{Job, JobType};

/// Constructor for a fresh, uninitialised job instance.
pub type JobFactory<D> = Box<dyn Fn() -> Box<dyn Job<D>> + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no job registered for job_type={0}")]
    UnknownJobType(String),

    #[error("duplicate job registration for job_type={0}")]
    DuplicateJobType(JobType),
}

pub struct JobRegistry<D> {
    factories: BTreeMap<JobType, JobFactory<D>>,
}

impl<D: DataAccess + 'static> JobRegistry<D> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a job constructor under the job type its instances report.
    pub fn register<F, J>(&mut self, factory: F) -> Result<JobType, RegistryError>
    where
        F: Fn() -> J + Send + Sync + 'static,
        J: Job<D> + 'static,
    {
        let job_type = factory().job_type();
        if self.factories.contains_key(&job_type) {
            return Err(RegistryError::DuplicateJobType(job_type));
        }
        self.factories
            .insert(job_type, Box::new(move || Box::new(factory()) as Box<dyn Job<D>>));
        Ok(job_type)
    }

    /// Build a fresh instance for `job_type`.
    pub fn create(&self, job_type: &str) -> Result<Box<dyn Job<D>>, RegistryError> {
        self.factories
            .iter()
            .find(|(registered, _)| registered.as_str() == job_type)
            .map(|(_, factory)| factory())
            .ok_or_else(|| RegistryError::UnknownJobType(job_type.to_string()))
    }

    pub fn job_types(&self) -> impl Iterator<Item = JobType> + '_ {
        self.factories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<D: DataAccess + 'static> Default for JobRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> core::fmt::Debug for JobRegistry<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
