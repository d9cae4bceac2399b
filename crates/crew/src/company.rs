use serde::{Deserialize, Serialize};

use crewjobs_core::RecordId;
use crewjobs_engine::{JobParameter, JobParameterSet, ParameterError};

/// Company-wide setting, used as the fallback for job parameters of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyParameter {
    pub id: Option<RecordId>,
    pub name: String,
    pub value: String,
}

impl CompanyParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: value.into(),
        }
    }

    /// View a list of company parameters as a job parameter set.
    pub fn to_parameter_set(parameters: &[CompanyParameter]) -> Result<JobParameterSet, ParameterError> {
        JobParameterSet::try_from_parameters(
            parameters
                .iter()
                .map(|p| JobParameter::new(p.name.clone(), p.value.clone())),
        )
    }
}

impl_record!(CompanyParameter, "company_parameter", |p| Some(p.name.clone()));
