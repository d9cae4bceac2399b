//! Job parameters: named string values supplied at run time.
//!
//! Parameters are string-typed at the boundary (`{ "Name": .., "Value": .. }`);
//! each job parses the values it recognises into the types it needs.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound accepted by [`JobParameterSet::hours_or`] (one year).
pub const MAX_HOURS: i64 = 24 * 366;

/// A single named parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobParameter {
    name: String,
    value: String,
}

impl JobParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A parameter a job recognises.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

impl ParameterSpec {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: false,
            description,
        }
    }
}

/// Parameter binding failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("parameter `{name}` is required but was not supplied")]
    Missing { name: String },

    #[error("parameter `{name}` was supplied more than once")]
    Duplicate { name: String },

    #[error("parameter `{name}` has malformed value `{value}`: {reason}")]
    Malformed {
        name: String,
        value: String,
        reason: String,
    },

    #[error("parameter `{name}` value `{value}` is out of range: {reason}")]
    OutOfRange {
        name: String,
        value: String,
        reason: String,
    },
}

/// Immutable name → parameter mapping handed to a job at initialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParameterSet {
    entries: BTreeMap<String, JobParameter>,
}

impl JobParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, rejecting repeated names.
    pub fn try_from_parameters<I>(parameters: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = JobParameter>,
    {
        let mut entries = BTreeMap::new();
        for parameter in parameters {
            if entries.contains_key(parameter.name()) {
                return Err(ParameterError::Duplicate {
                    name: parameter.name,
                });
            }
            entries.insert(parameter.name.clone(), parameter);
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::try_from_parameters(pairs.into_iter().map(|(k, v)| JobParameter::new(k, v)))
    }

    pub fn get(&self, name: &str) -> Option<&JobParameter> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(JobParameter::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobParameter> {
        self.entries.values()
    }

    /// A new set where entries of `self` win over entries of `fallback`.
    pub fn or_fallback(&self, fallback: &JobParameterSet) -> JobParameterSet {
        let mut entries = fallback.entries.clone();
        entries.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        JobParameterSet { entries }
    }

    /// Parse a parameter if present.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, ParameterError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        let Some(raw) = self.value(name) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ParameterError::Malformed {
                name: name.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn require<T>(&self, name: &str) -> Result<T, ParameterError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        self.parse(name)?.ok_or_else(|| ParameterError::Missing {
            name: name.to_string(),
        })
    }

    /// Whole, non-negative hours, falling back to `default_hours` when absent.
    pub fn hours_or(&self, name: &str, default_hours: i64) -> Result<chrono::Duration, ParameterError> {
        let hours = self.parse::<i64>(name)?.unwrap_or(default_hours);
        if !(0..=MAX_HOURS).contains(&hours) {
            return Err(ParameterError::OutOfRange {
                name: name.to_string(),
                value: hours.to_string(),
                reason: format!("expected whole hours between 0 and {MAX_HOURS}"),
            });
        }
        Ok(chrono::Duration::hours(hours))
    }

    /// First required parameter in `specs` that is absent.
    pub fn check_required(&self, specs: &[ParameterSpec]) -> Result<(), ParameterError> {
        match specs.iter().find(|s| s.required && !self.contains(s.name)) {
            Some(spec) => Err(ParameterError::Missing {
                name: spec.name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Supplied names that no spec in `specs` recognises.
    pub fn unrecognised<'a>(&'a self, specs: &[ParameterSpec]) -> Vec<&'a str> {
        self.entries
            .keys()
            .filter(|name| !specs.iter().any(|s| s.name == name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl TryFrom<Vec<JobParameter>> for JobParameterSet {
    type Error = ParameterError;

    fn try_from(value: Vec<JobParameter>) -> Result<Self, Self::Error> {
        Self::try_from_parameters(value)
    }
}
