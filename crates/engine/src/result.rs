use serde::{Deserialize, Serialize};

/// Outcome classification of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failure,
}

/// Structured outcome of one job run: status plus diagnostic output.
///
/// Created by the job (or synthesized by the runner on error) at the end of a
/// run and consumed by the host to decide on alerting/retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    status: RunStatus,
    output: String,
}

impl JobResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Success,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failure,
            output: output.into(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Same status, with `trail` appended to the output on its own line.
    pub fn with_trail(self, trail: &str) -> Self {
        if trail.is_empty() {
            return self;
        }
        let output = if self.output.is_empty() {
            trail.to_string()
        } else {
            format!("{}\n{}", self.output, trail)
        };
        Self { output, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_screaming_case() {
        let json = serde_json::to_value(JobResult::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "FAILURE", "output": "boom"}));
    }

    #[test]
    fn trail_is_appended_on_new_line() {
        let r = JobResult::success("saved 2").with_trail("[INFO] done");
        assert_eq!(r.output(), "saved 2\n[INFO] done");
        assert!(r.is_success());

        let r = JobResult::failure("").with_trail("[ERROR] x");
        assert_eq!(r.output(), "[ERROR] x");

        let r = JobResult::success("only").with_trail("");
        assert_eq!(r.output(), "only");
    }
}
