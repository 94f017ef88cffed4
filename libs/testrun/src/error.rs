//! Error types for the test-execution client.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::model::{RunStatus, TestOutcome};

/// Errors from the test-execution service or the run poller.
#[derive(Debug, Error)]
pub enum TestRunError {
    /// Non-2xx response. Never retried.
    #[error("{method} \"{url}\" responded with \"{status}\" status code")]
    Remote {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No run of testset {testset} found for cluster {cluster_id}")]
    TestsetNotFound { testset: String, cluster_id: String },

    #[error("{0}")]
    TimedOut(Box<TimeoutReport>),
}

/// State of a run that did not finish in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutReport {
    pub testset: String,
    /// Status observed on the last poll before the timeout.
    pub status_at_timeout: RunStatus,
    /// Status after the run was stopped.
    pub status_after_stop: RunStatus,
    pub elapsed: Duration,
    pub polls: u32,
    /// Per-test breakdown from the last snapshot before the stop.
    pub tests: Vec<TestOutcome>,
}

impl fmt::Display for TimeoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is still in {} state. Now the state is {} (after {:?}, {} polls)",
            self.testset, self.status_at_timeout, self.status_after_stop, self.elapsed, self.polls
        )?;
        for test in &self.tests {
            write!(f, "\n{test}")?;
        }
        Ok(())
    }
}

impl TestRunError {
    pub fn testset_not_found(testset: &str, cluster_id: &str) -> Self {
        Self::TestsetNotFound {
            testset: testset.to_string(),
            cluster_id: cluster_id.to_string(),
        }
    }

    /// HTTP status of a `Remote` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
