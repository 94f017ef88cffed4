//! Wire types of the test-execution service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run identifier. The service answers with integers, restart bodies send
/// it back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRunId {
    Number(u64),
    Text(String),
}

impl fmt::Display for TestRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Status of a test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Running,
    Finished,
    Stopped,
    Restarted,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::Restarted => "restarted",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => Self::Running,
            "finished" => Self::Finished,
            "stopped" => Self::Stopped,
            "restarted" => Self::Restarted,
            _ => Self::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one test inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// Seconds the test took, once it has run.
    #[serde(default)]
    pub taken: Option<f64>,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.taken {
            Some(taken) => write!(f, "{} -> {}, {}", self.id, self.status, taken),
            None => write!(f, "{} -> {}, None", self.id, self.status),
        }
    }
}

/// One entry of a run listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub id: TestRunId,
    pub testset: String,
    pub status: RunStatus,
    #[serde(default)]
    pub tests: Vec<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

impl TestRun {
    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// A named collection of tests available for a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testset {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A single test available for a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub testset: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// First run of `testset` in a listing.
pub fn find_run<'a>(runs: &'a [TestRun], testset: &str) -> Option<&'a TestRun> {
    runs.iter().find(|run| run.testset == testset)
}
