//! Test-run poller.
//!
//! ```text
//! Submitted -> Polling -> Finished
//!                  |
//!                  +--> StoppedOnTimeout
//! ```
//!
//! The deadline starts before submission. Every tick sleeps the polling
//! interval, fetches the latest runs of the cluster and looks up the
//! testset. A run that is still not finished once the deadline has passed
//! is stopped, re-fetched and reported as [`TestRunError::TimedOut`].

use std::time::Duration;

use ostf_poll::{Deadline, RESUBMIT_PAUSE, TESTRUN_POLL_INTERVAL};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::TestRunService;
use crate::error::{TestRunError, TimeoutReport};
use crate::model::{find_run, TestRun};

/// Progress hook called with every raw polling response.
pub type Observer<'a> = &'a mut (dyn FnMut(&Value) + Send);

/// Overall timeout and polling interval of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTimeout {
    pub timeout: Duration,
    pub polling: Duration,
}

impl RunTimeout {
    /// Poll every 5s until `timeout` has passed.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            polling: TESTRUN_POLL_INTERVAL,
        }
    }

    pub fn with_polling(mut self, polling: Duration) -> Self {
        self.polling = polling;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Submission<'a> {
    Run(&'a [String]),
    Restart(&'a [String]),
}

/// Run `tests` of `testset` (all of them when empty) and wait for the run
/// to finish. Returns the latest-runs listing that showed it finished.
pub async fn run_with_timeout(
    service: &dyn TestRunService,
    testset: &str,
    tests: &[String],
    cluster_id: &str,
    settings: RunTimeout,
    observer: Option<Observer<'_>>,
) -> Result<Vec<TestRun>, TestRunError> {
    poll_run(
        service,
        Submission::Run(tests),
        testset,
        cluster_id,
        settings,
        observer,
    )
    .await
}

/// Run a whole testset and wait for it to finish.
pub async fn run_testset_with_timeout(
    service: &dyn TestRunService,
    testset: &str,
    cluster_id: &str,
    settings: RunTimeout,
    observer: Option<Observer<'_>>,
) -> Result<Vec<TestRun>, TestRunError> {
    run_with_timeout(service, testset, &[], cluster_id, settings, observer).await
}

/// Restart `tests` of the latest run of `testset` and wait for it.
pub async fn restart_with_timeout(
    service: &dyn TestRunService,
    testset: &str,
    tests: &[String],
    cluster_id: &str,
    settings: RunTimeout,
    observer: Option<Observer<'_>>,
) -> Result<Vec<TestRun>, TestRunError> {
    poll_run(
        service,
        Submission::Restart(tests),
        testset,
        cluster_id,
        settings,
        observer,
    )
    .await
}

/// True for the `[{}]` answer given when the testset already has an
/// active run.
pub fn is_already_running(response: &Value) -> bool {
    *response == json!([{}])
}

async fn submit(
    service: &dyn TestRunService,
    submission: Submission<'_>,
    testset: &str,
    cluster_id: &str,
) -> Result<Value, TestRunError> {
    match submission {
        Submission::Run(tests) => service.submit_run(testset, tests, cluster_id).await,
        Submission::Restart(tests) => service.submit_restart(testset, tests, cluster_id).await,
    }
}

fn locate(runs: &[TestRun], testset: &str, cluster_id: &str) -> Result<TestRun, TestRunError> {
    find_run(runs, testset)
        .cloned()
        .ok_or_else(|| TestRunError::testset_not_found(testset, cluster_id))
}

async fn poll_run(
    service: &dyn TestRunService,
    submission: Submission<'_>,
    testset: &str,
    cluster_id: &str,
    settings: RunTimeout,
    mut observer: Option<Observer<'_>>,
) -> Result<Vec<TestRun>, TestRunError> {
    let deadline = Deadline::start(settings.timeout);

    let response = submit(service, submission, testset, cluster_id).await?;
    if is_already_running(&response) {
        info!(testset, cluster_id, "Testset already has an active run, stopping it");
        service.stop_latest(testset, cluster_id).await?;
        tokio::time::sleep(RESUBMIT_PAUSE).await;
        submit(service, submission, testset, cluster_id).await?;
    }

    let mut polls = 0u32;
    let current = loop {
        tokio::time::sleep(settings.polling).await;
        polls += 1;

        let raw = service.latest_runs(cluster_id).await?;
        if let Some(observer) = observer.as_deref_mut() {
            observer(&raw);
        }
        let runs: Vec<TestRun> = serde_json::from_value(raw)?;
        let run = locate(&runs, testset, cluster_id)?;

        debug!(
            testset,
            cluster_id,
            poll = polls,
            status = %run.status,
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "Test run status"
        );

        if run.is_finished() {
            info!(testset, cluster_id, polls, "Test run finished");
            return Ok(runs);
        }
        if deadline.is_expired() {
            break run;
        }
    };

    warn!(
        testset,
        cluster_id,
        status = %current.status,
        timeout_secs = settings.timeout.as_secs_f64(),
        "Test run did not finish in time, stopping it"
    );

    let stop_response = service.stop_latest(testset, cluster_id).await?;
    if let Some(observer) = observer.as_deref_mut() {
        observer(&stop_response);
    }

    let after: Vec<TestRun> = serde_json::from_value(service.latest_runs(cluster_id).await?)?;
    let stopped = locate(&after, testset, cluster_id)?;

    Err(TestRunError::TimedOut(Box::new(TimeoutReport {
        testset: testset.to_string(),
        status_at_timeout: current.status,
        status_after_stop: stopped.status,
        elapsed: deadline.elapsed(),
        polls,
        tests: current.tests,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_marker() {
        assert!(is_already_running(&json!([{}])));
        assert!(!is_already_running(&json!([])));
        assert!(!is_already_running(&json!([{"id": 1}])));
        assert!(!is_already_running(&Value::Null));
    }

    #[test]
    fn test_run_timeout_defaults_to_five_second_polling() {
        let settings = RunTimeout::new(Duration::from_secs(12));
        assert_eq!(settings.polling, Duration::from_secs(5));
        let fast = settings.with_polling(Duration::from_millis(50));
        assert_eq!(fast.timeout, Duration::from_secs(12));
        assert_eq!(fast.polling, Duration::from_millis(50));
    }
}
