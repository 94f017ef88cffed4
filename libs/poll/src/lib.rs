//! Polling primitives.
//!
//! Every poller in the harness has the same shape: submit an operation,
//! query its status on a fixed interval, and stop at a terminal condition
//! (success, error, or an exhausted budget). Key concepts:
//!
//! - **Tick**: one iteration of a polling loop (query, evaluate, sleep or exit).
//! - **Budget**: how many ticks a loop may perform before it gives up.
//! - **Attempt**: the ephemeral record of one running loop.
//!
//! # Invariants
//!
//! - A budget always allows at least one tick
//! - The interval is constant; there is no backoff
//! - Sleeps happen only between ticks, never before the first or after the last

use std::time::Duration;

use tokio::time::Instant;

/// Interval between cluster status queries.
pub const CLUSTER_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Interval between port probes.
pub const PORT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Deadline for a single port probe on the remote side.
pub const PORT_PROBE_DEADLINE: Duration = Duration::from_secs(60);

/// Default window for a port to become reachable.
pub const DEFAULT_PORT_WAIT: Duration = Duration::from_secs(600);

/// Interval between worker activation queries.
pub const WORKER_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of worker activation ticks.
///
/// At [`WORKER_POLL_INTERVAL`] these span 297s: 99 sleeps between 100 queries.
pub const DEFAULT_WORKER_ATTEMPTS: u32 = 100;

/// Interval between test-run status queries.
pub const TESTRUN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Deadline for a single HTTP request to the test-execution service.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between stopping a stale run and resubmitting.
pub const RESUBMIT_PAUSE: Duration = Duration::from_secs(1);

/// Upper bound on the number of ticks a polling loop may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickBudget {
    max_ticks: u32,
    interval: Duration,
}

impl TickBudget {
    /// Budget covering `window` at a fixed `interval`: `ceil(window / interval)` ticks.
    pub fn for_window(window: Duration, interval: Duration) -> Self {
        let window_ms = window.as_millis();
        let interval_ms = interval.as_millis().max(1);
        let ticks = window_ms.div_ceil(interval_ms);

        Self {
            max_ticks: u32::try_from(ticks).unwrap_or(u32::MAX).max(1),
            interval,
        }
    }

    /// Budget for a timeout expressed in minutes.
    ///
    /// At the 10s cluster interval this is `minutes * 6` ticks.
    pub fn from_minutes(minutes: u64, interval: Duration) -> Self {
        Self::for_window(Duration::from_secs(minutes.saturating_mul(60)), interval)
    }

    /// Budget with an explicit tick count.
    pub fn fixed(max_ticks: u32, interval: Duration) -> Self {
        Self {
            max_ticks: max_ticks.max(1),
            interval,
        }
    }

    /// Maximum number of ticks.
    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    /// Sleep between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total time spent sleeping if every tick is used.
    pub fn total_sleep(&self) -> Duration {
        self.interval * (self.max_ticks - 1)
    }

    /// Start a new attempt against this budget.
    pub fn start(self) -> PollAttempt {
        PollAttempt {
            budget: self,
            ticks: 0,
            started: Instant::now(),
            last_status: None,
        }
    }
}

/// One running polling loop.
///
/// Created at poll start and dropped at the terminal condition.
#[derive(Debug)]
pub struct PollAttempt {
    budget: TickBudget,
    ticks: u32,
    started: Instant,
    last_status: Option<String>,
}

impl PollAttempt {
    /// Begin the next tick.
    ///
    /// Sleeps the budget interval first unless this is the first tick.
    /// Returns false once the budget is spent, without sleeping.
    pub async fn next_tick(&mut self) -> bool {
        if self.ticks >= self.budget.max_ticks {
            return false;
        }
        if self.ticks > 0 {
            tokio::time::sleep(self.budget.interval).await;
        }
        self.ticks += 1;
        true
    }

    /// Ticks performed so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Ticks left in the budget.
    pub fn remaining(&self) -> u32 {
        self.budget.max_ticks - self.ticks
    }

    /// Time since the attempt started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the status observed on the current tick.
    pub fn observe(&mut self, status: impl Into<String>) {
        self.last_status = Some(status.into());
    }

    /// Last observed status, if any tick recorded one.
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// The budget this attempt runs against.
    pub fn budget(&self) -> TickBudget {
        self.budget
    }
}

/// Wall-clock deadline for loops bounded by elapsed time rather than ticks.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Start a deadline that expires once `timeout` has elapsed.
    pub fn start(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// Time since the deadline started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once strictly more than the timeout has elapsed.
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.timeout
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(60, 10, 6)]
    #[case(20, 10, 2)]
    #[case(25, 10, 3)]
    #[case(600, 10, 60)]
    #[case(0, 10, 1)]
    #[case(5, 10, 1)]
    fn test_window_budget(#[case] window: u64, #[case] interval: u64, #[case] expected: u32) {
        let budget =
            TickBudget::for_window(Duration::from_secs(window), Duration::from_secs(interval));
        assert_eq!(budget.max_ticks(), expected);
    }

    #[test]
    fn test_minutes_budget_is_six_ticks_per_minute() {
        let budget = TickBudget::from_minutes(90, CLUSTER_POLL_INTERVAL);
        assert_eq!(budget.max_ticks(), 540);
    }

    #[test]
    fn test_fixed_budget_floor() {
        assert_eq!(TickBudget::fixed(0, WORKER_POLL_INTERVAL).max_ticks(), 1);
        assert_eq!(
            TickBudget::fixed(DEFAULT_WORKER_ATTEMPTS, WORKER_POLL_INTERVAL).max_ticks(),
            100
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_sleeps_only_between_ticks() {
        let mut attempt = TickBudget::fixed(3, Duration::from_secs(10)).start();

        assert!(attempt.next_tick().await);
        assert_eq!(attempt.elapsed(), Duration::ZERO);

        assert!(attempt.next_tick().await);
        assert!(attempt.next_tick().await);
        assert_eq!(attempt.elapsed(), Duration::from_secs(20));
        assert_eq!(attempt.remaining(), 0);

        assert!(!attempt.next_tick().await);
        assert_eq!(attempt.ticks(), 3);
        assert_eq!(attempt.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry() {
        let deadline = Deadline::start(Duration::from_secs(12));
        assert!(!deadline.is_expired());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(!deadline.is_expired());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(deadline.is_expired());
    }

    #[test]
    fn test_last_status() {
        let mut attempt = TickBudget::fixed(1, CLUSTER_POLL_INTERVAL).start();
        assert_eq!(attempt.last_status(), None);
        attempt.observe("Spawning");
        assert_eq!(attempt.last_status(), Some("Spawning"));
    }

    proptest! {
        #[test]
        fn budget_never_exceeds_window_ticks(minutes in 0u64..1_000, interval in 1u64..120) {
            let budget = TickBudget::from_minutes(minutes, Duration::from_secs(interval));
            let bound = (minutes * 60).div_ceil(interval).max(1);
            prop_assert!(u64::from(budget.max_ticks()) <= bound);
            prop_assert!(budget.max_ticks() >= 1);
        }
    }
}
