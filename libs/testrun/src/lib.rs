//! Client and run poller for the OSTF test-execution service.
//!
//! [`AdapterClient`] wraps the service's HTTP/JSON endpoints; the poller
//! functions submit a run and wait for it to finish, stopping it when it
//! overruns its timeout.

pub mod client;
pub mod error;
pub mod model;
pub mod poller;

pub use client::{AdapterClient, TestRunService};
pub use error::{TestRunError, TimeoutReport};
pub use model::{RunStatus, Test, TestOutcome, TestRun, TestRunId, Testset};
pub use poller::{
    restart_with_timeout, run_testset_with_timeout, run_with_timeout, Observer, RunTimeout,
};
