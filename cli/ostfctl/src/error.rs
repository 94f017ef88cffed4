//! Error display for the CLI.

use colored::Colorize;
use ostf_cluster::ClusterError;
use ostf_testrun::TestRunError;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(err) = err.downcast_ref::<TestRunError>() {
        return match err {
            TestRunError::Remote { status: 404, .. } => {
                Some("Check the cluster id; the service does not know it.")
            }
            TestRunError::Remote { status, .. } if *status >= 500 => {
                Some("The test-execution service failed; check its logs.")
            }
            TestRunError::Transport(_) => {
                Some("Check that the service is reachable at --adapter-url / OSTF_ADAPTER_URL.")
            }
            TestRunError::TestsetNotFound { .. } => {
                Some("Run `ostfctl testsets <cluster>` to list the available testsets.")
            }
            TestRunError::TimedOut(_) => Some("The run was stopped. Raise --timeout to wait longer."),
            _ => None,
        };
    }

    match err.downcast_ref::<ClusterError>() {
        Some(ClusterError::PortTimeout { .. }) => {
            Some("Raise --max-wait, or check security groups and the instance's services.")
        }
        Some(ClusterError::KeyInstall { .. }) => {
            Some("The controller's /tmp must be writable by the ssh user.")
        }
        Some(ClusterError::Shell(_)) => {
            Some("Check that `ssh` can reach the controller with the given user and key.")
        }
        _ => None,
    }
}
