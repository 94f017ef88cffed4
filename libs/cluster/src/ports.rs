//! Port reachability checks.
//!
//! A probe is a bounded TCP connect through bash's `/dev/tcp`, run on the
//! controller host. The probe echoes the connect exit status, so `0` on
//! stdout means the port accepted a connection. Some controllers route the
//! result to stderr instead (`nc`-style "succeeded!"), so both streams are
//! checked.

use std::time::Duration;

use ostf_poll::{TickBudget, PORT_POLL_INTERVAL, PORT_PROBE_DEADLINE};
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::shell::{CommandOutput, RemoteShell};

/// Marker some probes print on stderr when the connection succeeded.
const SUCCEEDED_MARKER: &str = " succeeded!";

/// Shell command that tries one TCP connection to `host:port`.
pub fn probe_command(host: &str, port: u16) -> String {
    format!(
        "timeout {} bash -c 'echo >/dev/tcp/{host}/{port}'; echo $?",
        PORT_PROBE_DEADLINE.as_secs()
    )
}

/// True if the probe output reports a successful connection.
pub fn probe_succeeded(output: &CommandOutput) -> bool {
    output.stdout.trim() == "0" || output.stderr.contains(SUCCEEDED_MARKER)
}

/// Probe `host:port` every [`PORT_POLL_INTERVAL`] until it accepts a
/// connection or `max_wait` is used up.
pub async fn await_port_open(
    shell: &dyn RemoteShell,
    host: &str,
    port: u16,
    max_wait: Duration,
) -> Result<(), ClusterError> {
    let mut attempt = TickBudget::for_window(max_wait, PORT_POLL_INTERVAL).start();
    let command = probe_command(host, port);

    while attempt.next_tick().await {
        let output = shell.run(&command).await?;
        debug!(
            host,
            port,
            elapsed_secs = attempt.elapsed().as_secs(),
            stdout = %output.stdout.trim(),
            "Port probe output"
        );

        if probe_succeeded(&output) {
            info!(host, port, probes = attempt.ticks(), "Port is open");
            return Ok(());
        }
    }

    warn!(host, port, probes = attempt.ticks(), "Port did not open in time");
    Err(ClusterError::PortTimeout {
        host: host.to_string(),
        port,
        probes: attempt.ticks(),
        elapsed: attempt.elapsed(),
    })
}
