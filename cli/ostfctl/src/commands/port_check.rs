//! Port reachability probe.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use ostf_cluster::{await_port_open, LocalShell, RemoteShell, SshShell};

use crate::output::print_success;

#[derive(Debug, Args)]
pub struct PortCheckArgs {
    /// Host to probe.
    pub host: String,

    /// Port to probe.
    pub port: u16,

    /// Seconds to keep probing before giving up.
    #[arg(long, default_value = "600")]
    pub max_wait: u64,

    /// Probe from this controller (user@host) over ssh instead of locally.
    #[arg(long)]
    pub via: Option<String>,

    /// Identity file for --via.
    #[arg(long, requires = "via")]
    pub identity: Option<PathBuf>,
}

/// Split `user@host`; a bare host logs in as root.
fn ssh_target(via: &str) -> (&str, &str) {
    match via.split_once('@') {
        Some((user, host)) => (user, host),
        None => ("root", via),
    }
}

fn shell(args: &PortCheckArgs) -> Box<dyn RemoteShell> {
    match args.via.as_deref() {
        Some(via) => {
            let (user, host) = ssh_target(via);
            let mut shell = SshShell::new(host, user);
            if let Some(identity) = &args.identity {
                shell = shell.with_identity(identity.clone());
            }
            Box::new(shell)
        }
        None => Box::new(LocalShell::new()),
    }
}

pub async fn port_check(args: PortCheckArgs) -> Result<()> {
    let shell = shell(&args);
    await_port_open(
        shell.as_ref(),
        &args.host,
        args.port,
        Duration::from_secs(args.max_wait),
    )
    .await?;

    print_success(&format!("{}:{} is open", args.host, args.port));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_target() {
        assert_eq!(ssh_target("ubuntu@10.20.0.2"), ("ubuntu", "10.20.0.2"));
        assert_eq!(ssh_target("controller"), ("root", "controller"));
    }
}
