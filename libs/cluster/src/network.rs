//! Floating IP / network mode detection.
//!
//! The controller's `nova.conf` tells whether the cloud runs Neutron, Nova
//! network with automatic floating IPs, or Nova network with explicit
//! pools. Node groups need a floating IP pool in every mode but the
//! auto-assign one.

use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::ClusterError;
use crate::orchestrator::Compute;
use crate::shell::RemoteShell;

const NEUTRON_API_CLASS: &str = "network_api_class=nova.network.neutronv2.api.API";

/// How instances get external addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    /// Neutron; floating IPs come from the external network.
    Neutron { floating_network_id: String },

    /// Nova network assigning floating IPs automatically.
    NovaAutoAssign,

    /// Nova network with an explicit floating IP pool.
    Nova { floating_ip_pool: String },
}

impl NetworkMode {
    /// Pool to put in node group templates, if one is needed.
    pub fn floating_ip_pool(&self) -> Option<String> {
        match self {
            Self::Neutron {
                floating_network_id,
            } => Some(floating_network_id.clone()),
            Self::NovaAutoAssign => None,
            Self::Nova { floating_ip_pool } => Some(floating_ip_pool.clone()),
        }
    }

    pub fn is_neutron(&self) -> bool {
        matches!(self, Self::Neutron { .. })
    }
}

/// Inspect the controller configuration and resolve the network mode.
pub async fn detect_network_mode(
    shell: &dyn RemoteShell,
    compute: &dyn Compute,
    config: &HarnessConfig,
) -> Result<NetworkMode, ClusterError> {
    let nova = shell
        .run("grep auto_assign_floating_ip /etc/nova/nova.conf | grep True")
        .await?;
    let neutron = shell
        .run(&format!("grep -E \"{NEUTRON_API_CLASS}\" /etc/nova/nova.conf"))
        .await?;

    if !neutron.stdout.trim().is_empty() || neutron.stderr.contains(NEUTRON_API_CLASS) {
        debug!("Neutron is found");
        let floating_network_id = compute
            .find_network(&config.floating_network_label)
            .await?
            .ok_or_else(|| ClusterError::NotFound {
                kind: "network",
                name: config.floating_network_label.clone(),
            })?;
        return Ok(NetworkMode::Neutron {
            floating_network_id,
        });
    }

    if !nova.stdout.trim().is_empty() || nova.stderr.contains(" True") {
        debug!("auto_assign_floating_ip is found");
        return Ok(NetworkMode::NovaAutoAssign);
    }

    debug!("auto_assign_floating_ip is not found");
    let floating_ip_pool = compute
        .list_floating_ip_pools()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ClusterError::NotFound {
            kind: "floating ip pool",
            name: "<any>".to_string(),
        })?;
    debug!(pool = %floating_ip_pool, "Using floating IP pool");

    Ok(NetworkMode::Nova { floating_ip_pool })
}
