//! Worker topology resolution.
//!
//! Maps every instance of an Active cluster to its processes, checks that
//! exactly one instance runs the namenode, counts trackers and datanodes,
//! and waits for SSH plus every known role port on every instance.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ClusterError, TopologyError};
use crate::model::{ClusterStatus, NodeInfo};
use crate::orchestrator::Orchestrator;
use crate::ports::await_port_open;
use crate::shell::RemoteShell;
use crate::variant::{PluginVariant, Role, SSH_PORT};

/// Resolved cluster layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Management address -> processes on that instance.
    pub node_ips: BTreeMap<String, Vec<String>>,
    pub node_info: NodeInfo,
}

/// Processes per management address.
///
/// An address appearing in several node groups keeps the processes of the
/// last group listing it. Keys sort as strings; see [`probe_order`] for the
/// order instances are probed in.
pub fn node_ip_map(status: &ClusterStatus) -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    for group in &status.node_groups {
        for instance in &group.instances {
            map.insert(instance.management_ip.clone(), group.node_processes.clone());
        }
    }
    map
}

/// Addresses in numeric order, with anything that does not parse as an IP
/// address last.
pub fn probe_order(node_ips: &BTreeMap<String, Vec<String>>) -> Vec<(&str, &[String])> {
    let mut order: Vec<(&str, &[String])> = node_ips
        .iter()
        .map(|(ip, processes)| (ip.as_str(), processes.as_slice()))
        .collect();
    order.sort_by_cached_key(|(ip, _)| {
        let parsed = ip.parse::<IpAddr>().ok();
        (parsed.is_none(), parsed)
    });
    order
}

/// Count roles and locate the single namenode.
pub fn summarize(
    cluster_id: &str,
    node_ips: &BTreeMap<String, Vec<String>>,
    variant: &PluginVariant,
) -> Result<NodeInfo, TopologyError> {
    let mut tasktracker_count = 0;
    let mut datanode_count = 0;
    let mut namenodes = Vec::new();

    for (ip, processes) in node_ips {
        if variant.has_role(processes, Role::TaskTracker) {
            tasktracker_count += 1;
        }
        if variant.has_role(processes, Role::DataNode) {
            datanode_count += 1;
        }
        if variant.has_role(processes, Role::NameNode) {
            namenodes.push(ip.clone());
        }
    }

    let token = variant.token(Role::NameNode).unwrap_or("namenode").to_string();
    let namenode_ip = match namenodes.len() {
        0 => {
            return Err(TopologyError::NoNamenode {
                cluster_id: cluster_id.to_string(),
                token,
            })
        }
        1 => namenodes.remove(0),
        _ => {
            return Err(TopologyError::MultipleNamenodes {
                cluster_id: cluster_id.to_string(),
                token,
                addresses: namenodes,
            })
        }
    };

    Ok(NodeInfo {
        namenode_ip,
        tasktracker_count,
        datanode_count,
        node_count: node_ips.len() as u32,
    })
}

/// Resolve the topology of an Active cluster and wait for its ports.
///
/// The namenode invariant is checked before any port is probed. Each
/// instance gets an SSH probe first, then one probe per known role.
pub async fn resolve_node_info(
    orchestrator: &dyn Orchestrator,
    shell: &dyn RemoteShell,
    cluster_id: &str,
    variant: &PluginVariant,
    port_wait: Duration,
) -> Result<Topology, ClusterError> {
    let status = orchestrator.get_cluster(cluster_id).await?;
    let node_ips = node_ip_map(&status);
    debug!(cluster_id, ?node_ips, "Cluster processes by address");

    let node_info = summarize(cluster_id, &node_ips, variant)?;

    for (ip, processes) in probe_order(&node_ips) {
        await_port_open(shell, ip, SSH_PORT, port_wait).await?;
        for role in variant.roles_of(processes) {
            await_port_open(shell, ip, role.port(), port_wait).await?;
        }
    }

    info!(
        cluster_id,
        namenode_ip = %node_info.namenode_ip,
        tasktrackers = node_info.tasktracker_count,
        datanodes = node_info.datanode_count,
        nodes = node_info.node_count,
        "Cluster topology resolved"
    );

    Ok(Topology {
        node_ips,
        node_info,
    })
}
