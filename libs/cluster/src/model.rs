//! Read-only projections of cluster state as reported by the orchestration service.
//!
//! The harness never mutates these; every poll tick fetches a fresh snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterState {
    /// Cluster is provisioned and services are started.
    Active,

    /// Provisioning failed.
    Error,

    /// Any transient state (Validating, Spawning, Waiting, Configuring, ...).
    Other(String),
}

impl ClusterState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Error => "Error",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ClusterState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Active" => Self::Active,
            "Error" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ClusterState {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ClusterState> for String {
    fn from(state: ClusterState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub id: String,

    pub status: ClusterState,

    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
}

impl ClusterStatus {
    /// The snapshot rendered as JSON, for error diagnostics.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// A set of instances sharing the same processes and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    #[serde(default)]
    pub name: String,

    /// Process (role) names running on every instance of the group.
    pub node_processes: Vec<String>,

    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// A single compute instance in a node group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Address used for SSH and port checks.
    pub management_ip: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
}

/// Aggregate of worker roles in an Active cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub namenode_ip: String,
    pub tasktracker_count: u32,
    pub datanode_count: u32,
    pub node_count: u32,
}

/// Result of a successful cluster creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: String,

    /// Management address -> processes on that instance.
    pub node_ips: BTreeMap<String, Vec<String>>,

    pub node_info: NodeInfo,
}
