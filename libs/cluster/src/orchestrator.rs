//! Orchestration and compute collaborator interfaces.
//!
//! The harness drives a data-processing service (templates, clusters) and
//! a compute service (flavors, keypairs, images, networks). Both are
//! external; only the calls the pollers and the provisioning flow need are
//! modelled here.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::ClusterStatus;

/// Kinds of resources the orchestration service owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cluster,
    ClusterTemplate,
    NodeGroupTemplate,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cluster => "cluster",
            Self::ClusterTemplate => "cluster template",
            Self::NodeGroupTemplate => "node group template",
        })
    }
}

/// Id and name of a listed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: String,
    pub name: String,
}

/// Request to create a node group template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGroupTemplateRequest {
    pub name: String,
    pub plugin_name: String,
    pub hadoop_version: String,
    pub flavor_id: String,
    pub description: String,
    pub volumes_per_node: u32,
    pub volumes_size: u32,
    pub node_processes: Vec<String>,
    pub node_configs: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floating_ip_pool: Option<String>,
}

/// A node group inside a cluster template or cluster request.
///
/// Either inline (`flavor_id` + `node_processes`) or a reference to a node
/// group template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGroupSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node_processes: Vec<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub node_configs: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_group_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floating_ip_pool: Option<String>,
    pub count: u32,
}

/// Request to create a cluster template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterTemplateRequest {
    pub name: String,
    pub plugin_name: String,
    pub hadoop_version: String,
    pub description: String,
    pub cluster_configs: serde_json::Value,
    pub node_groups: Vec<NodeGroupSpec>,
    pub anti_affinity: Vec<String>,
}

/// Request to create a cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRequest {
    pub name: String,
    pub plugin_name: String,
    pub hadoop_version: String,
    pub cluster_template_id: String,
    pub default_image_id: String,
    pub description: String,
    pub cluster_configs: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_groups: Option<Vec<NodeGroupSpec>>,
    pub user_keypair_id: String,
    pub anti_affinity: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_id: Option<String>,
}

/// Data-processing service client.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn create_node_group_template(&self, request: &NodeGroupTemplateRequest)
        -> Result<String>;

    async fn create_cluster_template(&self, request: &ClusterTemplateRequest) -> Result<String>;

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<String>;

    /// Fetch a fresh snapshot of a cluster.
    async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterStatus>;

    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>>;

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()>;
}

/// Flavor sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorSpec {
    pub name: String,
    pub ram_mb: u32,
    pub vcpus: u32,
    pub disk_gb: u32,
}

/// A keypair created for cluster access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    pub name: String,
    pub private_key: String,
}

/// A registered image and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Compute service client.
#[async_trait]
pub trait Compute: Send + Sync {
    /// Create a flavor and return its id.
    async fn create_flavor(&self, spec: &FlavorSpec) -> Result<String>;

    async fn delete_flavor(&self, flavor_id: &str) -> Result<()>;

    async fn create_keypair(&self, name: &str) -> Result<Keypair>;

    async fn delete_keypair(&self, name: &str) -> Result<()>;

    async fn list_images(&self) -> Result<Vec<Image>>;

    /// Id of the network with the given label.
    async fn find_network(&self, label: &str) -> Result<Option<String>>;

    /// Names of the floating IP pools.
    async fn list_floating_ip_pools(&self) -> Result<Vec<String>>;
}
