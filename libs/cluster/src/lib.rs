//! Cluster provisioning and readiness polling.
//!
//! Drives a Hadoop cluster on the data-processing service from creation to
//! a state where every worker daemon has registered with its master:
//!
//! ```text
//! Provisioning -> Active -> Verifying-Ports -> Verifying-Workers -> Ready
//!      |
//!      +--> Error / TimedOut
//! ```
//!
//! ## Modules
//!
//! - `readiness`: wait for the cluster status to become Active
//! - `ports`: wait for a host:port to accept connections
//! - `topology`: map instances to roles and check the namenode invariant
//! - `workers`: wait for tracker and datanode counts to match
//! - `provision`: the end-to-end flow over the collaborator traits
//! - `context`: per-run resource bookkeeping and teardown

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod network;
pub mod orchestrator;
pub mod ports;
pub mod provision;
pub mod readiness;
pub mod shell;
pub mod templates;
pub mod topology;
pub mod variant;
pub mod workers;

pub use config::HarnessConfig;
pub use context::ProvisioningContext;
pub use error::{ClusterError, ShellError, TopologyError};
pub use model::{ClusterInfo, ClusterState, ClusterStatus, Instance, NodeGroup, NodeInfo};
pub use orchestrator::{Compute, Orchestrator, ResourceKind};
pub use ports::await_port_open;
pub use provision::Provisioner;
pub use readiness::await_cluster_ready;
pub use shell::{CommandOutput, LocalShell, RemoteShell, SshShell};
pub use topology::{resolve_node_info, Topology};
pub use variant::{PluginVariant, Role, VariantTable};
pub use workers::{await_workers_active, default_worker_budget};
