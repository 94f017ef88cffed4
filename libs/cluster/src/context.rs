//! Per-run record of created resources.
//!
//! Everything the provisioning flow creates is registered here so that
//! teardown deletes exactly what this run made, and nothing leaks between
//! runs.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::orchestrator::{Compute, Keypair, Orchestrator, ResourceKind};

/// Random suffix appended to resource names.
pub fn name_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `prefix` plus a random suffix.
pub fn rand_name(prefix: &str) -> String {
    format!("{prefix}{}", name_suffix())
}

/// Resources created during one run.
#[derive(Debug, Default)]
pub struct ProvisioningContext {
    flavors: Vec<String>,
    node_group_templates: Vec<String>,
    cluster_templates: Vec<String>,
    clusters: Vec<String>,
    keypairs: Vec<Keypair>,
}

/// One resource teardown could not delete.
#[derive(Debug)]
pub struct TeardownFailure {
    pub resource: &'static str,
    pub id: String,
    pub error: anyhow::Error,
}

impl ProvisioningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_flavor(&mut self, id: impl Into<String>) {
        self.flavors.push(id.into());
    }

    pub fn record_node_group_template(&mut self, id: impl Into<String>) {
        self.node_group_templates.push(id.into());
    }

    pub fn record_cluster_template(&mut self, id: impl Into<String>) {
        self.cluster_templates.push(id.into());
    }

    pub fn record_cluster(&mut self, id: impl Into<String>) {
        self.clusters.push(id.into());
    }

    pub fn record_keypair(&mut self, keypair: Keypair) {
        self.keypairs.push(keypair);
    }

    /// First flavor created in this run.
    pub fn flavor(&self) -> Option<&str> {
        self.flavors.first().map(String::as_str)
    }

    pub fn node_group_templates(&self) -> &[String] {
        &self.node_group_templates
    }

    pub fn cluster_templates(&self) -> &[String] {
        &self.cluster_templates
    }

    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    pub fn keypairs(&self) -> &[Keypair] {
        &self.keypairs
    }

    /// True when nothing is left to delete.
    pub fn is_empty(&self) -> bool {
        self.flavors.is_empty()
            && self.node_group_templates.is_empty()
            && self.cluster_templates.is_empty()
            && self.clusters.is_empty()
            && self.keypairs.is_empty()
    }

    /// Delete everything recorded: clusters, cluster templates, node group
    /// templates, flavors, keypairs.
    ///
    /// Deleted resources are forgotten; failed ones stay recorded and are
    /// returned so the caller can report them.
    pub async fn teardown(
        &mut self,
        orchestrator: &dyn Orchestrator,
        compute: &dyn Compute,
    ) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();

        for kind in [
            ResourceKind::Cluster,
            ResourceKind::ClusterTemplate,
            ResourceKind::NodeGroupTemplate,
        ] {
            let ids = match kind {
                ResourceKind::Cluster => &mut self.clusters,
                ResourceKind::ClusterTemplate => &mut self.cluster_templates,
                ResourceKind::NodeGroupTemplate => &mut self.node_group_templates,
            };
            let mut kept = Vec::new();
            for id in ids.drain(..) {
                match orchestrator.delete(kind, &id).await {
                    Ok(()) => debug!(%kind, id = %id, "Deleted"),
                    Err(error) => {
                        warn!(%kind, id = %id, error = %error, "Failed to delete");
                        failures.push(TeardownFailure {
                            resource: kind_label(kind),
                            id: id.clone(),
                            error,
                        });
                        kept.push(id);
                    }
                }
            }
            *ids = kept;
        }

        let mut kept = Vec::new();
        for id in self.flavors.drain(..) {
            match compute.delete_flavor(&id).await {
                Ok(()) => debug!(id = %id, "Deleted flavor"),
                Err(error) => {
                    warn!(id = %id, error = %error, "Failed to delete flavor");
                    failures.push(TeardownFailure {
                        resource: "flavor",
                        id: id.clone(),
                        error,
                    });
                    kept.push(id);
                }
            }
        }
        self.flavors = kept;

        let mut kept = Vec::new();
        for keypair in self.keypairs.drain(..) {
            match compute.delete_keypair(&keypair.name).await {
                Ok(()) => debug!(name = %keypair.name, "Deleted keypair"),
                Err(error) => {
                    warn!(name = %keypair.name, error = %error, "Failed to delete keypair");
                    failures.push(TeardownFailure {
                        resource: "keypair",
                        id: keypair.name.clone(),
                        error,
                    });
                    kept.push(keypair);
                }
            }
        }
        self.keypairs = kept;

        failures
    }
}

fn kind_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Cluster => "cluster",
        ResourceKind::ClusterTemplate => "cluster template",
        ResourceKind::NodeGroupTemplate => "node group template",
    }
}
