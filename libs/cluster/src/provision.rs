//! Cluster provisioning flow.
//!
//! Creates the resources a sanity check needs, records each one in the
//! run's [`ProvisioningContext`], and drives a new cluster through
//! readiness, topology resolution and worker activation.

use ostf_poll::{TickBudget, WORKER_POLL_INTERVAL};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::context::{name_suffix, rand_name, ProvisioningContext};
use crate::error::ClusterError;
use crate::model::ClusterInfo;
use crate::network::{detect_network_mode, NetworkMode};
use crate::orchestrator::{
    ClusterRequest, ClusterTemplateRequest, Compute, FlavorSpec, Image, NodeGroupTemplateRequest,
    Orchestrator, ResourceKind, ResourceSummary,
};
use crate::readiness::await_cluster_ready;
use crate::shell::RemoteShell;
use crate::templates::{self, WorkerTemplate, WorkerTemplateIds};
use crate::topology::resolve_node_info;
use crate::variant::VariantTable;
use crate::workers::await_workers_active;

/// Drives the collaborators through one provisioning run.
pub struct Provisioner<'a> {
    orchestrator: &'a dyn Orchestrator,
    compute: &'a dyn Compute,
    shell: &'a dyn RemoteShell,
    config: HarnessConfig,
    variants: VariantTable,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        orchestrator: &'a dyn Orchestrator,
        compute: &'a dyn Compute,
        shell: &'a dyn RemoteShell,
        config: HarnessConfig,
    ) -> Self {
        Self {
            orchestrator,
            compute,
            shell,
            config,
            variants: VariantTable::default(),
        }
    }

    /// Replace the plugin variant table.
    pub fn with_variants(mut self, variants: VariantTable) -> Self {
        self.variants = variants;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Create the run's flavor unless one already exists.
    pub async fn ensure_flavor(&self, ctx: &mut ProvisioningContext) -> Result<String, ClusterError> {
        if let Some(id) = ctx.flavor() {
            return Ok(id.to_string());
        }

        let spec = FlavorSpec {
            name: rand_name(&self.config.flavor_prefix),
            ram_mb: self.config.flavor_ram_mb,
            vcpus: self.config.flavor_vcpus,
            disk_gb: self.config.flavor_disk_gb,
        };
        let id = self.compute.create_flavor(&spec).await?;
        info!(flavor_id = %id, name = %spec.name, "Created flavor");
        ctx.record_flavor(id.clone());
        Ok(id)
    }

    /// True when the configured image carries the plugin tags and a username.
    pub async fn image_is_registered(&self) -> Result<bool, ClusterError> {
        let version_tag = format!("_sahara_tag_{}", self.config.plugin_version);
        let plugin_tag = format!("_sahara_tag_{}", self.config.plugin_name);
        debug!(plugin_tag = %plugin_tag, version_tag = %version_tag, "Testing image");

        let registered = self
            .compute
            .list_images()
            .await?
            .iter()
            .filter(|image| image.name == self.config.image_name)
            .any(|image| {
                let tagged = |tag: &str| image.metadata.get(tag).map(String::as_str) == Some("True");
                tagged(&version_tag)
                    && tagged(&plugin_tag)
                    && image.metadata.contains_key("_sahara_username")
            });

        debug!(registered, image = %self.config.image_name, "Image check finished");
        Ok(registered)
    }

    async fn find_image(&self) -> Result<Image, ClusterError> {
        self.compute
            .list_images()
            .await?
            .into_iter()
            .find(|image| image.name == self.config.image_name)
            .ok_or_else(|| ClusterError::NotFound {
                kind: "image",
                name: self.config.image_name.clone(),
            })
    }

    pub async fn network_mode(&self) -> Result<NetworkMode, ClusterError> {
        detect_network_mode(self.shell, self.compute, &self.config).await
    }

    pub async fn create_node_group_template(
        &self,
        ctx: &mut ProvisioningContext,
        request: &NodeGroupTemplateRequest,
    ) -> Result<String, ClusterError> {
        let id = self.orchestrator.create_node_group_template(request).await?;
        info!(template_id = %id, name = %request.name, "Created node group template");
        ctx.record_node_group_template(id.clone());
        Ok(id)
    }

    /// Create one of the standard worker templates, with a floating IP pool
    /// unless the cloud assigns floating IPs automatically.
    pub async fn create_worker_template(
        &self,
        ctx: &mut ProvisioningContext,
        template: WorkerTemplate,
    ) -> Result<String, ClusterError> {
        let mode = self.network_mode().await?;
        if matches!(mode, NetworkMode::NovaAutoAssign) {
            debug!(?template, "Creating node group template without floating ip");
        } else {
            debug!(?template, "Creating node group template with floating ip");
        }

        let flavor_id = self.ensure_flavor(ctx).await?;
        let request =
            template.request(&self.config, &name_suffix(), &flavor_id, mode.floating_ip_pool());
        self.create_node_group_template(ctx, &request).await
    }

    pub async fn create_cluster_template(
        &self,
        ctx: &mut ProvisioningContext,
        request: &ClusterTemplateRequest,
    ) -> Result<String, ClusterError> {
        let id = self.orchestrator.create_cluster_template(request).await?;
        info!(template_id = %id, name = %request.name, "Created cluster template");
        ctx.record_cluster_template(id.clone());
        Ok(id)
    }

    /// Create the three worker templates and the five-group cluster template.
    pub async fn create_full_cluster_template(
        &self,
        ctx: &mut ProvisioningContext,
    ) -> Result<String, ClusterError> {
        let workers = WorkerTemplateIds {
            tasktracker_datanode: self
                .create_worker_template(ctx, WorkerTemplate::TaskTrackerDataNode)
                .await?,
            tasktracker: self
                .create_worker_template(ctx, WorkerTemplate::TaskTracker)
                .await?,
            datanode: self
                .create_worker_template(ctx, WorkerTemplate::DataNode)
                .await?,
        };
        let flavor_id = self.ensure_flavor(ctx).await?;
        let request = templates::cluster_template(&self.config, &name_suffix(), &flavor_id, &workers);
        self.create_cluster_template(ctx, &request).await
    }

    /// Create a tasktracker+datanode worker template and the two-group
    /// cluster template on top of it.
    pub async fn create_tiny_cluster_template(
        &self,
        ctx: &mut ProvisioningContext,
    ) -> Result<String, ClusterError> {
        let worker = self
            .create_worker_template(ctx, WorkerTemplate::TaskTrackerDataNode)
            .await?;
        let mode = self.network_mode().await?;
        let flavor_id = self.ensure_flavor(ctx).await?;
        let request = templates::tiny_cluster_template(
            &self.config,
            &name_suffix(),
            &flavor_id,
            &worker,
            mode.floating_ip_pool(),
        );
        self.create_cluster_template(ctx, &request).await
    }

    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>, ClusterError> {
        Ok(self.orchestrator.list(kind).await?)
    }

    /// Create a cluster from a template, wait for it to converge and return
    /// its layout.
    pub async fn create_cluster_and_get_info(
        &self,
        ctx: &mut ProvisioningContext,
        cluster_template_id: &str,
        management_network: Option<String>,
    ) -> Result<ClusterInfo, ClusterError> {
        let variant = self.variants.get(&self.config.plugin_name)?;

        let keypair = self
            .compute
            .create_keypair(&rand_name(&self.config.keypair_prefix))
            .await?;
        let key_name = keypair.name.clone();
        let private_key = keypair.private_key.clone();
        ctx.record_keypair(keypair);

        let image = self.find_image().await?;

        let request = ClusterRequest {
            name: rand_name(&self.config.cluster_prefix),
            plugin_name: self.config.plugin_name.clone(),
            hadoop_version: self.config.plugin_version.clone(),
            cluster_template_id: cluster_template_id.to_string(),
            default_image_id: image.id,
            description: "test cluster".to_string(),
            cluster_configs: serde_json::json!({}),
            node_groups: None,
            user_keypair_id: key_name,
            anti_affinity: Vec::new(),
            net_id: management_network,
        };
        let cluster_id = self.orchestrator.create_cluster(&request).await?;
        info!(cluster_id = %cluster_id, name = %request.name, "Created cluster");
        ctx.record_cluster(cluster_id.clone());

        await_cluster_ready(
            self.orchestrator,
            &cluster_id,
            self.config.cluster_creation_timeout_minutes,
        )
        .await?;

        let topology = resolve_node_info(
            self.orchestrator,
            self.shell,
            &cluster_id,
            variant,
            self.config.port_wait,
        )
        .await?;

        await_workers_active(
            self.shell,
            &topology.node_info,
            variant,
            &private_key,
            TickBudget::fixed(self.config.worker_attempts, WORKER_POLL_INTERVAL),
        )
        .await?;

        Ok(ClusterInfo {
            cluster_id,
            node_ips: topology.node_ips,
            node_info: topology.node_info,
        })
    }

    /// Resolve the network mode, pick the management network under Neutron,
    /// and create the cluster.
    pub async fn create_sahara_cluster(
        &self,
        ctx: &mut ProvisioningContext,
        cluster_template_id: &str,
    ) -> Result<ClusterInfo, ClusterError> {
        let mode = self.network_mode().await?;
        debug!(?mode, "Network type resolved");

        let management_network = if mode.is_neutron() {
            let id = self
                .compute
                .find_network(&self.config.management_network_label)
                .await?
                .ok_or_else(|| ClusterError::NotFound {
                    kind: "network",
                    name: self.config.management_network_label.clone(),
                })?;
            debug!(network_id = %id, "Creating cluster for neutron network");
            Some(id)
        } else {
            None
        };

        self.create_cluster_and_get_info(ctx, cluster_template_id, management_network)
            .await
    }
}
