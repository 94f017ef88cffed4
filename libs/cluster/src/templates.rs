//! Node group and cluster template definitions used by the sanity checks.

use serde_json::{json, Value};

use crate::config::HarnessConfig;
use crate::orchestrator::{ClusterTemplateRequest, NodeGroupSpec, NodeGroupTemplateRequest};

const TEMPLATE_DESCRIPTION: &str = "test node group template";
const CLUSTER_TEMPLATE_DESCRIPTION: &str = "test cluster template";

fn tasktracker_config() -> Value {
    json!({ "Task Tracker Heap Size": 515 })
}

fn datanode_config() -> Value {
    json!({ "Data Node Heap Size": 513 })
}

fn namenode_config() -> Value {
    json!({ "Name Node Heap Size": 512 })
}

fn secondary_namenode_config() -> Value {
    json!({ "Name Node Heap Size": 510 })
}

fn jobtracker_config() -> Value {
    json!({ "Job Tracker Heap Size": 514 })
}

/// Cluster-wide HDFS, MapReduce and general settings.
pub fn cluster_configs() -> Value {
    json!({
        "HDFS": { "dfs.replication": 2 },
        "MapReduce": {
            "mapred.map.tasks.speculative.execution": false,
            "mapred.child.java.opts": "-Xmx100m"
        },
        "general": { "Enable Swift": true }
    })
}

/// Worker node group templates the full cluster template references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerTemplate {
    TaskTrackerDataNode,
    TaskTracker,
    DataNode,
}

impl WorkerTemplate {
    fn name_prefix(self) -> &'static str {
        match self {
            Self::TaskTrackerDataNode => "ostf-test-savanna-tt-dn-",
            Self::TaskTracker => "ostf-test-savanna-tt-",
            Self::DataNode => "ostf-test-savanna-dn-",
        }
    }

    fn processes(self) -> Vec<String> {
        let processes: &[&str] = match self {
            Self::TaskTrackerDataNode => &["tasktracker", "datanode"],
            Self::TaskTracker => &["tasktracker"],
            Self::DataNode => &["datanode"],
        };
        processes.iter().map(|p| p.to_string()).collect()
    }

    fn configs(self) -> Value {
        match self {
            Self::TaskTrackerDataNode => json!({
                "HDFS": datanode_config(),
                "MapReduce": tasktracker_config()
            }),
            Self::TaskTracker | Self::DataNode => json!({ "MapReduce": tasktracker_config() }),
        }
    }

    fn volume_size(self) -> u32 {
        match self {
            Self::TaskTrackerDataNode => 1,
            Self::TaskTracker | Self::DataNode => 0,
        }
    }

    /// Build the create request.
    pub fn request(
        self,
        config: &HarnessConfig,
        name_suffix: &str,
        flavor_id: &str,
        floating_ip_pool: Option<String>,
    ) -> NodeGroupTemplateRequest {
        NodeGroupTemplateRequest {
            name: format!("{}{}", self.name_prefix(), name_suffix),
            plugin_name: config.plugin_name.clone(),
            hadoop_version: config.plugin_version.clone(),
            flavor_id: flavor_id.to_string(),
            description: TEMPLATE_DESCRIPTION.to_string(),
            volumes_per_node: 0,
            volumes_size: self.volume_size(),
            node_processes: self.processes(),
            node_configs: self.configs(),
            floating_ip_pool: floating_ip_pool.filter(|p| !p.is_empty()),
        }
    }
}

fn master_group(name: &str, flavor_id: &str, floating_ip_pool: Option<String>) -> NodeGroupSpec {
    NodeGroupSpec {
        name: name.to_string(),
        flavor_id: Some(flavor_id.to_string()),
        node_processes: vec!["namenode".to_string(), "jobtracker".to_string()],
        node_configs: json!({ "HDFS": namenode_config(), "MapReduce": jobtracker_config() }),
        node_group_template_id: None,
        floating_ip_pool: floating_ip_pool.filter(|p| !p.is_empty()),
        count: 1,
    }
}

fn template_group(name: &str, template_id: &str, count: u32) -> NodeGroupSpec {
    NodeGroupSpec {
        name: name.to_string(),
        flavor_id: None,
        node_processes: Vec::new(),
        node_configs: Value::Null,
        node_group_template_id: Some(template_id.to_string()),
        floating_ip_pool: None,
        count,
    }
}

/// Ids of the worker node group templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTemplateIds {
    pub tasktracker_datanode: String,
    pub datanode: String,
    pub tasktracker: String,
}

/// Five-group cluster: master (jt+nn), secondary namenode, and three worker groups.
pub fn cluster_template(
    config: &HarnessConfig,
    name_suffix: &str,
    flavor_id: &str,
    workers: &WorkerTemplateIds,
) -> ClusterTemplateRequest {
    ClusterTemplateRequest {
        name: format!("ostf-test-savanna-cluster-template-{name_suffix}"),
        plugin_name: config.plugin_name.clone(),
        hadoop_version: config.plugin_version.clone(),
        description: CLUSTER_TEMPLATE_DESCRIPTION.to_string(),
        cluster_configs: cluster_configs(),
        node_groups: vec![
            master_group("ostf-test-master-node-jt-nn", flavor_id, None),
            NodeGroupSpec {
                name: "ostf-test-master-node-sec-nn".to_string(),
                flavor_id: Some(flavor_id.to_string()),
                node_processes: vec!["secondarynamenode".to_string()],
                node_configs: json!({ "HDFS": secondary_namenode_config() }),
                node_group_template_id: None,
                floating_ip_pool: None,
                count: 1,
            },
            template_group("ostf-test-worker-node-tt-dn", &workers.tasktracker_datanode, 2),
            template_group("ostf-test-worker-node-dn", &workers.datanode, 1),
            template_group("ostf-test-worker-node-tt", &workers.tasktracker, 1),
        ],
        anti_affinity: Vec::new(),
    }
}

/// Two-group cluster: one master and one tasktracker+datanode worker.
pub fn tiny_cluster_template(
    config: &HarnessConfig,
    name_suffix: &str,
    flavor_id: &str,
    worker_template_id: &str,
    floating_ip_pool: Option<String>,
) -> ClusterTemplateRequest {
    ClusterTemplateRequest {
        name: format!("ostf-savanna-cl-tmpl-{name_suffix}"),
        plugin_name: config.plugin_name.clone(),
        hadoop_version: config.plugin_version.clone(),
        description: CLUSTER_TEMPLATE_DESCRIPTION.to_string(),
        cluster_configs: cluster_configs(),
        node_groups: vec![
            master_group("ostf-test-master", flavor_id, floating_ip_pool),
            template_group("ostf-test-worker", worker_template_id, 1),
        ],
        anti_affinity: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_template_request() {
        let config = HarnessConfig::default();
        let req = WorkerTemplate::TaskTrackerDataNode.request(&config, "abc", "fl-1", None);
        assert_eq!(req.name, "ostf-test-savanna-tt-dn-abc");
        assert_eq!(req.node_processes, vec!["tasktracker", "datanode"]);
        assert_eq!(req.volumes_size, 1);
        assert_eq!(req.node_configs["HDFS"]["Data Node Heap Size"], 513);
    }

    #[test]
    fn test_empty_floating_pool_is_dropped() {
        let config = HarnessConfig::default();
        let req = WorkerTemplate::DataNode.request(&config, "x", "fl-1", Some(String::new()));
        assert_eq!(req.floating_ip_pool, None);

        let tiny = tiny_cluster_template(&config, "x", "fl-1", "ngt-1", Some(String::new()));
        let json = serde_json::to_value(&tiny).unwrap();
        assert!(json["node_groups"][0].get("floating_ip_pool").is_none());
    }

    #[test]
    fn test_full_cluster_template_shape() {
        let config = HarnessConfig::default();
        let workers = WorkerTemplateIds {
            tasktracker_datanode: "ngt-ttdn".to_string(),
            datanode: "ngt-dn".to_string(),
            tasktracker: "ngt-tt".to_string(),
        };
        let req = cluster_template(&config, "x", "fl-1", &workers);
        let counts: Vec<u32> = req.node_groups.iter().map(|g| g.count).collect();
        assert_eq!(counts, vec![1, 1, 2, 1, 1]);
        assert_eq!(
            req.node_groups[2].node_group_template_id.as_deref(),
            Some("ngt-ttdn")
        );
        assert_eq!(req.cluster_configs["HDFS"]["dfs.replication"], 2);
    }
}
