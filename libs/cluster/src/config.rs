//! Harness configuration.

use std::time::Duration;

use ostf_poll::{DEFAULT_PORT_WAIT, DEFAULT_WORKER_ATTEMPTS};

/// Settings for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Plugin name; selects the variant table row.
    pub plugin_name: String,

    /// Hadoop version the plugin provisions.
    pub plugin_version: String,

    /// Name of the registered cluster image.
    pub image_name: String,

    /// Minutes to wait for a cluster to become Active.
    pub cluster_creation_timeout_minutes: u64,

    /// Label of the external network used for floating IPs under Neutron.
    pub floating_network_label: String,

    /// Label of the cluster management network under Neutron.
    pub management_network_label: String,

    pub keypair_prefix: String,
    pub cluster_prefix: String,
    pub flavor_prefix: String,

    pub flavor_ram_mb: u32,
    pub flavor_vcpus: u32,
    pub flavor_disk_gb: u32,

    /// Window for each required port to become reachable.
    pub port_wait: Duration,

    /// Worker activation attempts.
    pub worker_attempts: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            plugin_name: "vanilla".to_string(),
            plugin_version: "1.2.1".to_string(),
            image_name: "savanna".to_string(),
            cluster_creation_timeout_minutes: 90,
            floating_network_label: "net04_ext".to_string(),
            management_network_label: "net04".to_string(),
            keypair_prefix: "ostf_test-savanna-".to_string(),
            cluster_prefix: "ostf-cluster-".to_string(),
            flavor_prefix: "ostf-test-savanna-flavor-".to_string(),
            flavor_ram_mb: 700,
            flavor_vcpus: 1,
            flavor_disk_gb: 20,
            port_wait: DEFAULT_PORT_WAIT,
            worker_attempts: DEFAULT_WORKER_ATTEMPTS,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `OSTF_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            plugin_name: string("OSTF_SAHARA_PLUGIN", defaults.plugin_name),
            plugin_version: string("OSTF_SAHARA_PLUGIN_VERSION", defaults.plugin_version),
            image_name: string("OSTF_SAHARA_IMAGE", defaults.image_name),
            cluster_creation_timeout_minutes: number("OSTF_CLUSTER_CREATION_TIMEOUT")
                .unwrap_or(defaults.cluster_creation_timeout_minutes),
            floating_network_label: string(
                "OSTF_NEUTRON_FLOATING_NETWORK",
                defaults.floating_network_label,
            ),
            management_network_label: string(
                "OSTF_NEUTRON_MANAGEMENT_NETWORK",
                defaults.management_network_label,
            ),
            keypair_prefix: string("OSTF_KEYPAIR_PREFIX", defaults.keypair_prefix),
            cluster_prefix: string("OSTF_CLUSTER_PREFIX", defaults.cluster_prefix),
            flavor_prefix: string("OSTF_FLAVOR_PREFIX", defaults.flavor_prefix),
            flavor_ram_mb: number("OSTF_FLAVOR_RAM_MB")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.flavor_ram_mb),
            flavor_vcpus: number("OSTF_FLAVOR_VCPUS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.flavor_vcpus),
            flavor_disk_gb: number("OSTF_FLAVOR_DISK_GB")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.flavor_disk_gb),
            port_wait: number("OSTF_PORT_WAIT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.port_wait),
            worker_attempts: number("OSTF_WORKER_ATTEMPTS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.worker_attempts),
        }
    }
}
