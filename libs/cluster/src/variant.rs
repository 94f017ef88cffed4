//! Plugin variants.
//!
//! Plugins name the same Hadoop daemons with different tokens (`namenode`
//! vs `NAMENODE`) and log in with different users. Each variant is a row in
//! a [`VariantTable`] rather than a branch in the pollers.

use std::collections::BTreeMap;

use crate::error::ClusterError;

/// Hadoop daemon roles the harness knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    JobTracker,
    NameNode,
    TaskTracker,
    DataNode,
    SecondaryNameNode,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::JobTracker,
        Role::NameNode,
        Role::TaskTracker,
        Role::DataNode,
        Role::SecondaryNameNode,
    ];

    /// Well-known web UI port of the daemon.
    pub fn port(self) -> u16 {
        match self {
            Self::JobTracker => 50030,
            Self::NameNode => 50070,
            Self::TaskTracker => 50060,
            Self::DataNode => 50075,
            Self::SecondaryNameNode => 50090,
        }
    }
}

/// SSH port probed on every instance before any role port.
pub const SSH_PORT: u16 = 22;

/// One plugin's role tokens and login users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginVariant {
    name: String,
    tokens: BTreeMap<String, Role>,
    hadoop_user: String,
    node_username: String,
}

impl PluginVariant {
    /// Build a variant from `(token, role)` pairs.
    pub fn new<I, S>(
        name: impl Into<String>,
        tokens: I,
        hadoop_user: impl Into<String>,
        node_username: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (S, Role)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tokens: tokens.into_iter().map(|(t, r)| (t.into(), r)).collect(),
            hadoop_user: hadoop_user.into(),
            node_username: node_username.into(),
        }
    }

    /// Apache Hadoop plugin (lower-case tokens).
    pub fn vanilla() -> Self {
        Self::new(
            "vanilla",
            [
                ("jobtracker", Role::JobTracker),
                ("namenode", Role::NameNode),
                ("tasktracker", Role::TaskTracker),
                ("datanode", Role::DataNode),
                ("secondarynamenode", Role::SecondaryNameNode),
            ],
            "hadoop",
            "ubuntu",
        )
    }

    /// Hortonworks plugin (upper-case tokens).
    pub fn hdp() -> Self {
        Self::new(
            "hdp",
            [
                ("JOBTRACKER", Role::JobTracker),
                ("NAMENODE", Role::NameNode),
                ("TASKTRACKER", Role::TaskTracker),
                ("DATANODE", Role::DataNode),
                ("SECONDARY_NAMENODE", Role::SecondaryNameNode),
            ],
            "hdfs",
            "root",
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// User the Hadoop CLI runs as.
    pub fn hadoop_user(&self) -> &str {
        &self.hadoop_user
    }

    /// User for SSH logins to cluster instances.
    pub fn node_username(&self) -> &str {
        &self.node_username
    }

    /// Role for a process token, if the token is known.
    pub fn role(&self, token: &str) -> Option<Role> {
        self.tokens.get(token).copied()
    }

    /// Token this variant uses for a role.
    pub fn token(&self, role: Role) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(t, _)| t.as_str())
    }

    /// Known roles among `processes`, in process order.
    pub fn roles_of<S: AsRef<str>>(&self, processes: &[S]) -> Vec<Role> {
        processes
            .iter()
            .filter_map(|p| self.role(p.as_ref()))
            .collect()
    }

    /// True if `processes` contains this variant's token for `role`.
    pub fn has_role<S: AsRef<str>>(&self, processes: &[S], role: Role) -> bool {
        processes.iter().any(|p| self.role(p.as_ref()) == Some(role))
    }
}

/// Variants keyed by plugin name.
#[derive(Debug, Clone)]
pub struct VariantTable {
    variants: BTreeMap<String, PluginVariant>,
}

impl VariantTable {
    /// Empty table.
    pub fn empty() -> Self {
        Self {
            variants: BTreeMap::new(),
        }
    }

    /// Add or replace a variant.
    pub fn insert(&mut self, variant: PluginVariant) {
        self.variants.insert(variant.name.clone(), variant);
    }

    /// Look up a variant by plugin name.
    pub fn get(&self, plugin: &str) -> Result<&PluginVariant, ClusterError> {
        self.variants
            .get(plugin)
            .ok_or_else(|| ClusterError::UnknownVariant(plugin.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

impl Default for VariantTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(PluginVariant::vanilla());
        table.insert(PluginVariant::hdp());
        table
    }
}
