use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hypervisor's capacity and current allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeNode {
    pub hypervisor_hostname: String,
    pub vcpus: i64,
    pub vcpus_used: i64,
    pub memory_mb: i64,
    pub free_ram_mb: i64,
    pub local_gb: i64,
    pub local_gb_used: i64,
}

impl ComputeNode {
    pub fn free_vcpus(&self) -> i64 {
        self.vcpus - self.vcpus_used
    }

    /// May be negative when the disk is overcommitted.
    pub fn free_disk_gb(&self) -> i64 {
        self.local_gb - self.local_gb_used
    }
}

/// An instance type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub name: String,
    pub vcpus: i64,
    pub memory_mb: i64,
    pub root_gb: i64,
    pub ephemeral_gb: i64,
}

impl Flavor {
    pub fn disk_gb(&self) -> i64 {
        self.root_gb + self.ephemeral_gb
    }
}

/// A live (non-deleted) virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub user_id: String,
    pub project_id: String,
    pub hostname: String,
    pub host: Option<String>,
    pub vcpus: i64,
    pub memory_mb: i64,
    pub flavor_name: Option<String>,
    pub vm_state: String,
    pub created_at: DateTime<Utc>,
}
