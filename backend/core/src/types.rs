use std::fmt;
use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The service databases a report reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    /// Compute service: instances, flavors, compute nodes, quota usages.
    Nova,
    /// Block storage service: volumes.
    Cinder,
    /// Identity service: users and tenants.
    Keystone,
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Database::Nova => write!(f, "nova"),
            Database::Cinder => write!(f, "cinder"),
            Database::Keystone => write!(f, "keystone"),
        }
    }
}

/// Column mapping for a table of billable resources.
///
/// A row source selects exactly these four columns and maps each row into a
/// [`ResourceRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub database: Database,
    pub table: &'static str,
    pub owner_column: &'static str,
    pub created_column: &'static str,
    pub deleted_column: &'static str,
    pub measure_column: &'static str,
}

impl TableSpec {
    /// Instances, measured in vCPUs.
    pub const INSTANCES: TableSpec = TableSpec {
        database: Database::Nova,
        table: "instances",
        owner_column: "user_id",
        created_column: "created_at",
        deleted_column: "deleted_at",
        measure_column: "vcpus",
    };

    /// Volumes, measured in GB.
    pub const VOLUMES: TableSpec = TableSpec {
        database: Database::Cinder,
        table: "volumes",
        owner_column: "user_id",
        created_column: "created_at",
        deleted_column: "deleted_at",
        measure_column: "size",
    };
}

/// One instance or volume as seen by the usage aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// `None` while the resource is still alive.
    pub deleted_at: Option<DateTime<Utc>>,
    /// vCPUs or GB. `None` when the source row had no usable value.
    pub measure: Option<f64>,
}

impl ResourceRecord {
    pub fn new(owner_id: impl Into<String>, created_at: DateTime<Utc>, measure: f64) -> Self {
        Self {
            owner_id: owner_id.into(),
            created_at,
            deleted_at: None,
            measure: Some(measure),
        }
    }

    pub fn deleted(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Per-owner usage: resource-hours plus resource counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotal {
    pub weighted_usage: f64,
    pub active_count: u64,
    pub total_count: u64,
}

impl UsageTotal {
    /// Field-wise sum of two partial totals.
    pub fn merge(self, other: UsageTotal) -> UsageTotal {
        UsageTotal {
            weighted_usage: self.weighted_usage + other.weighted_usage,
            active_count: self.active_count + other.active_count,
            total_count: self.total_count + other.total_count,
        }
    }
}

impl AddAssign for UsageTotal {
    fn add_assign(&mut self, other: UsageTotal) {
        *self = self.merge(other);
    }
}
