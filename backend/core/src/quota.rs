use std::fmt;

use serde::{Deserialize, Serialize};

/// Quota resource kinds that are reconciled against live usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instances,
    Cores,
    Ram,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Instances, ResourceKind::Cores, ResourceKind::Ram];

    /// Value of the `resource` column in `quota_usages`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Instances => "instances",
            ResourceKind::Cores => "cores",
            ResourceKind::Ram => "ram",
        }
    }

    /// Parse a `resource` column value. Untracked resources yield `None`.
    pub fn parse(resource: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == resource)
    }

    /// Label used in mismatch reports.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Instances => "Instances",
            ResourceKind::Cores => "CPU",
            ResourceKind::Ram => "RAM",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored usage counter from the `quota_usages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounter {
    pub id: i64,
    pub project_id: String,
    pub resource: String,
    pub in_use: i64,
}

impl QuotaCounter {
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::parse(&self.resource)
    }
}

/// Live usage of one project, computed from its non-deleted instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUsage {
    pub project_id: String,
    pub instances: i64,
    pub cores: i64,
    pub ram: i64,
}

impl ProjectUsage {
    pub fn empty(project_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), ..Default::default() }
    }

    pub fn value(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Instances => self.instances,
            ResourceKind::Cores => self.cores,
            ResourceKind::Ram => self.ram,
        }
    }
}

/// A stored counter that disagrees with the computed usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub counter_id: i64,
    pub project_id: String,
    /// Display name of the project, or a placeholder.
    pub project: String,
    pub kind: ResourceKind,
    pub stored_value: i64,
    pub computed_value: i64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} count mismatch on project {}: reported usage: {}, actual usage: {}",
            self.kind.label(),
            self.project,
            self.stored_value,
            self.computed_value
        )
    }
}
