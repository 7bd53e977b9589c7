use async_trait::async_trait;

use crate::compute::{ComputeNode, Flavor, Instance};
use crate::error::ReportError;
use crate::quota::QuotaCounter;
use crate::types::{ResourceRecord, TableSpec};

/// Supplies billable resource rows for aggregation.
///
/// Implementations must return every row of the table; the aggregation is
/// only deterministic over the full set.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_records(&self, table: &TableSpec) -> Result<Vec<ResourceRecord>, ReportError>;
}

/// Maps user and project ids to display names.
///
/// Lookups may fail per id; callers fall back to placeholder labels.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// All known users as `(id, name)` pairs.
    async fn list_users(&self) -> Result<Vec<(String, String)>, ReportError>;

    async fn user_name(&self, user_id: &str) -> Result<String, ReportError>;

    async fn project_name(&self, project_id: &str) -> Result<String, ReportError>;
}

/// Stored quota usage counters.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// All non-deleted counters.
    async fn stored_counters(&self) -> Result<Vec<QuotaCounter>, ReportError>;

    /// Set `in_use` of a single counter, but only while it still holds
    /// `expected`. A counter that moved since it was read is left alone and
    /// reported as [`ReportError::CounterWriteFailed`].
    async fn overwrite_counter(&self, counter_id: i64, expected: i64, in_use: i64) -> Result<(), ReportError>;
}

/// Live inventory of the compute service.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Non-deleted instances.
    async fn active_instances(&self) -> Result<Vec<Instance>, ReportError>;

    /// Compute nodes whose service is enabled.
    async fn compute_nodes(&self) -> Result<Vec<ComputeNode>, ReportError>;

    /// Non-deleted flavors.
    async fn flavors(&self) -> Result<Vec<Flavor>, ReportError>;
}
