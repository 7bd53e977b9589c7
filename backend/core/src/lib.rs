pub mod compute;
pub mod error;
pub mod labels;
pub mod quota;
pub mod traits;
pub mod types;

pub use compute::{ComputeNode, Flavor, Instance};
pub use error::ReportError;
pub use labels::{project_label, unknown_tenant_label, unknown_user_label, user_label};
pub use quota::{Mismatch, ProjectUsage, QuotaCounter, ResourceKind};
pub use traits::{InventorySource, NameResolver, QuotaStore, RowSource};
pub use types::{Database, ResourceRecord, TableSpec, UsageTotal};
