//! `stackreport instances-by-user`: live instances grouped by owner.

use anyhow::Result;

use stackreport_core::{InventorySource, NameResolver, ReportError};
use stackreport_inventory::{build_inventory, sort_inventory, SortKey};

use crate::render;

pub async fn run(source: &dyn InventorySource, names: &dyn NameResolver, sort: SortKey, reverse: bool) -> Result<()> {
    print!("{}", build_report(source, names, sort, reverse).await?);
    Ok(())
}

pub async fn build_report(
    source: &dyn InventorySource,
    names: &dyn NameResolver,
    sort: SortKey,
    reverse: bool,
) -> Result<String, ReportError> {
    let instances = source.active_instances().await?;
    let mut groups = build_inventory(instances, names).await;
    sort_inventory(&mut groups, sort, reverse);
    Ok(render::inventory(&groups))
}
