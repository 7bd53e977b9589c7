//! `stackreport free-usage`: how many more instances of each flavor fit.

use anyhow::Result;
use tracing::debug;

use stackreport_capacity::{
    cluster_totals, count_free_slots, node_slots, select_flavors, sort_nodes, FlavorCapacity,
};
use stackreport_core::{Flavor, InventorySource, ReportError};

use crate::render;

/// Options of one free-usage run.
#[derive(Debug, Clone, Default)]
pub struct FreeUsageOptions {
    pub verbose: u8,
    /// Restrict the report to these flavor names.
    pub flavors: Vec<String>,
    /// Additional hypothetical flavor.
    pub simulated: Option<Flavor>,
}

pub async fn run(source: &dyn InventorySource, opts: &FreeUsageOptions) -> Result<()> {
    print!("{}", build_report(source, opts).await?);
    Ok(())
}

pub async fn build_report(source: &dyn InventorySource, opts: &FreeUsageOptions) -> Result<String, ReportError> {
    let (mut nodes, catalogue) = tokio::try_join!(source.compute_nodes(), source.flavors())?;
    sort_nodes(&mut nodes);
    let flavors = select_flavors(catalogue, &opts.flavors, opts.simulated.clone());
    debug!(nodes = nodes.len(), flavors = flavors.len(), "Computing free slots");

    let mut out = String::new();
    if opts.verbose > 0 {
        out.push_str(&render::cluster_summary(&cluster_totals(&nodes)));
    }
    for node in &nodes {
        if opts.verbose > 0 && node.free_disk_gb() < 0 {
            out.push_str(&render::negative_disk_warning(node));
        }
        if opts.verbose > 2 {
            out.push_str(&render::node_resources(node));
        }
    }

    let capacity: Vec<FlavorCapacity> = flavors
        .into_iter()
        .map(|flavor| {
            let slots = count_free_slots(&nodes, &flavor);
            FlavorCapacity { flavor, slots }
        })
        .collect();

    if opts.verbose > 1 {
        for entry in &capacity {
            out.push_str(&render::flavor_header(&entry.flavor));
            if opts.verbose > 3 {
                for node in &nodes {
                    out.push_str(&render::node_slot_breakdown(&node_slots(node, &entry.flavor)));
                }
            }
            out.push_str(&render::max_vms_line(entry.slots));
            out.push('\n');
        }
    }

    out.push_str(&render::capacity_lines(&capacity));
    Ok(out)
}
