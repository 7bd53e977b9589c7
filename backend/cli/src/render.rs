//! Plain-text rendering of the reports.
//!
//! Every function returns the finished text; the commands decide whether it
//! goes to stdout, a file or a mail body.

use std::fmt::Write;

use stackreport_capacity::{ClusterTotals, FlavorCapacity, NodeSlots, SlotCount};
use stackreport_core::{ComputeNode, Flavor};
use stackreport_inventory::UserInstances;
use stackreport_usage::AccountingRow;

// ---------------------------------------------------------------------------
// Accounting table
// ---------------------------------------------------------------------------

/// Width of every rule line of the accounting table.
pub const ACCOUNTING_WIDTH: usize = 139;

fn rule(c: char) -> String {
    std::iter::repeat(c).take(ACCOUNTING_WIDTH).collect()
}

pub fn accounting_table(rows: &[AccountingRow]) -> String {
    let mut out = String::new();
    let dash = rule('-');

    let _ = writeln!(out, "{dash}");
    let _ = writeln!(out, "|{:^61}|{:^37}|{:^37}|", "User", "Instances", "Volumes");
    let _ = writeln!(out, "{dash}");
    let _ = writeln!(
        out,
        "|{:^25}|{:^35}|{:^10}|{:^10}|{:^15}|{:^10}|{:^10}|{:^15}|",
        "Name", "ID", "total", "active", "Walltime [h]", "total", "active", "GBh"
    );
    let _ = writeln!(out, "{}", rule('='));

    for row in rows {
        let _ = writeln!(
            out,
            "|{:25}|{:^35}|{:^10}|{:^10}|{:>15.4}|{:^10}|{:^10}|{:>15.4}|",
            row.name,
            row.user_id,
            row.instances.total_count,
            row.instances.active_count,
            row.instances.weighted_usage,
            row.volumes.total_count,
            row.volumes.active_count,
            row.volumes.weighted_usage,
        );
        let _ = writeln!(out, "{dash}");
    }
    out
}

/// Comma-separated form of the accounting rows, one line per user.
pub fn accounting_csv(rows: &[AccountingRow]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "{}, {}, {}, {}, {:.4}, {}, {}, {:.4}\n",
                row.name,
                row.user_id,
                row.instances.total_count,
                row.instances.active_count,
                row.instances.weighted_usage,
                row.volumes.total_count,
                row.volumes.active_count,
                row.volumes.weighted_usage,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Free usage
// ---------------------------------------------------------------------------

pub fn cluster_summary(totals: &ClusterTotals) -> String {
    format!(
        "{} compute nodes\n  vcpus total: {}\n  vcpus used:  {}\n  ram total:   {} mb\n  ram free:    {} mb\n  disk total:  {} gb\n  disk used:   {} gb\n\n",
        totals.nodes,
        totals.vcpus,
        totals.vcpus_used,
        totals.memory_mb,
        totals.free_ram_mb,
        totals.local_gb,
        totals.local_gb_used,
    )
}

pub fn negative_disk_warning(node: &ComputeNode) -> String {
    format!(
        "WARNING: node {}, disk total/used/free: {}/{}/{}\n",
        node.hypervisor_hostname,
        node.local_gb,
        node.local_gb_used,
        node.free_disk_gb()
    )
}

pub fn node_resources(node: &ComputeNode) -> String {
    format!(
        "DEBUG: node {}: free cpus: {}/{} free mem: {}/{}, free disk: {}/{}\n",
        node.hypervisor_hostname,
        node.free_vcpus(),
        node.vcpus,
        node.free_ram_mb,
        node.memory_mb,
        node.free_disk_gb(),
        node.local_gb
    )
}

fn slot(count: Option<i64>) -> String {
    count.map_or_else(|| "-".to_string(), |n| n.to_string())
}

pub fn node_slot_breakdown(slots: &NodeSlots) -> String {
    format!(
        "DEBUG: node {} cpu: {}/{}, mem: {}/{}, disk: {}/{}\n",
        slots.hypervisor_hostname,
        slot(slots.by_cpu),
        slot(slots.max_by_cpu),
        slot(slots.by_mem),
        slot(slots.max_by_mem),
        slot(slots.by_disk),
        slot(slots.max_by_disk)
    )
}

pub fn flavor_header(flavor: &Flavor) -> String {
    format!(
        "Flavor '{}'\n  vcpus:  {}\n  memory: {} mb\n  root disk: {} gb\n  ephemeral disk: {} gb\n",
        flavor.name, flavor.vcpus, flavor.memory_mb, flavor.root_gb, flavor.ephemeral_gb
    )
}

pub fn max_vms_line(count: SlotCount) -> String {
    format!("Max nr. of VMs: {} (total capacity: {})\n", count.free, count.max)
}

/// One `name : free/max` line per flavor, names padded to a common width.
pub fn capacity_lines(entries: &[FlavorCapacity]) -> String {
    let width = entries.iter().map(|e| e.flavor.name.chars().count()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| format!("{:<width$} : {:4}/{:4}\n", e.flavor.name, e.slots.free, e.slots.max))
        .collect()
}

// ---------------------------------------------------------------------------
// Instances by user
// ---------------------------------------------------------------------------

pub fn inventory(groups: &[UserInstances]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "{}", group.heading());
        for line in &group.instances {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }
    out
}
