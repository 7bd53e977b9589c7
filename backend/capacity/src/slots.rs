//! How many more instances of each flavor fit on the enabled compute nodes.
//!
//! A node fits `min(cpu, memory, disk)` instances of a flavor, each dimension
//! computed with flooring integer division. Only nodes with a positive count
//! contribute to the cluster figure. A flavor dimension of zero does not
//! constrain placement.

use serde::Serialize;
use tracing::warn;

use stackreport_core::{ComputeNode, Flavor};

/// Free and total instance slots for one flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotCount {
    /// Instances that still fit given current allocation.
    pub free: i64,
    /// Instances that would fit on empty nodes.
    pub max: i64,
}

/// Per-dimension breakdown for one node and flavor. `None` means the flavor
/// does not use that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSlots {
    pub hypervisor_hostname: String,
    pub by_cpu: Option<i64>,
    pub max_by_cpu: Option<i64>,
    pub by_mem: Option<i64>,
    pub max_by_mem: Option<i64>,
    pub by_disk: Option<i64>,
    pub max_by_disk: Option<i64>,
}

impl NodeSlots {
    pub fn free(&self) -> i64 {
        min_defined([self.by_cpu, self.by_mem, self.by_disk])
    }

    pub fn max(&self) -> i64 {
        min_defined([self.max_by_cpu, self.max_by_mem, self.max_by_disk])
    }
}

/// A flavor paired with its slot count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlavorCapacity {
    pub flavor: Flavor,
    pub slots: SlotCount,
}

/// Sums over all enabled nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterTotals {
    pub nodes: usize,
    pub vcpus: i64,
    pub vcpus_used: i64,
    pub memory_mb: i64,
    pub free_ram_mb: i64,
    pub local_gb: i64,
    pub local_gb_used: i64,
}

fn fits(available: i64, required: i64) -> Option<i64> {
    (required > 0).then(|| available.div_euclid(required))
}

fn min_defined(counts: [Option<i64>; 3]) -> i64 {
    counts.into_iter().flatten().min().unwrap_or(0)
}

pub fn node_slots(node: &ComputeNode, flavor: &Flavor) -> NodeSlots {
    NodeSlots {
        hypervisor_hostname: node.hypervisor_hostname.clone(),
        by_cpu: fits(node.free_vcpus(), flavor.vcpus),
        max_by_cpu: fits(node.vcpus, flavor.vcpus),
        by_mem: fits(node.free_ram_mb, flavor.memory_mb),
        max_by_mem: fits(node.memory_mb, flavor.memory_mb),
        by_disk: fits(node.free_disk_gb(), flavor.disk_gb()),
        max_by_disk: fits(node.local_gb, flavor.disk_gb()),
    }
}

pub fn count_free_slots(nodes: &[ComputeNode], flavor: &Flavor) -> SlotCount {
    if flavor.vcpus <= 0 && flavor.memory_mb <= 0 && flavor.disk_gb() <= 0 {
        warn!(flavor = %flavor.name, "Flavor requests no resources; reporting zero slots");
        return SlotCount::default();
    }

    nodes.iter().map(|node| node_slots(node, flavor)).fold(SlotCount::default(), |mut acc, slots| {
        let (free, max) = (slots.free(), slots.max());
        if free > 0 {
            acc.free += free;
        }
        if max > 0 {
            acc.max += max;
        }
        acc
    })
}

pub fn cluster_totals(nodes: &[ComputeNode]) -> ClusterTotals {
    nodes.iter().fold(
        ClusterTotals { nodes: nodes.len(), ..Default::default() },
        |mut acc, node| {
            acc.vcpus += node.vcpus;
            acc.vcpus_used += node.vcpus_used;
            acc.memory_mb += node.memory_mb;
            acc.free_ram_mb += node.free_ram_mb;
            acc.local_gb += node.local_gb;
            acc.local_gb_used += node.local_gb_used;
            acc
        },
    )
}

pub fn sort_nodes(nodes: &mut [ComputeNode]) {
    nodes.sort_by(|a, b| a.hypervisor_hostname.cmp(&b.hypervisor_hostname));
}

/// Flavors to report on: the catalogue plus an optional simulated flavor,
/// restricted to `names` when non-empty, ordered by vCPUs then memory.
pub fn select_flavors(mut flavors: Vec<Flavor>, names: &[String], simulated: Option<Flavor>) -> Vec<Flavor> {
    flavors.extend(simulated);
    if !names.is_empty() {
        flavors.retain(|f| names.contains(&f.name));
    }
    flavors.sort_by_key(|f| (f.vcpus, f.memory_mb));
    flavors
}
