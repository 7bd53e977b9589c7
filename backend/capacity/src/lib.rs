pub mod slots;

pub use slots::{
    cluster_totals, count_free_slots, node_slots, select_flavors, sort_nodes, ClusterTotals,
    FlavorCapacity, NodeSlots, SlotCount,
};
