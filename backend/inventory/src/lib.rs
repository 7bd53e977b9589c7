pub mod grouping;
pub mod sort;

pub use grouping::{build_inventory, group_by_user, InstanceLine, UserInstances};
pub use sort::{sort_by_key_extractor, sort_inventory, SortKey};
