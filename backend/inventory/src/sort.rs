use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grouping::UserInstances;

/// Ordering of the per-user instance listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Vms,
    Cpus,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "vms" => Ok(SortKey::Vms),
            "cpus" => Ok(SortKey::Cpus),
            other => Err(format!("unknown sort key '{other}'. Use 'name', 'vms', or 'cpus'")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Name => write!(f, "name"),
            SortKey::Vms => write!(f, "vms"),
            SortKey::Cpus => write!(f, "cpus"),
        }
    }
}

/// Stable sort by an extracted key, optionally descending.
pub fn sort_by_key_extractor<T, K, F>(items: &mut [T], key: F, reverse: bool)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    if reverse {
        items.sort_by(|a, b| key(b).cmp(&key(a)));
    } else {
        items.sort_by(|a, b| key(a).cmp(&key(b)));
    }
}

pub fn sort_inventory(groups: &mut [UserInstances], key: SortKey, reverse: bool) {
    match key {
        SortKey::Name => sort_by_key_extractor(groups, |g| g.name.clone(), reverse),
        SortKey::Vms => sort_by_key_extractor(groups, UserInstances::vm_count, reverse),
        SortKey::Cpus => sort_by_key_extractor(groups, UserInstances::vcpu_count, reverse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_key() {
        assert_eq!("cpus".parse::<SortKey>(), Ok(SortKey::Cpus));
        assert!("memory".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default().to_string(), "name");
    }

    #[test]
    fn test_extractor_sort_is_stable() {
        let mut items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        sort_by_key_extractor(&mut items, |i| i.0, false);
        assert_eq!(items, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);

        sort_by_key_extractor(&mut items, |i| i.0, true);
        assert_eq!(items, vec![(2, 'a'), (2, 'c'), (1, 'b'), (1, 'd')]);
    }
}
