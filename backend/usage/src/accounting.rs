use std::collections::HashSet;

use serde::Serialize;

use stackreport_core::{unknown_user_label, UsageTotal};

use crate::aggregator::UsageSummary;

/// One line of the accounting report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountingRow {
    pub name: String,
    pub user_id: String,
    /// Walltime in vCPU-hours.
    pub instances: UsageTotal,
    /// Volume usage in GB-hours.
    pub volumes: UsageTotal,
}

/// Join the user directory with instance and volume usage.
///
/// Users keep their directory order. Owners that only appear in usage rows
/// follow, sorted by id and labelled `UNKNOWN_<id>`.
pub fn accounting_rows(
    users: &[(String, String)],
    instances: &UsageSummary,
    volumes: &UsageSummary,
) -> Vec<AccountingRow> {
    let known: HashSet<&str> = users.iter().map(|(id, _)| id.as_str()).collect();

    let mut rows: Vec<AccountingRow> = users
        .iter()
        .map(|(id, name)| AccountingRow {
            name: name.clone(),
            user_id: id.clone(),
            instances: instances.total_for(id),
            volumes: volumes.total_for(id),
        })
        .collect();

    let mut orphans: Vec<&String> = instances
        .totals
        .keys()
        .chain(volumes.totals.keys())
        .filter(|id| !known.contains(id.as_str()))
        .collect();
    orphans.sort();
    orphans.dedup();

    rows.extend(orphans.into_iter().map(|id| AccountingRow {
        name: unknown_user_label(id),
        user_id: id.clone(),
        instances: instances.total_for(id),
        volumes: volumes.total_for(id),
    }));

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::UsageAggregator;
    use chrono::{Duration, TimeZone, Utc};
    use stackreport_core::ResourceRecord;

    #[test]
    fn test_rows_follow_directory_then_orphans() {
        let now = Utc.with_ymd_and_hms(2013, 6, 1, 0, 0, 0).unwrap();
        let aggregator = UsageAggregator::new(now);
        let instances = aggregator.reduce(&[
            ResourceRecord::new("u2", now - Duration::hours(1), 2.0),
            ResourceRecord::new("zz", now - Duration::hours(1), 1.0),
        ]);
        let volumes = aggregator.reduce(&[ResourceRecord::new("aa", now - Duration::hours(2), 10.0)]);

        let users = vec![("u2".to_string(), "bob".to_string()), ("u1".to_string(), "alice".to_string())];
        let rows = accounting_rows(&users, &instances, &volumes);

        let ids: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u1", "aa", "zz"]);
        assert_eq!(rows[0].instances.active_count, 1);
        assert_eq!(rows[1].instances, UsageTotal::default());
        assert_eq!(rows[2].name, "UNKNOWN_aa");
        assert!((rows[2].volumes.weighted_usage - 20.0).abs() < 1e-9);
    }
}
