//! Per-owner aggregation of resource lifetimes.
//!
//! Every record contributes `lifetime_hours × measure` resource-hours to its
//! owner. A deleted record lives from `created_at` to `deleted_at`; an active
//! one from `created_at` to the reference instant captured when the
//! aggregator is built. The reduction is order independent and partial
//! summaries merge by field-wise addition.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use stackreport_core::{ResourceRecord, UsageTotal};

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

/// A row-level data problem absorbed during reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    /// No usable measure; the record was counted with measure 0.
    MissingMeasure { owner_id: String },
    /// The lifetime end precedes `created_at`; its absolute value was used.
    NegativeLifetime {
        owner_id: String,
        created_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
}

/// Result of one reduction: per-owner totals plus absorbed anomalies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub totals: BTreeMap<String, UsageTotal>,
    pub anomalies: Vec<Anomaly>,
}

impl UsageSummary {
    pub fn get(&self, owner_id: &str) -> Option<&UsageTotal> {
        self.totals.get(owner_id)
    }

    /// Total for an owner, zero when the owner has no records.
    pub fn total_for(&self, owner_id: &str) -> UsageTotal {
        self.totals.get(owner_id).copied().unwrap_or_default()
    }

    /// Combine two partial summaries, e.g. from owner-partitioned inputs.
    pub fn merge(mut self, other: UsageSummary) -> UsageSummary {
        for (owner, total) in other.totals {
            *self.totals.entry(owner).or_default() += total;
        }
        self.anomalies.extend(other.anomalies);
        self
    }
}

/// Lifetime of a record in fractional hours, relative to `now` when active.
///
/// Returns the absolute value together with a flag telling whether the
/// signed lifetime was negative.
pub fn lifetime_hours(record: &ResourceRecord, now: DateTime<Utc>) -> (f64, bool) {
    let end = record.deleted_at.unwrap_or(now);
    let span = end - record.created_at;
    let hours = match span.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_HOUR,
        None => span.num_seconds() as f64 / 3600.0,
    };
    (hours.abs(), hours < 0.0)
}

/// Reduces resource records into per-owner usage totals.
#[derive(Debug, Clone, Copy)]
pub struct UsageAggregator {
    now: DateTime<Utc>,
}

impl UsageAggregator {
    /// Aggregator whose active records are measured up to `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Aggregator anchored at the current instant.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn reduce<'a, I>(&self, records: I) -> UsageSummary
    where
        I: IntoIterator<Item = &'a ResourceRecord>,
    {
        let mut summary = UsageSummary::default();
        for record in records {
            self.accumulate(&mut summary, record);
        }
        debug!(owners = summary.totals.len(), anomalies = summary.anomalies.len(), "Reduced usage records");
        summary
    }

    fn accumulate(&self, summary: &mut UsageSummary, record: &ResourceRecord) {
        let measure = match record.measure {
            Some(m) if m.is_finite() => m,
            _ => {
                warn!(owner = %record.owner_id, "Record has no usable measure; counting it as 0");
                summary.anomalies.push(Anomaly::MissingMeasure { owner_id: record.owner_id.clone() });
                0.0
            }
        };

        let (hours, negative) = lifetime_hours(record, self.now);
        if negative {
            let ended_at = record.deleted_at.unwrap_or(self.now);
            warn!(
                owner = %record.owner_id,
                created_at = %record.created_at,
                ended_at = %ended_at,
                "Record ends before it was created; using absolute lifetime"
            );
            summary.anomalies.push(Anomaly::NegativeLifetime {
                owner_id: record.owner_id.clone(),
                created_at: record.created_at,
                ended_at,
            });
        }

        let total = summary.totals.entry(record.owner_id.clone()).or_default();
        total.weighted_usage += hours * measure;
        total.total_count += 1;
        if record.is_active() {
            total.active_count += 1;
        }
    }
}

/// Reduce `records` with every active record measured up to `now`.
pub fn reduce(records: &[ResourceRecord], now: DateTime<Utc>) -> BTreeMap<String, UsageTotal> {
    UsageAggregator::new(now).reduce(records).totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample() -> Vec<ResourceRecord> {
        let t = now();
        vec![
            ResourceRecord::new("alice", t - Duration::hours(10), 4.0).deleted(t - Duration::hours(8)),
            ResourceRecord::new("alice", t - Duration::hours(3), 2.0),
            ResourceRecord::new("bob", t - Duration::minutes(90), 1.0),
            ResourceRecord::new("bob", t - Duration::hours(48), 8.0).deleted(t - Duration::hours(24)),
            ResourceRecord::new("carol", t - Duration::hours(1), 0.0),
        ]
    }

    #[test]
    fn test_deleted_record_contribution() {
        let t = now();
        let records = vec![ResourceRecord::new("u", t, 4.0).deleted(t + Duration::hours(2))];
        let totals = reduce(&records, t + Duration::hours(100));
        let total = totals["u"];
        assert!((total.weighted_usage - 8.0).abs() < 1e-9);
        assert_eq!(total.active_count, 0);
        assert_eq!(total.total_count, 1);
    }

    #[test]
    fn test_active_record_uses_now() {
        let t = now();
        let records = vec![ResourceRecord::new("u", t - Duration::hours(3), 2.0)];
        let total = reduce(&records, t)["u"];
        assert!((total.weighted_usage - 6.0).abs() < 1e-9);
        assert_eq!(total.active_count, 1);
        assert_eq!(total.total_count, 1);
    }

    #[test]
    fn test_zero_measure_still_counts() {
        let totals = reduce(&sample(), now());
        let carol = totals["carol"];
        assert_eq!(carol.weighted_usage, 0.0);
        assert_eq!(carol.active_count, 1);
        assert_eq!(carol.total_count, 1);
    }

    #[test]
    fn test_sample_totals() {
        let totals = reduce(&sample(), now());
        let alice = totals["alice"];
        assert!((alice.weighted_usage - 14.0).abs() < 1e-9);
        assert_eq!((alice.active_count, alice.total_count), (1, 2));

        let bob = totals["bob"];
        assert!((bob.weighted_usage - 193.5).abs() < 1e-9);
        assert_eq!((bob.active_count, bob.total_count), (1, 2));
    }

    #[test]
    fn test_permutation_invariance() {
        let records = sample();
        let forward = reduce(&records, now());

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(reduce(&reversed, now()), forward);

        let mut rotated = records;
        rotated.rotate_left(2);
        let rotated = reduce(&rotated, now());
        for (owner, total) in &forward {
            let other = rotated[owner];
            assert!((other.weighted_usage - total.weighted_usage).abs() < 1e-9);
            assert_eq!(other.active_count, total.active_count);
            assert_eq!(other.total_count, total.total_count);
        }
    }

    #[test]
    fn test_partitioned_merge_matches_single_pass() {
        let records = sample();
        let aggregator = UsageAggregator::new(now());
        let single = aggregator.reduce(&records);

        let (left, right): (Vec<_>, Vec<_>) =
            records.iter().cloned().partition(|r| r.owner_id.as_str() < "bob");
        let merged = aggregator.reduce(&left).merge(aggregator.reduce(&right));
        assert_eq!(merged, single);
    }

    #[test]
    fn test_merge_adds_overlapping_owners() {
        let records = sample();
        let aggregator = UsageAggregator::new(now());
        let (first, second) = records.split_at(2);
        let merged = aggregator.reduce(first).merge(aggregator.reduce(second));
        let single = aggregator.reduce(&records);
        for (owner, total) in &single.totals {
            let m = merged.total_for(owner);
            assert!((m.weighted_usage - total.weighted_usage).abs() < 1e-9);
            assert_eq!(m.active_count, total.active_count);
            assert_eq!(m.total_count, total.total_count);
        }
    }

    #[test]
    fn test_missing_measure_counts_as_zero() {
        let t = now();
        let mut record = ResourceRecord::new("dave", t - Duration::hours(5), 1.0);
        record.measure = None;
        let summary = UsageAggregator::new(t).reduce(&[record]);
        let total = summary.total_for("dave");
        assert_eq!(total.weighted_usage, 0.0);
        assert_eq!(total.total_count, 1);
        assert_eq!(summary.anomalies, vec![Anomaly::MissingMeasure { owner_id: "dave".into() }]);
    }

    #[test]
    fn test_negative_lifetime_is_absolute_and_flagged() {
        let t = now();
        let record = ResourceRecord::new("eve", t, 3.0).deleted(t - Duration::hours(2));
        let summary = UsageAggregator::new(t).reduce(&[record]);
        assert!((summary.total_for("eve").weighted_usage - 6.0).abs() < 1e-9);
        assert!(matches!(summary.anomalies[0], Anomaly::NegativeLifetime { .. }));
    }

    #[test]
    fn test_fractional_hours() {
        let t = now();
        let record = ResourceRecord::new("u", t - Duration::minutes(45), 1.0);
        let (hours, negative) = lifetime_hours(&record, t);
        assert!((hours - 0.75).abs() < 1e-9);
        assert!(!negative);
    }

    #[test]
    fn test_unknown_owner_is_kept() {
        let records = vec![ResourceRecord::new("no-such-user", now(), 1.0)];
        let summary = UsageAggregator::new(now()).reduce(&records);
        assert!(summary.get("no-such-user").is_some());
    }
}
