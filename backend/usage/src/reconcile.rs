//! Quota counter reconciliation.
//!
//! Stored `in_use` counters drift from reality. Live usage is tallied from
//! the non-deleted instances and every tracked counter is compared with it
//! exactly. Corrections are a separate, explicit step.

use std::collections::BTreeMap;

use tracing::{info, warn};

use stackreport_core::{
    project_label, unknown_tenant_label, Instance, Mismatch, NameResolver, ProjectUsage,
    QuotaCounter, QuotaStore, ReportError,
};
use stackreport_logging::{AuditEvent, AuditLogger};

/// Name of the table holding the stored counters, used in correction logs.
pub const QUOTA_TABLE: &str = "quota_usages";

/// Live usage per project: instance count, vCPUs and RAM in MB.
pub fn tally_projects(instances: &[Instance]) -> BTreeMap<String, ProjectUsage> {
    let mut usage: BTreeMap<String, ProjectUsage> = BTreeMap::new();
    for vm in instances {
        let entry = usage
            .entry(vm.project_id.clone())
            .or_insert_with(|| ProjectUsage::empty(vm.project_id.clone()));
        entry.instances += 1;
        entry.cores += vm.vcpus;
        entry.ram += vm.memory_mb;
    }
    usage
}

/// Display labels for every project id, with `UNKNOWN_TENANT_<id>` fallbacks.
pub async fn resolve_project_labels<'a, I>(resolver: &dyn NameResolver, project_ids: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut labels = BTreeMap::new();
    for id in project_ids {
        if !labels.contains_key(id) {
            labels.insert(id.clone(), project_label(resolver, id).await);
        }
    }
    labels
}

/// Compare stored counters against computed usage.
///
/// Counters of untracked resources are ignored. A project that has counters
/// but no live instances is compared against zero usage.
pub fn reconcile(
    computed: &BTreeMap<String, ProjectUsage>,
    stored: &[QuotaCounter],
    labels: &BTreeMap<String, String>,
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    for counter in stored {
        let Some(kind) = counter.kind() else { continue };
        let computed_value = computed
            .get(&counter.project_id)
            .map(|usage| usage.value(kind))
            .unwrap_or(0);
        if computed_value == counter.in_use {
            continue;
        }

        let project = labels
            .get(&counter.project_id)
            .cloned()
            .unwrap_or_else(|| unknown_tenant_label(&counter.project_id));
        mismatches.push(Mismatch {
            counter_id: counter.id,
            project_id: counter.project_id.clone(),
            project,
            kind,
            stored_value: counter.in_use,
            computed_value,
        });
    }
    mismatches
}

/// Outcome of applying corrections.
#[derive(Debug, Default)]
pub struct CorrectionReport {
    /// Report lines, one per attempted correction, written before each write.
    pub log: Vec<String>,
    pub applied: Vec<Mismatch>,
    pub failed: Vec<(Mismatch, ReportError)>,
}

impl CorrectionReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Overwrite each mismatched counter with its computed value.
///
/// Every write is logged before it is issued and only lands while the counter
/// still holds the value it was compared with. A failed write is recorded and
/// the remaining corrections still run.
pub async fn apply_corrections(store: &dyn QuotaStore, mismatches: &[Mismatch]) -> CorrectionReport {
    let mut report = CorrectionReport::default();

    for mismatch in mismatches {
        report.log.push(format!(
            "  updating `{QUOTA_TABLE}` table: set `in_use` to {} where id=={}",
            mismatch.computed_value, mismatch.counter_id
        ));
        AuditLogger::log_event(AuditEvent::CorrectionPlanned {
            counter_id: mismatch.counter_id,
            project_id: mismatch.project_id.clone(),
            resource: mismatch.kind.to_string(),
            old_value: mismatch.stored_value,
            new_value: mismatch.computed_value,
        });

        match store
            .overwrite_counter(mismatch.counter_id, mismatch.stored_value, mismatch.computed_value)
            .await
         {
            Ok(()) => {
                AuditLogger::log_event(AuditEvent::CorrectionApplied {
                    counter_id: mismatch.counter_id,
                    new_value: mismatch.computed_value,
                });
                report.applied.push(mismatch.clone());
            }
            Err(e) => {
                AuditLogger::log_event(AuditEvent::CorrectionFailed {
                    counter_id: mismatch.counter_id,
                    error_msg: e.to_string(),
                });
                report.failed.push((mismatch.clone(), e));
            }
        }
    }

    if report.is_clean() {
        info!(applied = report.applied.len(), "Quota corrections applied");
    } else {
        warn!(applied = report.applied.len(), failed = report.failed.len(), "Some quota corrections failed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use stackreport_core::ResourceKind;
    use stackreport_logging::AUDIT_TARGET;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
    use tracing_subscriber::Layer;

    struct MemoryQuotas {
        counters: Mutex<Vec<QuotaCounter>>,
        broken: Vec<i64>,
    }

    impl MemoryQuotas {
        fn new(counters: Vec<QuotaCounter>) -> Self {
            Self { counters: Mutex::new(counters), broken: Vec::new() }
        }

        fn in_use(&self, id: i64) -> i64 {
            self.counters.lock().unwrap().iter().find(|c| c.id == id).unwrap().in_use
        }
    }

    #[async_trait]
    impl QuotaStore for MemoryQuotas {
        async fn stored_counters(&self) -> Result<Vec<QuotaCounter>, ReportError> {
            Ok(self.counters.lock().unwrap().clone())
        }

        async fn overwrite_counter(&self, counter_id: i64, expected: i64, in_use: i64) -> Result<(), ReportError> {
            if self.broken.contains(&counter_id) {
                return Err(ReportError::CounterWriteFailed {
                    counter_id,
                    message: "read-only".into(),
                });
            }
            let mut counters = self.counters.lock().unwrap();
            match counters.iter_mut().find(|c| c.id == counter_id) {
                Some(c) if c.in_use == expected => {
                    c.in_use = in_use;
                    Ok(())
                }
                Some(_) => Err(ReportError::CounterWriteFailed {
                    counter_id,
                    message: "counter changed since read".into(),
                }),
                None => Err(ReportError::CounterWriteFailed {
                    counter_id,
                    message: "no such counter".into(),
                }),
            }
        }
    }

    /// Collects `(message, counter_id)` of every audit event.
    #[derive(Clone, Default)]
    struct AuditCapture(Arc<Mutex<Vec<(String, i64)>>>);

    impl AuditCapture {
        fn events(&self) -> Vec<(String, i64)> {
            self.0.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct AuditFields {
        message: String,
        counter_id: i64,
    }

    impl Visit for AuditFields {
        fn record_i64(&mut self, field: &Field, value: i64) {
            if field.name() == "counter_id" {
                self.counter_id = value;
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.message = format!("{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for AuditCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            if event.metadata().target() != AUDIT_TARGET {
                return;
            }
            let mut fields = AuditFields::default();
            event.record(&mut fields);
            self.0.lock().unwrap().push((fields.message, fields.counter_id));
        }
    }

    /// Quota store that checks, at write time, what has been announced.
    struct WatchedQuotas {
        inner: MemoryQuotas,
        audit: AuditCapture,
        writes: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl QuotaStore for WatchedQuotas {
        async fn stored_counters(&self) -> Result<Vec<QuotaCounter>, ReportError> {
            self.inner.stored_counters().await
        }

        async fn overwrite_counter(&self, counter_id: i64, expected: i64, in_use: i64) -> Result<(), ReportError> {
            // The announcement of this very write is the latest audit event.
            assert_eq!(
                self.audit.events().last(),
                Some(&("Correcting quota counter".to_string(), counter_id)),
                "write to counter {counter_id} was not announced first"
            );
            self.writes.lock().unwrap().push(counter_id);
            self.inner.overwrite_counter(counter_id, expected, in_use).await
        }
    }

    struct NoNames;

    #[async_trait]
    impl NameResolver for NoNames {
        async fn list_users(&self) -> Result<Vec<(String, String)>, ReportError> {
            Ok(Vec::new())
        }

        async fn user_name(&self, user_id: &str) -> Result<String, ReportError> {
            Err(ReportError::NameNotFound(user_id.into()))
        }

        async fn project_name(&self, project_id: &str) -> Result<String, ReportError> {
            match project_id {
                "p1" => Ok("physics".into()),
                other => Err(ReportError::NameNotFound(other.into())),
            }
        }
    }

    fn counter(id: i64, project: &str, resource: &str, in_use: i64) -> QuotaCounter {
        QuotaCounter { id, project_id: project.into(), resource: resource.into(), in_use }
    }

    fn vm(project: &str, vcpus: i64, memory_mb: i64) -> Instance {
        Instance {
            user_id: "u1".into(),
            project_id: project.into(),
            hostname: "vm".into(),
            host: None,
            vcpus,
            memory_mb,
            flavor_name: None,
            vm_state: "active".into(),
            created_at: Utc::now(),
        }
    }

    fn computed(instances: i64) -> BTreeMap<String, ProjectUsage> {
        let mut map = BTreeMap::new();
        map.insert(
            "p1".to_string(),
            ProjectUsage { project_id: "p1".into(), instances, cores: 0, ram: 0 },
        );
        map
    }

    #[test]
    fn test_tally_projects() {
        let usage = tally_projects(&[vm("p1", 2, 2048), vm("p1", 4, 4096), vm("p2", 1, 512)]);
        assert_eq!(
            usage["p1"],
            ProjectUsage { project_id: "p1".into(), instances: 2, cores: 6, ram: 6144 }
        );
        assert_eq!(usage["p2"].instances, 1);
    }

    #[test]
    fn test_matching_counter_has_no_mismatch() {
        let stored = vec![counter(1, "p1", "instances", 5)];
        assert!(reconcile(&computed(5), &stored, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_drifted_counter_is_reported() {
        let stored = vec![counter(1, "p1", "instances", 3)];
        let labels = BTreeMap::from([("p1".to_string(), "physics".to_string())]);
        let mismatches = reconcile(&computed(5), &stored, &labels);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].stored_value, 3);
        assert_eq!(mismatches[0].computed_value, 5);
        assert_eq!(mismatches[0].kind, ResourceKind::Instances);
        assert_eq!(mismatches[0].project, "physics");
    }

    #[test]
    fn test_untracked_resources_are_ignored() {
        let stored = vec![counter(1, "p1", "floating_ips", 99), counter(2, "p1", "cores", 0)];
        assert!(reconcile(&computed(5), &stored, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_project_without_instances_compares_against_zero() {
        let stored = vec![counter(9, "gone", "ram", 2048)];
        let mismatches = reconcile(&BTreeMap::new(), &stored, &BTreeMap::new());
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].computed_value, 0);
        assert_eq!(mismatches[0].project, "UNKNOWN_TENANT_gone");
    }

    #[tokio::test]
    async fn test_labels_fall_back_for_unknown_projects() {
        let ids = vec!["p1".to_string(), "p2".to_string(), "p1".to_string()];
        let labels = resolve_project_labels(&NoNames, &ids).await;
        assert_eq!(labels["p1"], "physics");
        assert_eq!(labels["p2"], "UNKNOWN_TENANT_p2");
    }

    #[tokio::test]
    async fn test_correction_overwrites_and_logs() {
        let store = MemoryQuotas::new(vec![counter(1, "p1", "instances", 3)]);
        let stored = store.stored_counters().await.unwrap();
        let mismatches = reconcile(&computed(5), &stored, &BTreeMap::new());

        let report = apply_corrections(&store, &mismatches).await;
        assert!(report.is_clean());
        assert_eq!(report.applied.len(), 1);
        assert_eq!(store.in_use(1), 5);
        assert_eq!(
            report.log,
            vec!["  updating `quota_usages` table: set `in_use` to 5 where id==1".to_string()]
        );

        let stored = store.stored_counters().await.unwrap();
        assert!(reconcile(&computed(5), &stored, &BTreeMap::new()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_batch() {
        let mut store = MemoryQuotas::new(vec![counter(1, "p1", "instances", 3), counter(2, "p1", "cores", 1)]);
        store.broken.push(1);
        let usage = BTreeMap::from([(
            "p1".to_string(),
            ProjectUsage { project_id: "p1".into(), instances: 5, cores: 8, ram: 0 },
        )]);
        let stored = store.stored_counters().await.unwrap();
        let mismatches = reconcile(&usage, &stored, &BTreeMap::new());
        assert_eq!(mismatches.len(), 2);

        let report = apply_corrections(&store, &mismatches).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.counter_id, 1);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(store.in_use(1), 3);
        assert_eq!(store.in_use(2), 8);
        assert_eq!(report.log.len(), 2);
    }

    #[tokio::test]
    async fn test_counter_moved_since_read_is_not_overwritten() {
        let store = MemoryQuotas::new(vec![counter(1, "p1", "instances", 3)]);
        let stored = store.stored_counters().await.unwrap();
        let mismatches = reconcile(&computed(5), &stored, &BTreeMap::new());

        // Another writer bumps the counter between the read and the correction.
        store.counters.lock().unwrap()[0].in_use = 4;

        let report = apply_corrections(&store, &mismatches).await;
        assert!(report.applied.is_empty());
        assert!(matches!(
            &report.failed[0].1,
            ReportError::CounterWriteFailed { counter_id: 1, message } if message == "counter changed since read"
        ));
        assert_eq!(store.in_use(1), 4);
    }

    #[tokio::test]
    async fn test_each_write_is_announced_and_logged_first() {
        let audit = AuditCapture::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(audit.clone()));

        let store = WatchedQuotas {
            inner: MemoryQuotas::new(vec![counter(1, "p1", "instances", 3), counter(2, "p1", "cores", 1)]),
            audit: audit.clone(),
            writes: Mutex::new(Vec::new()),
        };
        let usage = BTreeMap::from([(
            "p1".to_string(),
            ProjectUsage { project_id: "p1".into(), instances: 5, cores: 8, ram: 0 },
        )]);
        let stored = store.stored_counters().await.unwrap();
        let mismatches = reconcile(&usage, &stored, &BTreeMap::new());

        let report = apply_corrections(&store, &mismatches).await;
        assert!(report.is_clean());
        assert_eq!(*store.writes.lock().unwrap(), vec![1, 2]);
        assert_eq!(report.log.len(), 2);
        assert_eq!(
            audit.events(),
            vec![
                ("Correcting quota counter".to_string(), 1),
                ("Quota counter corrected".to_string(), 1),
                ("Correcting quota counter".to_string(), 2),
                ("Quota counter corrected".to_string(), 2),
            ]
        );
    }
}
