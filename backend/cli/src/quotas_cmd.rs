//! `stackreport test-quotas`: compare stored quota usage with live instances.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{info, warn};

use stackreport_config::MailSettings;
use stackreport_core::{InventorySource, NameResolver, QuotaStore, ReportError};
use stackreport_usage::{apply_corrections, reconcile, resolve_project_labels, tally_projects};

use crate::mail;

pub async fn run<S>(store: &S, update_usages: bool, send_mail: Option<&MailSettings>) -> Result<()>
where
    S: InventorySource + QuotaStore + NameResolver,
{
    let lines = check_quotas(store, store, store, update_usages).await?;
    let body = lines.join("\n");

    match send_mail {
        Some(settings) if lines.is_empty() => {
            info!(to = ?settings.to, "No quota mismatches; nothing to mail");
        }
        Some(settings) => mail::send_report(settings, &body).await?,
        None if body.is_empty() => {}
        None => println!("{body}"),
    }
    Ok(())
}

/// Report lines: one per mismatch, each followed by its correction line
/// when `update_usages` is set.
pub async fn check_quotas(
    inventory: &dyn InventorySource,
    quotas: &dyn QuotaStore,
    names: &dyn NameResolver,
    update_usages: bool,
) -> Result<Vec<String>, ReportError> {
    let (instances, stored) = tokio::try_join!(inventory.active_instances(), quotas.stored_counters())?;
    let computed = tally_projects(&instances);
    let labels = resolve_project_labels(names, stored.iter().map(|c| &c.project_id)).await;
    let mismatches = reconcile(&computed, &stored, &labels);
    info!(
        projects = computed.len(),
        counters = stored.len(),
        mismatches = mismatches.len(),
        "Quota usage checked"
    );

    if !update_usages {
        return Ok(mismatches.iter().map(ToString::to_string).collect());
    }

    let report = apply_corrections(quotas, &mismatches).await;
    let failures: BTreeMap<i64, &ReportError> = report.failed.iter().map(|(m, e)| (m.counter_id, e)).collect();

    let mut lines = Vec::with_capacity(mismatches.len() * 2);
    for (mismatch, correction) in mismatches.iter().zip(&report.log) {
        lines.push(mismatch.to_string());
        lines.push(correction.clone());
        if let Some(err) = failures.get(&mismatch.counter_id) {
            lines.push(format!("  update of id=={} failed: {err}", mismatch.counter_id));
        }
    }
    if !report.is_clean() {
        warn!(failed = report.failed.len(), "Some quota counters keep stale values");
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackreport_core::Database;
    use stackreport_store::SqliteStore;

    async fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .execute_batch(
                Database::Nova,
                "INSERT INTO instances (user_id, project_id, hostname, vcpus, memory_mb, vm_state, created_at, deleted)
                     VALUES ('u1', 'p1', 'a', 2, 4096, 'active', '2013-05-29 10:00:00', 0),
                            ('u1', 'p1', 'b', 3, 4096, 'active', '2013-05-29 10:00:00', 0),
                            ('u1', 'p1', 'c', 8, 8192, 'deleted', '2013-05-29 10:00:00', 1);
                 INSERT INTO quota_usages (id, project_id, resource, in_use)
                     VALUES (1, 'p1', 'instances', 2), (2, 'p1', 'cores', 3), (3, 'p1', 'ram', 8192),
                            (4, 'p1', 'floating_ips', 7), (5, 'p2', 'instances', 1);",
            )
            .await
            .unwrap();
        store
            .execute_batch(Database::Keystone, "INSERT INTO project (id, name) VALUES ('p1', 'physics');")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn reports_mismatches_without_writing() {
        let store = store().await;
        let lines = check_quotas(&store, &store, &store, false).await.unwrap();
        assert_eq!(
            lines,
            vec![
                "CPU count mismatch on project physics: reported usage: 3, actual usage: 5",
                "Instances count mismatch on project UNKNOWN_TENANT_p2: reported usage: 1, actual usage: 0",
            ]
        );
        assert_eq!(check_quotas(&store, &store, &store, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_rewrites_counters_and_logs() {
        let store = store().await;
        let lines = check_quotas(&store, &store, &store, true).await.unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "  updating `quota_usages` table: set `in_use` to 5 where id==2");
        assert_eq!(lines[3], "  updating `quota_usages` table: set `in_use` to 0 where id==5");

        assert!(check_quotas(&store, &store, &store, false).await.unwrap().is_empty());
    }
}
