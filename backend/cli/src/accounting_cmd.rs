//! `stackreport accounting`: walltime and volume usage per user.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use stackreport_core::{NameResolver, ReportError, RowSource, TableSpec};
use stackreport_usage::{accounting_rows, AccountingRow, UsageAggregator, UsageSummary};

use crate::render;

pub async fn run(source: &dyn RowSource, names: &dyn NameResolver, file: Option<PathBuf>) -> Result<()> {
    let aggregator = UsageAggregator::starting_now();
    let rows = collect_rows(source, names, &aggregator).await?;

    print!("{}", render::accounting_table(&rows));

    if let Some(path) = file {
        tokio::fs::write(&path, render::accounting_csv(&rows))
            .await
            .with_context(|| format!("Failed to write accounting file: {}", path.display()))?;
        info!(path = %path.display(), rows = rows.len(), "Accounting file written");
    }
    Ok(())
}

/// Reduce instances and volumes with one shared reference instant and join
/// the totals with the user directory.
pub async fn collect_rows(
    source: &dyn RowSource,
    names: &dyn NameResolver,
    aggregator: &UsageAggregator,
) -> Result<Vec<AccountingRow>, ReportError> {
    let (instances, volumes, users) = tokio::try_join!(
        source.fetch_records(&TableSpec::INSTANCES),
        source.fetch_records(&TableSpec::VOLUMES),
        names.list_users(),
    )?;

    let instance_usage = aggregator.reduce(&instances);
    let volume_usage = aggregator.reduce(&volumes);
    report_anomalies("instances", &instance_usage);
    report_anomalies("volumes", &volume_usage);

    Ok(accounting_rows(&users, &instance_usage, &volume_usage))
}

fn report_anomalies(table: &str, summary: &UsageSummary) {
    if !summary.anomalies.is_empty() {
        warn!(table, anomalies = summary.anomalies.len(), "Usage computed with data anomalies");
    }
}
