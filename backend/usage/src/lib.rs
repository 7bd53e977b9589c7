//! Usage accounting for the cloud reports.
//!
//! `aggregator` turns instance and volume lifetimes into per-owner
//! resource-hours, `accounting` joins those totals with the user directory,
//! and `reconcile` compares live usage with the stored quota counters.

pub mod accounting;
pub mod aggregator;
pub mod reconcile;

pub use accounting::{accounting_rows, AccountingRow};
pub use aggregator::{lifetime_hours, reduce, Anomaly, UsageAggregator, UsageSummary};
pub use reconcile::{
    apply_corrections, reconcile, resolve_project_labels, tally_projects, CorrectionReport,
};
