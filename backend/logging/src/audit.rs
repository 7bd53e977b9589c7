//! Quota correction audit events.
//!
//! Every overwrite of a stored quota counter is announced before the write
//! and its outcome recorded afterwards, so a run can be traced and undone by
//! re-running the reconciliation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Target for audit events; route it separately with `RUST_LOG=quota_audit=info`.
pub const AUDIT_TARGET: &str = "quota_audit";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    CorrectionPlanned {
        counter_id: i64,
        project_id: String,
        resource: String,
        old_value: i64,
        new_value: i64,
    },
    CorrectionApplied {
        counter_id: i64,
        new_value: i64,
    },
    CorrectionFailed {
        counter_id: i64,
        error_msg: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

pub struct AuditLogger;

impl AuditLogger {
    /// Emit an audit event and hand the timestamped entry back to the caller.
    pub fn log_event(event: AuditEvent) -> AuditEntry {
        let entry = AuditEntry { timestamp: Utc::now(), event };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        match &entry.event {
            AuditEvent::CorrectionFailed { counter_id, error_msg } => {
                warn!(target: AUDIT_TARGET, counter_id, error = %error_msg, entry = %json, "Quota correction failed");
            }
            AuditEvent::CorrectionPlanned { counter_id, project_id, resource, old_value, new_value } => {
                info!(
                    target: AUDIT_TARGET,
                    counter_id,
                    project = %project_id,
                    kind = %resource,
                    old_value,
                    new_value,
                    entry = %json,
                    "Correcting quota counter"
                );
            }
            AuditEvent::CorrectionApplied { counter_id, new_value } => {
                info!(target: AUDIT_TARGET, counter_id, new_value, entry = %json, "Quota counter corrected");
            }
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_with_type_tag() {
        let entry = AuditLogger::log_event(AuditEvent::CorrectionPlanned {
            counter_id: 4,
            project_id: "p1".into(),
            resource: "cores".into(),
            old_value: 3,
            new_value: 5,
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "CorrectionPlanned");
        assert_eq!(json["event"]["old_value"], 3);
        assert_eq!(json["event"]["new_value"], 5);
    }
}
