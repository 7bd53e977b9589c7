//! Structured logging for the stackreport binaries.
//!
//! Console output goes to stderr so that report text on stdout stays clean.
//! Quota corrections are additionally recorded as audit events.

pub mod audit;
pub mod logger;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AUDIT_TARGET};
pub use logger::init_logger;
