//! Config validation with field paths in every message.

use crate::schema::ReportConfig;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All validation errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

pub fn validate(config: &ReportConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_database(config, &mut report);
    validate_accounting(config, &mut report);
    validate_mail(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_database(config: &ReportConfig, report: &mut ValidationReport) {
    let Some(db) = &config.database else { return };
    for (name, path) in [("nova", &db.nova), ("cinder", &db.cinder), ("keystone", &db.keystone)] {
        if path.as_deref().is_some_and(|p| p.trim().is_empty()) {
            report.error(format!("database.{name}"), "Database path cannot be empty");
        }
    }
}

fn validate_accounting(config: &ReportConfig, report: &mut ValidationReport) {
    let Some(accounting) = &config.accounting else { return };
    if accounting.output_file.as_deref().is_some_and(|p| p.trim().is_empty()) {
        report.error("accounting.outputFile", "Output file path cannot be empty");
    }
}

fn validate_mail(config: &ReportConfig, report: &mut ValidationReport) {
    let Some(mail) = &config.mail else { return };
    if mail.to.is_empty() {
        report.warn("mail.to", "No recipients configured; --send-mail will fail");
    }
    for (i, rcpt) in mail.to.iter().enumerate() {
        if !rcpt.contains('@') {
            report.error(format!("mail.to[{i}]"), format!("'{rcpt}' is not a mail address"));
        }
    }
    if let Some(from) = &mail.from {
        if !from.contains('@') {
            report.warn("mail.from", format!("'{from}' is not a mail address"));
        }
    }
}

fn validate_logging(config: &ReportConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.warn(
                "logging.level",
                format!("Unknown level '{level}'; it will be read as a filter directive"),
            );
        }
    }
}
