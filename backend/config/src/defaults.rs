//! Config defaults: applies default values to a parsed config.

use crate::schema::{AccountingConfig, DatabaseConfig, LoggingConfig, MailConfig, ReportConfig};

pub const DEFAULT_NOVA_DB: &str = "nova.db";
pub const DEFAULT_CINDER_DB: &str = "cinder.db";
pub const DEFAULT_KEYSTONE_DB: &str = "keystone.db";

pub const DEFAULT_ACCOUNTING_FILE: &str = "/tmp/OS_accounting.txt";

pub const DEFAULT_MAIL_FROM: &str = "stackreport@localhost";
pub const DEFAULT_MAIL_SUBJECT: &str = "OpenStack quota usage check";
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ReportConfig) -> ReportConfig {
    let config = apply_database_defaults(config);
    let config = apply_accounting_defaults(config);
    let config = apply_mail_defaults(config);
    apply_logging_defaults(config)
}

fn apply_database_defaults(mut config: ReportConfig) -> ReportConfig {
    let db = config.database.get_or_insert_with(DatabaseConfig::default);
    db.nova.get_or_insert_with(|| DEFAULT_NOVA_DB.to_string());
    db.cinder.get_or_insert_with(|| DEFAULT_CINDER_DB.to_string());
    db.keystone.get_or_insert_with(|| DEFAULT_KEYSTONE_DB.to_string());
    config
}

fn apply_accounting_defaults(mut config: ReportConfig) -> ReportConfig {
    let accounting = config.accounting.get_or_insert_with(AccountingConfig::default);
    if accounting.output_file.is_none() {
        accounting.output_file = Some(DEFAULT_ACCOUNTING_FILE.to_string());
    }
    config
}

/// Only fills in a mail section the user started; no recipients are invented.
fn apply_mail_defaults(mut config: ReportConfig) -> ReportConfig {
    if let Some(mail) = &mut config.mail {
        mail.from.get_or_insert_with(|| DEFAULT_MAIL_FROM.to_string());
        mail.subject.get_or_insert_with(|| DEFAULT_MAIL_SUBJECT.to_string());
        mail.sendmail.get_or_insert_with(|| DEFAULT_SENDMAIL.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: ReportConfig) -> ReportConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
