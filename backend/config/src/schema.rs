//! stackreport configuration schema.
//!
//! Every section and field is optional in the file; `defaults` fills the
//! gaps and the resolved accessors below never hand out an unset value.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::{
    DEFAULT_ACCOUNTING_FILE, DEFAULT_CINDER_DB, DEFAULT_KEYSTONE_DB, DEFAULT_LOG_LEVEL,
    DEFAULT_MAIL_FROM, DEFAULT_MAIL_SUBJECT, DEFAULT_NOVA_DB, DEFAULT_SENDMAIL,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Service database locations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Accounting report output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting: Option<AccountingConfig>,

    /// Mail delivery for the quota check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Compute database (instances, flavors, compute nodes, quota usages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nova: Option<String>,
    /// Block storage database (volumes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cinder: Option<String>,
    /// Identity database (users, projects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingConfig {
    /// File written by `accounting --file` when no path is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// sendmail-compatible binary that reads the message on stdin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendmail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rotated JSON log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved views
// ---------------------------------------------------------------------------

/// Paths of the three service databases, handed to the store constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabasePaths {
    pub nova: PathBuf,
    pub cinder: PathBuf,
    pub keystone: PathBuf,
}

/// Fully resolved mail settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub sendmail: String,
}

impl ReportConfig {
    pub fn database_paths(&self) -> DatabasePaths {
        let db = self.database.clone().unwrap_or_default();
        DatabasePaths {
            nova: db.nova.unwrap_or_else(|| DEFAULT_NOVA_DB.to_string()).into(),
            cinder: db.cinder.unwrap_or_else(|| DEFAULT_CINDER_DB.to_string()).into(),
            keystone: db.keystone.unwrap_or_else(|| DEFAULT_KEYSTONE_DB.to_string()).into(),
        }
    }

    pub fn accounting_output_file(&self) -> PathBuf {
        self.accounting
            .as_ref()
            .and_then(|a| a.output_file.clone())
            .unwrap_or_else(|| DEFAULT_ACCOUNTING_FILE.to_string())
            .into()
    }

    pub fn mail_settings(&self) -> MailSettings {
        let mail = self.mail.clone().unwrap_or_default();
        MailSettings {
            from: mail.from.unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            to: mail.to,
            subject: mail.subject.unwrap_or_else(|| DEFAULT_MAIL_SUBJECT.to_string()),
            sendmail: mail.sendmail.unwrap_or_else(|| DEFAULT_SENDMAIL.to_string()),
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.clone()).map(PathBuf::from)
    }
}
