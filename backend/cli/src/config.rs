use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;

use stackreport_config::{
    config_dir, config_file_path, load_and_prepare, validate, DatabasePaths, MailSettings,
    ReportConfig,
};

/// Database paths given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct DatabaseOverrides {
    pub nova: Option<PathBuf>,
    pub cinder: Option<PathBuf>,
    pub keystone: Option<PathBuf>,
}

/// Effective settings of one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub file: ReportConfig,
    pub databases: DatabasePaths,
}

impl Config {
    /// Load the config file (explicit path or the default location) and
    /// apply command-line overrides.
    pub async fn load(path: Option<&Path>, overrides: DatabaseOverrides) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_file_path(&config_dir()),
        };
        let file = load_and_prepare(&path).await?;
        Ok(Self::from_file(file, overrides))
    }

    pub fn from_file(file: ReportConfig, overrides: DatabaseOverrides) -> Self {
        let defaults = file.database_paths();
        let databases = DatabasePaths {
            nova: overrides.nova.unwrap_or(defaults.nova),
            cinder: overrides.cinder.unwrap_or(defaults.cinder),
            keystone: overrides.keystone.unwrap_or(defaults.keystone),
        };
        Self { file, databases }
    }

    /// Log validation warnings; call once the logger is installed.
    pub fn log_warnings(&self) {
        for w in validate(&self.file).warnings {
            warn!(path = %w.path, "{}", w.message);
        }
    }

    pub fn log_level(&self) -> &str {
        self.file.log_level()
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.file.log_dir()
    }

    pub fn accounting_output_file(&self) -> PathBuf {
        self.file.accounting_output_file()
    }

    pub fn mail(&self) -> MailSettings {
        self.file.mail_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_file() {
        let cfg = Config::from_file(
            ReportConfig::default(),
            DatabaseOverrides { nova: Some("/srv/nova.db".into()), ..Default::default() },
        );
        assert_eq!(cfg.databases.nova, PathBuf::from("/srv/nova.db"));
        assert_eq!(cfg.databases.cinder, PathBuf::from("cinder.db"));
    }

    #[tokio::test]
    async fn loads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.yaml");
        std::fs::write(&path, "database:\n  keystone: /srv/keystone.db\nlogging:\n  level: debug\n").unwrap();

        let cfg = Config::load(Some(&path), DatabaseOverrides::default()).await.unwrap();
        assert_eq!(cfg.databases.keystone, PathBuf::from("/srv/keystone.db"));
        assert_eq!(cfg.log_level(), "debug");
    }
}
