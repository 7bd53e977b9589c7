//! `stackreport-config`: configuration for the cloud reports.
//!
//! Provides:
//! - Typed config schema (databases, accounting output, mail, logging)
//! - YAML loading from `~/.stackreport/config.yaml`
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{DatabasePaths, MailSettings, ReportConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load a config file, substitute env vars, apply defaults and validate.
///
/// Validation errors fail the load; warnings are left to the caller, who
/// can re-run [`validate`] once logging is up.
pub async fn load_and_prepare(path: &Path) -> Result<ReportConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: ReportConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);

    let report = validate(&config);
    if let Some(first) = report.errors.first() {
        bail!("{first} ({} error(s) in {})", report.errors.len(), path.display());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepares_defaults_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_and_prepare(&config_file_path(dir.path())).await.unwrap();
        assert_eq!(cfg.database_paths().nova, std::path::PathBuf::from("nova.db"));
        assert!(cfg.accounting.is_some());
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "database:\n  nova: ''\n").unwrap();
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("database.nova"));
    }
}
