//! Display labels for owners and projects.
//!
//! Name lookups never fail a report: an id that cannot be resolved is shown
//! under a placeholder built from the raw id.

use tracing::debug;

use crate::traits::NameResolver;

pub fn unknown_user_label(user_id: &str) -> String {
    format!("UNKNOWN_{user_id}")
}

pub fn unknown_tenant_label(project_id: &str) -> String {
    format!("UNKNOWN_TENANT_{project_id}")
}

/// Resolve a user name, falling back to `UNKNOWN_<id>`.
pub async fn user_label(resolver: &dyn NameResolver, user_id: &str) -> String {
    match resolver.user_name(user_id).await {
        Ok(name) => name,
        Err(e) => {
            debug!(user = %user_id, error = %e, "User name lookup failed");
            unknown_user_label(user_id)
        }
    }
}

/// Resolve a project name, falling back to `UNKNOWN_TENANT_<id>`.
pub async fn project_label(resolver: &dyn NameResolver, project_id: &str) -> String {
    match resolver.project_name(project_id).await {
        Ok(name) => name,
        Err(e) => {
            debug!(project = %project_id, error = %e, "Project name lookup failed");
            unknown_tenant_label(project_id)
        }
    }
}
