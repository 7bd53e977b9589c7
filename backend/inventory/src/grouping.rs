use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use stackreport_core::{project_label, user_label, Instance, NameResolver};

/// An instance with its project resolved to a display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceLine {
    pub hostname: String,
    pub vcpus: i64,
    pub flavor_name: Option<String>,
    pub host: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vm_state: String,
    pub project: String,
}

impl fmt::Display for InstanceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  {}, {} cpus (flavor {}), {}, created at {}, {}, project {}",
            self.hostname,
            self.vcpus,
            self.flavor_name.as_deref().unwrap_or("None"),
            self.host.as_deref().unwrap_or("None"),
            self.created_at.format("%d/%m/%Y, %H:%M"),
            self.vm_state,
            self.project
        )
    }
}

/// All live instances of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInstances {
    pub user_id: String,
    pub name: String,
    pub instances: Vec<InstanceLine>,
}

impl UserInstances {
    pub fn vm_count(&self) -> usize {
        self.instances.len()
    }

    pub fn vcpu_count(&self) -> i64 {
        self.instances.iter().map(|i| i.vcpus).sum()
    }

    /// Heading line, e.g. `alice (2 vms, 6 vcpus)`.
    pub fn heading(&self) -> String {
        format!("{} ({} vms, {} vcpus)", self.name, self.vm_count(), self.vcpu_count())
    }
}

pub fn group_by_user(instances: Vec<Instance>) -> BTreeMap<String, Vec<Instance>> {
    let mut groups: BTreeMap<String, Vec<Instance>> = BTreeMap::new();
    for vm in instances {
        groups.entry(vm.user_id.clone()).or_default().push(vm);
    }
    groups
}

/// Group instances by user and resolve user and project names.
///
/// Each distinct project id is looked up once. Unresolvable ids get
/// placeholder labels.
pub async fn build_inventory(instances: Vec<Instance>, resolver: &dyn NameResolver) -> Vec<UserInstances> {
    let mut projects: BTreeMap<String, String> = BTreeMap::new();
    let mut result = Vec::new();

    for (user_id, vms) in group_by_user(instances) {
        let name = user_label(resolver, &user_id).await;
        let mut lines = Vec::with_capacity(vms.len());
        for vm in vms {
            let project = match projects.get(&vm.project_id) {
                Some(label) => label.clone(),
                None => {
                    let label = project_label(resolver, &vm.project_id).await;
                    projects.insert(vm.project_id.clone(), label.clone());
                    label
                }
            };
            lines.push(InstanceLine {
                hostname: vm.hostname,
                vcpus: vm.vcpus,
                flavor_name: vm.flavor_name,
                host: vm.host,
                created_at: vm.created_at,
                vm_state: vm.vm_state,
                project,
            });
        }
        result.push(UserInstances { user_id, name, instances: lines });
    }

    debug!(users = result.len(), projects = projects.len(), "Built instance inventory");
    result
}
