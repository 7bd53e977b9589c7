use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use stackreport_config::DatabasePaths;
use stackreport_core::{
    ComputeNode, Database, Flavor, Instance, InventorySource, NameResolver, QuotaCounter,
    QuotaStore, ReportError, ResourceRecord, RowSource, TableSpec,
};

use crate::schema::{create_cinder_schema, create_keystone_schema, create_nova_schema};
use crate::timestamp::parse_timestamp;

/// SQLite access to the compute, block storage and identity databases.
pub struct SqliteStore {
    nova: Mutex<Connection>,
    cinder: Mutex<Connection>,
    keystone: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the three existing databases.
    ///
    /// Missing files are an error: an absent service database means the
    /// report has no input at all.
    pub fn open(paths: &DatabasePaths) -> Result<Self, ReportError> {
        let store = Self {
            nova: Mutex::new(open_existing(Database::Nova, &paths.nova)?),
            cinder: Mutex::new(open_existing(Database::Cinder, &paths.cinder)?),
            keystone: Mutex::new(open_existing(Database::Keystone, &paths.keystone)?),
        };
        info!(
            nova = %paths.nova.display(),
            cinder = %paths.cinder.display(),
            keystone = %paths.keystone.display(),
            "Service databases opened"
        );
        Ok(store)
    }

    /// Empty in-memory databases with the report schema (for testing).
    pub fn in_memory() -> Result<Self> {
        let nova = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let cinder = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let keystone = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        create_nova_schema(&nova)?;
        create_cinder_schema(&cinder)?;
        create_keystone_schema(&keystone)?;
        Ok(Self {
            nova: Mutex::new(nova),
            cinder: Mutex::new(cinder),
            keystone: Mutex::new(keystone),
        })
    }

    fn connection(&self, database: Database) -> &Mutex<Connection> {
        match database {
            Database::Nova => &self.nova,
            Database::Cinder => &self.cinder,
            Database::Keystone => &self.keystone,
        }
    }

    /// Run a batch of SQL against one database, e.g. to seed fixtures.
    pub async fn execute_batch(&self, database: Database, sql: &str) -> Result<()> {
        let conn = self.connection(database).lock().await;
        conn.execute_batch(sql)
            .with_context(|| format!("Failed to execute batch on {database}"))
    }

    async fn query_records(&self, table: &TableSpec) -> Result<Vec<ResourceRecord>> {
        let conn = self.connection(table.database).lock().await;
        let sql = format!(
            "SELECT {}, {}, {}, {} FROM {}",
            table.owner_column, table.created_column, table.deleted_column, table.measure_column, table.table
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to query {}.{}", table.database, table.table))?;

        let rows = stmt.query_map([], |row| {
            let owner = id_value(row.get_ref(0)?);
            let created = text_value(row.get_ref(1)?);
            let deleted = text_value(row.get_ref(2)?);
            let measure = numeric_value(row.get_ref(3)?);
            Ok((owner, created, deleted, measure))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (owner, created, deleted, measure) = row?;
            if let Some(record) = to_record(table, owner, created, deleted, measure) {
                records.push(record);
            }
        }
        debug!(table = %table.table, rows = records.len(), "Fetched resource records");
        Ok(records)
    }
}

fn open_existing(database: Database, path: &Path) -> Result<Connection, ReportError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(|e| ReportError::SourceUnavailable {
        database: database.to_string(),
        message: format!("{}: {e}", path.display()),
    })
}

// Column readers for the record query. Values of an unexpected storage
// class read as absent so one odd row cannot fail the whole fetch.

fn id_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Text(_) => text_value(value),
        _ => None,
    }
}

fn text_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn numeric_value(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        _ => None,
    }
}

/// Map one raw row into a record. Rows without an owner or a parsable
/// creation time cannot be attributed and are skipped with a warning.
fn to_record(
    table: &TableSpec,
    owner: Option<String>,
    created: Option<String>,
    deleted: Option<String>,
    measure: Option<f64>,
) -> Option<ResourceRecord> {
    let Some(owner_id) = owner else {
        warn!(table = %table.table, "Skipping row without owner");
        return None;
    };
    let Some(created_at) = created.as_deref().and_then(parse_timestamp) else {
        warn!(table = %table.table, owner = %owner_id, raw = ?created, "Skipping row with unreadable creation time");
        return None;
    };
    let deleted_at = match deleted.as_deref() {
        None => None,
        Some(raw) => match parse_timestamp(raw) {
            Some(ts) => Some(ts),
            None => {
                warn!(table = %table.table, owner = %owner_id, raw = %raw, "Unreadable deletion time; treating row as active");
                None
            }
        },
    };
    Some(ResourceRecord { owner_id, created_at, deleted_at, measure })
}

#[async_trait]
impl RowSource for SqliteStore {
    async fn fetch_records(&self, table: &TableSpec) -> Result<Vec<ResourceRecord>, ReportError> {
        self.query_records(table).await.map_err(|e| ReportError::SourceUnavailable {
            database: table.database.to_string(),
            message: format!("{e:#}"),
        })
    }
}

#[async_trait]
impl NameResolver for SqliteStore {
    async fn list_users(&self) -> Result<Vec<(String, String)>, ReportError> {
        let conn = self.keystone.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, name FROM \"user\" ORDER BY name, id")
            .context("Failed to query keystone users")?;
        let users = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .context("Failed to read keystone users")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read keystone users")?;
        Ok(users)
    }

    async fn user_name(&self, user_id: &str) -> Result<String, ReportError> {
        let conn = self.keystone.lock().await;
        conn.query_row("SELECT name FROM \"user\" WHERE id = ?1", params![user_id], |row| row.get(0))
            .optional()
            .map_err(|e| ReportError::StorageError(e.to_string()))?
            .ok_or_else(|| ReportError::NameNotFound(user_id.to_string()))
    }

    async fn project_name(&self, project_id: &str) -> Result<String, ReportError> {
        let conn = self.keystone.lock().await;
        conn.query_row("SELECT name FROM project WHERE id = ?1", params![project_id], |row| row.get(0))
            .optional()
            .map_err(|e| ReportError::StorageError(e.to_string()))?
            .ok_or_else(|| ReportError::NameNotFound(project_id.to_string()))
    }
}

#[async_trait]
impl QuotaStore for SqliteStore {
    async fn stored_counters(&self) -> Result<Vec<QuotaCounter>, ReportError> {
        let conn = self.nova.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, project_id, resource, in_use
                 FROM quota_usages WHERE deleted = 0 AND project_id IS NOT NULL
                 ORDER BY project_id, id",
            )
            .context("Failed to query quota usages")?;
        let counters = stmt
            .query_map([], |row| {
                Ok(QuotaCounter {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    resource: row.get(2)?,
                    in_use: row.get(3)?,
                })
            })
            .context("Failed to read quota usages")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read quota usages")?;
        Ok(counters)
    }

    async fn overwrite_counter(&self, counter_id: i64, expected: i64, in_use: i64) -> Result<(), ReportError> {
        let conn = self.nova.lock().await;
        let changed = conn
            .execute(
                "UPDATE quota_usages SET in_use = ?1 WHERE id = ?2 AND in_use = ?3",
                params![in_use, counter_id, expected],
            )
            .map_err(|e| ReportError::CounterWriteFailed { counter_id, message: e.to_string() })?;
        if changed == 0 {
            let exists = conn
                .query_row("SELECT 1 FROM quota_usages WHERE id = ?1", params![counter_id], |_| Ok(()))
                .optional()
                .map_err(|e| ReportError::CounterWriteFailed { counter_id, message: e.to_string() })?
                .is_some();
            let message = if exists { "counter changed since read" } else { "no such counter" };
            return Err(ReportError::CounterWriteFailed { counter_id, message: message.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl InventorySource for SqliteStore {
    async fn active_instances(&self) -> Result<Vec<Instance>, ReportError> {
        let conn = self.nova.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT i.user_id, i.project_id, i.hostname, i.host, i.vcpus, i.memory_mb,
                        t.name, i.vm_state, i.created_at
                 FROM instances i LEFT JOIN instance_types t ON t.id = i.instance_type_id
                 WHERE i.deleted = 0
                 ORDER BY i.created_at, i.id",
            )
            .context("Failed to query instances")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ))
            })
            .context("Failed to read instances")?;

        let mut instances = Vec::new();
        for row in rows {
            let (user_id, project_id, hostname, host, vcpus, memory_mb, flavor_name, vm_state, created) =
                row.context("Failed to read instance row")?;
            let Some(created_at) = created.as_deref().and_then(parse_timestamp) else {
                warn!(hostname = ?hostname, raw = ?created, "Skipping instance with unreadable creation time");
                continue;
            };
            instances.push(Instance {
                user_id: user_id.unwrap_or_default(),
                project_id: project_id.unwrap_or_default(),
                hostname: hostname.unwrap_or_default(),
                host,
                vcpus: vcpus.unwrap_or(0),
                memory_mb: memory_mb.unwrap_or(0),
                flavor_name,
                vm_state: vm_state.unwrap_or_default(),
                created_at,
            });
        }
        debug!(instances = instances.len(), "Fetched active instances");
        Ok(instances)
    }

    async fn compute_nodes(&self) -> Result<Vec<ComputeNode>, ReportError> {
        let conn = self.nova.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT c.hypervisor_hostname, c.vcpus, c.vcpus_used, c.memory_mb, c.free_ram_mb,
                        c.local_gb, c.local_gb_used
                 FROM compute_nodes c JOIN services s ON s.id = c.service_id
                 WHERE s.disabled = 0 AND s.deleted = 0 AND c.deleted = 0",
            )
            .context("Failed to query compute nodes")?;
        let nodes = stmt
            .query_map([], |row| {
                Ok(ComputeNode {
                    hypervisor_hostname: row.get(0)?,
                    vcpus: row.get(1)?,
                    vcpus_used: row.get(2)?,
                    memory_mb: row.get(3)?,
                    free_ram_mb: row.get(4)?,
                    local_gb: row.get(5)?,
                    local_gb_used: row.get(6)?,
                })
            })
            .context("Failed to read compute nodes")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read compute nodes")?;
        Ok(nodes)
    }

    async fn flavors(&self) -> Result<Vec<Flavor>, ReportError> {
        let conn = self.nova.lock().await;
        let mut stmt = conn
            .prepare("SELECT name, vcpus, memory_mb, root_gb, ephemeral_gb FROM instance_types WHERE deleted = 0")
            .context("Failed to query flavors")?;
        let flavors = stmt
            .query_map([], |row| {
                Ok(Flavor {
                    name: row.get(0)?,
                    vcpus: row.get(1)?,
                    memory_mb: row.get(2)?,
                    root_gb: row.get(3)?,
                    ephemeral_gb: row.get(4)?,
                })
            })
            .context("Failed to read flavors")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read flavors")?;
        Ok(flavors)
    }
}
