//! Minimal DDL for the tables the reports read.
//!
//! Production databases already carry these tables; the statements are used
//! to seed fixtures and scratch databases.

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn create_nova_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS instance_types (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            vcpus INTEGER NOT NULL,
            memory_mb INTEGER NOT NULL,
            root_gb INTEGER NOT NULL DEFAULT 0,
            ephemeral_gb INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS instances (
            id INTEGER PRIMARY KEY,
            user_id TEXT,
            project_id TEXT,
            hostname TEXT,
            host TEXT,
            vcpus INTEGER,
            memory_mb INTEGER,
            root_gb INTEGER,
            instance_type_id INTEGER,
            vm_state TEXT,
            created_at TEXT,
            deleted_at TEXT,
            deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY,
            host TEXT,
            topic TEXT,
            disabled INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS compute_nodes (
            id INTEGER PRIMARY KEY,
            service_id INTEGER NOT NULL,
            hypervisor_hostname TEXT NOT NULL,
            vcpus INTEGER NOT NULL,
            vcpus_used INTEGER NOT NULL,
            memory_mb INTEGER NOT NULL,
            free_ram_mb INTEGER NOT NULL,
            local_gb INTEGER NOT NULL,
            local_gb_used INTEGER NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS quota_usages (
            id INTEGER PRIMARY KEY,
            project_id TEXT,
            resource TEXT NOT NULL,
            in_use INTEGER NOT NULL,
            reserved INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_instances_project ON instances(project_id);
        CREATE INDEX IF NOT EXISTS idx_quota_usages_project ON quota_usages(project_id);",
    )
    .context("Failed to create nova schema")
}

pub fn create_cinder_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS volumes (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            project_id TEXT,
            size INTEGER,
            created_at TEXT,
            deleted_at TEXT,
            deleted INTEGER NOT NULL DEFAULT 0
        );",
    )
    .context("Failed to create cinder schema")
}

pub fn create_keystone_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"user\" (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS project (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );",
    )
    .context("Failed to create keystone schema")
}
