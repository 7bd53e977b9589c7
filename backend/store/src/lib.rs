//! SQLite collaborators for the report pipelines.
//!
//! Reads databases shaped like the compute (nova), block storage (cinder)
//! and identity (keystone) schemas, mapping every row into the typed
//! records of `stackreport-core` at this boundary.

pub mod schema;
pub mod sqlite;
pub mod timestamp;

pub use schema::{create_cinder_schema, create_keystone_schema, create_nova_schema};
pub use sqlite::SqliteStore;
pub use timestamp::parse_timestamp;
