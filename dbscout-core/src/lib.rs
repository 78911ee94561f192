//! Core library for dbscout.
//!
//! dbscout connects to a relational database, introspects its schema
//! into queryable in-memory objects with resolved key relationships, and
//! offers glob search plus templated query helpers over the result. A
//! resolved snapshot can be cached inside a saved connection profile, so
//! repeat sessions skip the catalog queries entirely.
//!
//! # Architecture
//! - Per-dialect knowledge lives in data-only query catalogs; no other
//!   module composes catalog SQL.
//! - Database access goes through one object-safe connection trait with
//!   an sqlx-backed implementation per compiled driver.
//! - Schema refreshes build the whole snapshot off to the side and
//!   publish it atomically; readers never see a half-resolved schema.

pub mod catalog;
pub mod connection;
pub mod credentials;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod profile;
pub mod render;
pub mod resolver;
pub mod search;

// Re-export commonly used types
pub use catalog::{BackendKind, QueryCatalog, catalog as dialect_catalog, detect_backend};
pub use connection::{ConnectionConfig, SqlConnection, connect};
pub use credentials::Credentials;
pub use database::{DEFAULT_HEAD_ROWS, DEFAULT_SAMPLE_ROWS, Database, DatabaseConfig};
pub use error::{DbScoutError, Result, redact_database_url};
pub use logging::init_logging;
pub use models::{
    Column, ColumnRecord, ColumnSet, ColumnSetRecord, QueryResult, Table, TableRecord, TableSet,
};
pub use profile::{
    Profile, ProfileStore, list_profiles, load_profile, profile_path, remove_profile,
    save_profile,
};
pub use render::{
    RenderOptions, ToHtml, render_column_set, render_query_result, render_table, render_table_set,
};
pub use resolver::{KeyResolution, RefreshOptions, SchemaResolver};
pub use search::{find_column, find_column_filtered, find_table};
