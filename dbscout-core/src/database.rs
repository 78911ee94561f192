//! The user-facing database handle.
//!
//! [`Database`] ties the pieces together: a connection, the schema
//! resolver with its published snapshot, glob search, templated query
//! helpers, and the profile lifecycle. Entities handed out from the
//! snapshot are connection-free data, so every operation that talks to
//! the database lives here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::catalog::{BackendKind, KeyRow, QueryCatalog, catalog, escape_literal, fill};
use crate::connection::{ConnectionConfig, SqlConnection, connect};
use crate::error::{DbScoutError, Result, redact_database_url};
use crate::models::{ColumnSet, QueryResult, Table, TableSet};
use crate::profile::{Profile, ProfileStore};
use crate::resolver::{RefreshOptions, SchemaResolver};
use crate::search;

/// Rows returned by `head` when the caller does not say otherwise.
pub const DEFAULT_HEAD_ROWS: usize = 6;

/// Rows returned by `sample` when the caller does not say otherwise.
pub const DEFAULT_SAMPLE_ROWS: usize = 10;

/// Connection and refresh settings for [`Database::connect_with`].
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Driver connection settings.
    pub connection: ConnectionConfig,
    /// Options applied by lazy snapshot loads.
    pub refresh: RefreshOptions,
}

/// A connected database with lazily resolved schema.
pub struct Database {
    conn: Box<dyn SqlConnection>,
    connection_string: String,
    resolver: SchemaResolver,
    defaults: RefreshOptions,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.conn.kind())
            .field("url", &redact_database_url(&self.connection_string))
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Connects with default settings.
    ///
    /// # Errors
    /// See [`connect`].
    pub async fn connect(connection_string: &str) -> Result<Self> {
        Self::connect_with(connection_string, DatabaseConfig::default()).await
    }

    /// Connects with explicit settings.
    ///
    /// # Errors
    /// See [`connect`].
    pub async fn connect_with(connection_string: &str, config: DatabaseConfig) -> Result<Self> {
        let conn = connect(connection_string, &config.connection).await?;
        Ok(Self {
            conn,
            connection_string: connection_string.to_string(),
            resolver: SchemaResolver::new(),
            defaults: config.refresh,
        })
    }

    /// Connects using a saved profile from the default store.
    ///
    /// When the profile carries cached table records, the first snapshot
    /// load rebuilds from them without touching the catalog.
    ///
    /// # Errors
    /// See [`ProfileStore::load`] and [`connect`].
    pub async fn from_profile(name: &str) -> Result<Self> {
        Self::from_profile_in(&ProfileStore::new()?, name).await
    }

    /// Connects using a saved profile from an explicit store.
    ///
    /// # Errors
    /// See [`ProfileStore::load`] and [`connect`].
    pub async fn from_profile_in(store: &ProfileStore, name: &str) -> Result<Self> {
        let profile = store.load(name)?;
        let url = profile.connection_url()?;
        let conn = connect(&url, &ConnectionConfig::default()).await?;
        let resolver = match profile.tables {
            Some(records) => SchemaResolver::with_cached_records(records),
            None => SchemaResolver::new(),
        };
        Ok(Self {
            conn,
            connection_string: url,
            resolver,
            defaults: RefreshOptions::default(),
        })
    }

    /// Wraps an already-open connection; used by tests that build pools
    /// directly.
    pub fn from_connection(conn: Box<dyn SqlConnection>, connection_string: impl Into<String>) -> Self {
        Self {
            conn,
            connection_string: connection_string.into(),
            resolver: SchemaResolver::new(),
            defaults: RefreshOptions::default(),
        }
    }

    /// The backend this handle talks to.
    pub fn backend(&self) -> BackendKind {
        self.conn.kind()
    }

    /// The connection string with any password redacted.
    pub fn connection_url(&self) -> String {
        redact_database_url(&self.connection_string)
    }

    /// Connectivity probe.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Connection`] when the probe fails.
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await
    }

    /// Closes the underlying connection pool.
    pub async fn close(&self) {
        self.conn.close().await;
    }

    /// The resolved snapshot, refreshing lazily on first access.
    ///
    /// The first call resolves the schema (from cached profile records
    /// when present, live otherwise); later calls return the published
    /// snapshot without touching the database.
    ///
    /// # Errors
    /// See [`SchemaResolver::resolve`].
    pub async fn tables(&self) -> Result<Arc<TableSet>> {
        if let Some(snapshot) = self.resolver.snapshot() {
            return Ok(snapshot);
        }
        let options = RefreshOptions {
            use_cache: true,
            ..self.defaults.clone()
        };
        self.resolver.resolve(self.conn.as_ref(), &options).await
    }

    /// Re-introspects the schema with explicit options.
    ///
    /// # Errors
    /// See [`SchemaResolver::resolve`].
    pub async fn refresh_schema(&self, options: &RefreshOptions) -> Result<Arc<TableSet>> {
        self.resolver.resolve(self.conn.as_ref(), options).await
    }

    /// Tables whose name matches a glob pattern.
    ///
    /// # Errors
    /// See [`search::find_table`].
    pub async fn find_table(&self, pattern: &str) -> Result<TableSet> {
        search::find_table(&*self.tables().await?, pattern)
    }

    /// Columns across all tables whose name matches a glob pattern.
    ///
    /// # Errors
    /// See [`search::find_column`].
    pub async fn find_column(&self, pattern: &str) -> Result<ColumnSet> {
        search::find_column(&*self.tables().await?, pattern)
    }

    /// Like [`Database::find_column`], restricted to given data types.
    ///
    /// # Errors
    /// See [`search::find_column_filtered`].
    pub async fn find_column_filtered(
        &self,
        pattern: &str,
        data_types: &[&str],
    ) -> Result<ColumnSet> {
        search::find_column_filtered(&*self.tables().await?, pattern, data_types)
    }

    /// First `n` rows of a table.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the statement fails.
    pub async fn head(&self, table: &str, n: usize) -> Result<QueryResult> {
        let sql = self
            .table_sql(table, |cat| cat.table.head, &[("n", &n.to_string())])
            .await?;
        self.conn.fetch(&sql).await
    }

    /// Every row of a table.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the statement fails.
    pub async fn all(&self, table: &str) -> Result<QueryResult> {
        let sql = self.table_sql(table, |cat| cat.table.all, &[]).await?;
        self.conn.fetch(&sql).await
    }

    /// `n` shuffled rows of a table, using the dialect's shuffle function.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the statement fails.
    pub async fn sample(&self, table: &str, n: usize) -> Result<QueryResult> {
        let sql = self
            .table_sql(table, |cat| cat.table.sample, &[("n", &n.to_string())])
            .await?;
        self.conn.fetch(&sql).await
    }

    /// Distinct combinations of the named columns (all columns when the
    /// list is empty).
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for unknown columns and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn unique(&self, table: &str, columns: &[&str]) -> Result<QueryResult> {
        let sql = self.columns_sql(table, columns, |cat| cat.table.unique).await?;
        self.conn.fetch(&sql).await
    }

    /// Projection of the named columns (`*` when the list is empty).
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for unknown columns and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn select(&self, table: &str, columns: &[&str]) -> Result<QueryResult> {
        let sql = self.columns_sql(table, columns, |cat| cat.table.select).await?;
        self.conn.fetch(&sql).await
    }

    /// Row count of a table via `COUNT(*)`.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the statement fails and
    /// [`DbScoutError::Serialization`] when the count cell is unreadable.
    pub async fn count(&self, table: &str) -> Result<u64> {
        let sql = self.table_sql(table, |cat| cat.table.count, &[]).await?;
        let result = self.conn.fetch(&sql).await?;
        let cell = result
            .rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(cell).map_err(|e| {
            DbScoutError::serialization(
                format!("Failed to read row count for table '{table}'"),
                e,
            )
        })
    }

    /// First `n` values of one column.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for an unknown column and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn column_head(&self, table: &str, column: &str, n: usize) -> Result<QueryResult> {
        let sql = self
            .column_sql(table, column, |cat| cat.column.head, &[("n", &n.to_string())])
            .await?;
        self.conn.fetch(&sql).await
    }

    /// Every value of one column.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for an unknown column and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn column_all(&self, table: &str, column: &str) -> Result<QueryResult> {
        let sql = self.column_sql(table, column, |cat| cat.column.all, &[]).await?;
        self.conn.fetch(&sql).await
    }

    /// Distinct values of one column.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for an unknown column and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn column_unique(&self, table: &str, column: &str) -> Result<QueryResult> {
        let sql = self
            .column_sql(table, column, |cat| cat.column.unique, &[])
            .await?;
        self.conn.fetch(&sql).await
    }

    /// `n` shuffled values of one column.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Configuration`] for an unknown column and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn column_sample(&self, table: &str, column: &str, n: usize) -> Result<QueryResult> {
        let sql = self
            .column_sql(table, column, |cat| cat.column.sample, &[("n", &n.to_string())])
            .await?;
        self.conn.fetch(&sql).await
    }

    /// Foreign keys declared on one column, read live from the catalog.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the catalog query fails.
    pub async fn column_foreign_keys(&self, table: &str, column: &str) -> Result<Vec<KeyRow>> {
        // SQLite serves key lookups from metatables built on demand.
        self.conn.prepare_catalog().await?;
        let cat = catalog(self.conn.kind());
        let sql = fill(
            cat.system.foreign_keys_for_column,
            &[
                ("table", &escape_literal(table)),
                ("column", &escape_literal(column)),
            ],
        );
        let result = self.conn.fetch(&sql).await?;
        let mut rows = Vec::with_capacity(result.len());
        for values in &result.rows {
            rows.push(KeyRow::from_values(values)?);
        }
        Ok(rows)
    }

    /// Runs raw SQL, returning whatever rows come back.
    ///
    /// The text passes through untouched; there is no parsing or
    /// validation on this side.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Query`] when the statement fails.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.conn.fetch(sql).await
    }

    /// Runs the SQL held in a file.
    ///
    /// # Errors
    /// Returns [`DbScoutError::Io`] when the file cannot be read and
    /// [`DbScoutError::Query`] when the statement fails.
    pub async fn query_file(&self, path: impl AsRef<Path>) -> Result<QueryResult> {
        let path = path.as_ref();
        let sql = tokio::fs::read_to_string(path).await.map_err(|e| {
            DbScoutError::io(format!("Failed to read query file {}", path.display()), e)
        })?;
        self.query(&sql).await
    }

    /// Saves connection details and the current snapshot to the default
    /// profile store.
    ///
    /// # Errors
    /// See [`Database::save_profile_in`].
    pub async fn save_profile(&self, name: &str) -> Result<PathBuf> {
        self.save_profile_in(&ProfileStore::new()?, name).await
    }

    /// Saves connection details and the current snapshot to an explicit
    /// store, resolving the snapshot first if needed.
    ///
    /// # Errors
    /// See [`SchemaResolver::resolve`] and [`ProfileStore::save`].
    pub async fn save_profile_in(&self, store: &ProfileStore, name: &str) -> Result<PathBuf> {
        let snapshot = self.tables().await?;
        let mut profile =
            Profile::from_connection_string(&self.connection_string, self.conn.kind())?;
        profile.tables = Some(snapshot.to_records());
        profile.cached_at = Some(Utc::now());
        store.save(name, &profile)
    }

    /// Fills a table-level template for a snapshot table.
    async fn table_sql(
        &self,
        table: &str,
        pick: fn(&QueryCatalog) -> &'static str,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let snapshot = self.tables().await?;
        let found = lookup_table(&snapshot, table)?;
        let cat = catalog(self.conn.kind());
        let target = cat.table_target(found.schema.as_deref(), &found.name);
        let mut substitutions: Vec<(&str, &str)> = vec![("table", target.as_str())];
        substitutions.extend_from_slice(extra);
        Ok(fill(pick(cat), &substitutions))
    }

    /// Fills a table-level template that takes a `{columns}` list.
    async fn columns_sql(
        &self,
        table: &str,
        columns: &[&str],
        pick: fn(&QueryCatalog) -> &'static str,
    ) -> Result<String> {
        let snapshot = self.tables().await?;
        let found = lookup_table(&snapshot, table)?;
        let resolved = resolve_columns(found, columns)?;
        let cat = catalog(self.conn.kind());
        let target = cat.table_target(found.schema.as_deref(), &found.name);
        let column_list = cat.format_column_list(&resolved);
        Ok(fill(
            pick(cat),
            &[("table", target.as_str()), ("columns", column_list.as_str())],
        ))
    }

    /// Fills a column-level template.
    async fn column_sql(
        &self,
        table: &str,
        column: &str,
        pick: fn(&QueryCatalog) -> &'static str,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let snapshot = self.tables().await?;
        let found = lookup_table(&snapshot, table)?;
        let resolved = resolve_columns(found, &[column])?;
        let cat = catalog(self.conn.kind());
        let target = cat.table_target(found.schema.as_deref(), &found.name);
        let column_ref = cat.format_column_list(&resolved);
        let mut substitutions: Vec<(&str, &str)> =
            vec![("table", target.as_str()), ("column", column_ref.as_str())];
        substitutions.extend_from_slice(extra);
        Ok(fill(pick(cat), &substitutions))
    }
}

fn lookup_table<'a>(snapshot: &'a TableSet, name: &str) -> Result<&'a Table> {
    snapshot
        .get(name)
        .ok_or_else(|| DbScoutError::configuration(format!("Unknown table '{name}'")))
}

/// Maps requested column names to their canonical snapshot spelling.
///
/// Accepts accessor names too, so a column renamed by the reserved-name
/// rule is reachable either way.
fn resolve_columns<'a>(table: &'a Table, requested: &[&str]) -> Result<Vec<&'a str>> {
    let mut resolved = Vec::with_capacity(requested.len());
    for name in requested {
        let column = table
            .column(name)
            .or_else(|| table.columns.iter().find(|c| c.name == *name))
            .ok_or_else(|| {
                DbScoutError::configuration(format!(
                    "Table '{}' has no column '{name}'",
                    table.name
                ))
            })?;
        resolved.push(column.name.as_str());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn invoice_table() -> Table {
        Table::new(
            None,
            "Invoice",
            vec![
                Column::new(None, "Invoice", "InvoiceId", "INTEGER"),
                Column::new(None, "Invoice", "count", "INTEGER"),
            ],
        )
    }

    #[test]
    fn test_resolve_columns_accepts_name_and_accessor() {
        let table = invoice_table();
        assert_eq!(
            resolve_columns(&table, &["InvoiceId"]).unwrap(),
            ["InvoiceId"]
        );
        assert_eq!(resolve_columns(&table, &["count"]).unwrap(), ["count"]);
        assert_eq!(
            resolve_columns(&table, &["Invoice_count"]).unwrap(),
            ["count"]
        );
    }

    #[test]
    fn test_resolve_columns_rejects_unknown() {
        let table = invoice_table();
        let err = resolve_columns(&table, &["Total"]).unwrap_err();
        assert!(matches!(err, DbScoutError::Configuration { .. }));
    }

    #[test]
    fn test_lookup_table_reports_unknown() {
        let snapshot = TableSet::new(vec![invoice_table()]);
        assert!(lookup_table(&snapshot, "Invoice").is_ok());
        assert!(matches!(
            lookup_table(&snapshot, "Receipt").unwrap_err(),
            DbScoutError::Configuration { .. }
        ));
    }
}
