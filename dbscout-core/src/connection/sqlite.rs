//! SQLite connections and synthesized catalog metatables.
//!
//! SQLite exposes schema through `sqlite_master` and pragmas rather than
//! an information schema, so [`SqliteConnection::prepare_catalog`] walks
//! those and materializes two TEMP tables the dialect catalog queries
//! read from:
//!
//! - `tmp_dbscout_schema(table_name, column_name, data_type)`
//! - `tmp_dbscout_keys(table_name, column_name, foreign_table, foreign_column)`
//!
//! TEMP tables are scoped to their connection, so the pool is pinned to
//! a single connection that is never reaped.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row};
use std::collections::HashMap;
use std::str::FromStr;

use super::{ConnectionConfig, SqlConnection};
use crate::catalog::sqlite::{KEYS_METATABLE, SCHEMA_METATABLE};
use crate::catalog::{BackendKind, escape_literal};
use crate::error::{DbScoutError, Result};
use crate::models::QueryResult;

/// Rows per INSERT when filling the metatables; SQLite caps compound
/// statements at 500 parts.
const INSERT_CHUNK: usize = 400;

/// SQLite-backed [`SqlConnection`].
pub struct SqliteConnection {
    pool: SqlitePool,
    connection_string: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("database", &redacted_path(&self.connection_string))
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Opens a SQLite database.
    ///
    /// Accepts `sqlite://` URLs, bare file paths and `:memory:`. Missing
    /// database files are created, matching how SQLite itself behaves.
    pub async fn new(connection_string: &str, config: &ConnectionConfig) -> Result<Self> {
        let normalized = normalize_connection_string(connection_string);
        let options = SqliteConnectOptions::from_str(&normalized)
            .map_err(|e| {
                DbScoutError::configuration(format!("Invalid SQLite connection string: {e}"))
            })?
            .create_if_missing(true);

        // One connection, kept alive: the TEMP metatables live on it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbScoutError::connection_failed("Failed to open SQLite database", e))?;

        Ok(Self {
            pool,
            connection_string: connection_string.to_string(),
        })
    }

    /// Wraps an existing pool; used by tests that set up schema directly.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            connection_string: "sqlite::memory:".to_string(),
        }
    }

    /// Lists user tables in name order.
    async fn user_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE 'tmp_dbscout_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbScoutError::query_failed("Failed to list tables from sqlite_master", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| DbScoutError::query_failed("Failed to read table name", e))
            })
            .collect()
    }

    /// Columns of one table in declaration order, with primary-key flags.
    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String, bool)>> {
        let pragma = format!("PRAGMA table_info('{}')", escape_literal(table));
        let rows = sqlx::query(&pragma).fetch_all(&self.pool).await.map_err(|e| {
            DbScoutError::query_failed(format!("Failed to read columns for table '{table}'"), e)
        })?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("name")
                    .map_err(|e| DbScoutError::query_failed("Failed to read column name", e))?;
                let data_type: String = row
                    .try_get("type")
                    .map_err(|e| DbScoutError::query_failed("Failed to read column type", e))?;
                let pk: i64 = row.try_get("pk").unwrap_or(0);
                Ok((name, data_type, pk > 0))
            })
            .collect()
    }

    /// Foreign keys of one table as (column, target table, target column).
    ///
    /// A reference without an explicit target column points at the target
    /// table's primary key; it resolves here when that key has exactly
    /// one column and the row is skipped otherwise.
    async fn table_keys(
        &self,
        table: &str,
        primary_keys: &HashMap<String, Vec<String>>,
    ) -> Result<Vec<(String, String, String)>> {
        let pragma = format!("PRAGMA foreign_key_list('{}')", escape_literal(table));
        let rows = sqlx::query(&pragma).fetch_all(&self.pool).await.map_err(|e| {
            DbScoutError::query_failed(format!("Failed to read foreign keys for table '{table}'"), e)
        })?;

        let mut keys = Vec::new();
        for row in &rows {
            let from: String = row
                .try_get("from")
                .map_err(|e| DbScoutError::query_failed("Failed to read foreign key column", e))?;
            let target_table: String = row
                .try_get("table")
                .map_err(|e| DbScoutError::query_failed("Failed to read foreign key target", e))?;
            let to: Option<String> = row.try_get("to").unwrap_or(None);

            let target_column = match to {
                Some(column) => column,
                None => match primary_keys.get(&target_table) {
                    Some(pk) if pk.len() == 1 => pk[0].clone(),
                    _ => continue,
                },
            };
            keys.push((from, target_table, target_column));
        }
        Ok(keys)
    }

    async fn insert_rows(&self, table: &str, width: usize, rows: &[Vec<String>]) -> Result<()> {
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut values = Vec::with_capacity(chunk.len());
            for row in chunk {
                debug_assert_eq!(row.len(), width);
                let tuple: Vec<String> = row
                    .iter()
                    .map(|v| format!("'{}'", escape_literal(v)))
                    .collect();
                values.push(format!("({})", tuple.join(", ")));
            }
            let sql = format!("INSERT INTO {} VALUES {}", table, values.join(", "));
            sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
                DbScoutError::query_failed(format!("Failed to fill metatable '{table}'"), e)
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl SqlConnection for SqliteConnection {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbScoutError::connection_failed("SQLite ping failed", e))?;
        Ok(())
    }

    async fn fetch(&self, sql: &str) -> Result<QueryResult> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbScoutError::query_failed(super::statement_context(sql), e))?;
        Ok(rows_to_result(&rows))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let outcome = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| DbScoutError::query_failed(super::statement_context(sql), e))?;
        Ok(outcome.rows_affected())
    }

    /// Rebuilds the TEMP metatables from `sqlite_master` and pragmas.
    ///
    /// Runs at the start of every live refresh, so schema changes made
    /// after connecting are picked up.
    async fn prepare_catalog(&self) -> Result<()> {
        let started = std::time::Instant::now();

        for metatable in [SCHEMA_METATABLE, KEYS_METATABLE] {
            let drop = format!("DROP TABLE IF EXISTS {metatable}");
            sqlx::query(&drop).execute(&self.pool).await.map_err(|e| {
                DbScoutError::query_failed(format!("Failed to reset metatable '{metatable}'"), e)
            })?;
        }
        sqlx::query(&format!(
            "CREATE TEMP TABLE {SCHEMA_METATABLE} (table_name TEXT, column_name TEXT, data_type TEXT)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| DbScoutError::query_failed("Failed to create schema metatable", e))?;
        sqlx::query(&format!(
            "CREATE TEMP TABLE {KEYS_METATABLE} (table_name TEXT, column_name TEXT, foreign_table TEXT, foreign_column TEXT)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| DbScoutError::query_failed("Failed to create keys metatable", e))?;

        let tables = self.user_tables().await?;

        let mut schema_rows = Vec::new();
        let mut primary_keys: HashMap<String, Vec<String>> = HashMap::new();
        for table in &tables {
            let columns = self.table_columns(table).await?;
            for (name, data_type, is_pk) in columns {
                if is_pk {
                    primary_keys.entry(table.clone()).or_default().push(name.clone());
                }
                schema_rows.push(vec![table.clone(), name, data_type]);
            }
        }

        let mut key_rows = Vec::new();
        for table in &tables {
            for (column, target_table, target_column) in
                self.table_keys(table, &primary_keys).await?
            {
                key_rows.push(vec![table.clone(), column, target_table, target_column]);
            }
        }

        self.insert_rows(SCHEMA_METATABLE, 3, &schema_rows).await?;
        self.insert_rows(KEYS_METATABLE, 4, &key_rows).await?;

        tracing::debug!(
            tables = tables.len(),
            columns = schema_rows.len(),
            keys = key_rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rebuilt sqlite catalog metatables"
        );
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn rows_to_result(rows: &[SqliteRow]) -> QueryResult {
    let columns: Vec<String> = rows.first().map_or_else(Vec::new, |row| {
        row.columns().iter().map(|c| c.name().to_string()).collect()
    });
    let data = rows
        .iter()
        .map(|row| (0..row.columns().len()).map(|i| cell_value(row, i)).collect())
        .collect();
    QueryResult::new(columns, data)
}

/// Decodes one cell; SQLite is dynamically typed, so several decodes are
/// tried in order of likelihood.
fn cell_value(row: &SqliteRow, index: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v
            .map(|n| JsonValue::Number(n.into()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(JsonValue::Bool).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v
            .map(|bytes| {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                JsonValue::String(format!("base64:{encoded}"))
            })
            .unwrap_or(JsonValue::Null);
    }
    JsonValue::Null
}

fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }
    format!("sqlite://{connection_string}")
}

fn redacted_path(connection_string: &str) -> String {
    connection_string
        .split('?')
        .next()
        .unwrap_or(connection_string)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(normalize_connection_string(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_connection_string("sqlite:///path/db.sqlite"),
            "sqlite:///path/db.sqlite"
        );
        assert_eq!(
            normalize_connection_string("/path/to/db.sqlite"),
            "sqlite:///path/to/db.sqlite"
        );
    }

    async fn memory_connection() -> SqliteConnection {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteConnection::from_pool(pool)
    }

    #[tokio::test]
    async fn test_metatables_reflect_schema() {
        let conn = memory_connection().await;
        conn.execute("CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name TEXT)")
            .await
            .unwrap();
        conn.execute(
            "CREATE TABLE Album (AlbumId INTEGER PRIMARY KEY, Title TEXT, ArtistId INTEGER REFERENCES Artist(ArtistId))",
        )
        .await
        .unwrap();

        conn.prepare_catalog().await.unwrap();

        let schema = conn
            .fetch("SELECT table_name, column_name, data_type FROM tmp_dbscout_schema ORDER BY rowid")
            .await
            .unwrap();
        assert_eq!(schema.len(), 5);
        assert_eq!(schema.rows[0][0], "Album");

        let keys = conn
            .fetch("SELECT table_name, column_name, foreign_table, foreign_column FROM tmp_dbscout_keys")
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.rows[0][0], "Album");
        assert_eq!(keys.rows[0][2], "Artist");
    }

    #[tokio::test]
    async fn test_implicit_reference_resolves_to_primary_key() {
        let conn = memory_connection().await;
        conn.execute("CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name TEXT)")
            .await
            .unwrap();
        conn.execute(
            "CREATE TABLE Album (AlbumId INTEGER PRIMARY KEY, ArtistId INTEGER REFERENCES Artist)",
        )
        .await
        .unwrap();

        conn.prepare_catalog().await.unwrap();

        let keys = conn
            .fetch("SELECT foreign_table, foreign_column FROM tmp_dbscout_keys")
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.rows[0][0], "Artist");
        assert_eq!(keys.rows[0][1], "ArtistId");
    }

    #[tokio::test]
    async fn test_refresh_rebuilds_metatables() {
        let conn = memory_connection().await;
        conn.execute("CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        conn.prepare_catalog().await.unwrap();

        conn.execute("CREATE TABLE Genre (GenreId INTEGER PRIMARY KEY, Name TEXT)")
            .await
            .unwrap();
        conn.prepare_catalog().await.unwrap();

        let schema = conn
            .fetch("SELECT DISTINCT table_name FROM tmp_dbscout_schema ORDER BY table_name")
            .await
            .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.rows[1][0], "Genre");
    }

    #[tokio::test]
    async fn test_cell_decode_covers_sqlite_types() {
        let conn = memory_connection().await;
        conn.execute("CREATE TABLE t (a TEXT, b INTEGER, c REAL, d BLOB, e TEXT)")
            .await
            .unwrap();
        conn.execute("INSERT INTO t VALUES ('x', 7, 1.5, x'00ff', NULL)")
            .await
            .unwrap();

        let result = conn.fetch("SELECT a, b, c, d, e FROM t").await.unwrap();
        assert_eq!(result.columns, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(result.rows[0][0], "x");
        assert_eq!(result.rows[0][1], 7);
        assert_eq!(result.rows[0][2], 1.5);
        let blob = result.rows[0][3].as_str().unwrap();
        assert!(blob.starts_with("base64:"));
        assert!(result.rows[0][4].is_null());
    }
}
