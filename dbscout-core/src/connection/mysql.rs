//! MySQL connections.
//!
//! MySQL has no application-name channel, so that configuration field is
//! not applied here. Cell values outside the decode ladder come back as
//! JSON null.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row};
use std::str::FromStr;

use super::{ConnectionConfig, SqlConnection};
use crate::catalog::BackendKind;
use crate::error::{DbScoutError, Result, redact_database_url};
use crate::models::QueryResult;

/// MySQL-backed [`SqlConnection`].
pub struct MySqlConnection {
    pool: MySqlPool,
    connection_string: String,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("database", &redact_database_url(&self.connection_string))
            .finish_non_exhaustive()
    }
}

impl MySqlConnection {
    /// Connects to a MySQL database.
    pub async fn new(connection_string: &str, config: &ConnectionConfig) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(connection_string).map_err(|e| {
            DbScoutError::configuration(format!(
                "Invalid MySQL connection string '{}': {e}",
                redact_database_url(connection_string)
            ))
        })?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                DbScoutError::connection_failed("Failed to connect to MySQL database", e)
            })?;

        Ok(Self {
            pool,
            connection_string: connection_string.to_string(),
        })
    }

    /// Wraps an existing pool; used by tests running against a live server.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool,
            connection_string: "mysql://localhost/".to_string(),
        }
    }
}

#[async_trait]
impl SqlConnection for MySqlConnection {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbScoutError::connection_failed("MySQL ping failed", e))?;
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

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn rows_to_result(rows: &[MySqlRow]) -> QueryResult {
    let columns: Vec<String> = rows.first().map_or_else(Vec::new, |row| {
        row.columns().iter().map(|c| c.name().to_string()).collect()
    });
    let data = rows
        .iter()
        .map(|row| (0..row.columns().len()).map(|i| cell_value(row, i)).collect())
        .collect();
    QueryResult::new(columns, data)
}

fn cell_value(row: &MySqlRow, index: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v
            .map(|n| JsonValue::Number(n.into()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return v
            .map(|n| JsonValue::Number(n.into()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
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
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v
            .and_then(|f| serde_json::Number::from_f64(f64::from(f)))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(JsonValue::Bool).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
        return v
            .map(|t| JsonValue::String(t.to_rfc3339()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        return v
            .map(|t| JsonValue::String(t.to_string()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        return v
            .map(|d| JsonValue::String(d.to_string()))
            .unwrap_or(JsonValue::Null);
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
