//! Database connections behind one object-safe seam.
//!
//! [`SqlConnection`] is the whole contract the rest of the crate needs
//! from a driver: run a statement, fetch positionally decoded rows, and
//! (for SQLite) rebuild the synthesized catalog metatables. The
//! [`connect`] factory picks the implementation from the connection
//! string and the compiled driver features.

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{BackendKind, detect_backend};
use crate::error::{DbScoutError, Result};
use crate::models::QueryResult;

/// Configuration for database connections.
///
/// Credentials stay in the connection string and are never stored here.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Application name reported to backends that support it
    pub application_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_connections: 5,
            application_name: "dbscout".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns an error if configuration values are invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(DbScoutError::configuration(
                "max_connections must be greater than 0",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(DbScoutError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Object-safe driver seam.
///
/// Implementations issue statements strictly in call order; the schema
/// resolver depends on that to keep refreshes serial.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Backend kind this connection talks to.
    fn kind(&self) -> BackendKind;

    /// Connectivity probe.
    async fn ping(&self) -> Result<()>;

    /// Runs a statement and decodes every cell to a JSON value.
    ///
    /// Column headers come from the returned rows; a statement with no
    /// rows yields an empty header list.
    async fn fetch(&self, sql: &str) -> Result<QueryResult>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Rebuilds whatever the dialect catalog queries read from.
    ///
    /// SQLite synthesizes its metatables here; backends with a real
    /// information schema have nothing to do.
    async fn prepare_catalog(&self) -> Result<()> {
        Ok(())
    }

    /// Closes the underlying pool.
    async fn close(&self);
}

/// Opens a connection for the backend named by the connection string.
///
/// # Errors
/// - [`DbScoutError::UnsupportedBackend`] when no dialect catalog covers
///   the connection string
/// - [`DbScoutError::DriverUnavailable`] when the dialect exists but its
///   driver is not compiled in
/// - [`DbScoutError::Connection`] when the driver fails to connect
pub async fn connect(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<Box<dyn SqlConnection>> {
    config.validate()?;
    let kind = detect_backend(connection_string)?;
    if !kind.driver_available() {
        return Err(DbScoutError::driver_unavailable(kind, kind.driver_hint()));
    }

    match kind {
        #[cfg(feature = "postgresql")]
        BackendKind::Postgres | BackendKind::Redshift => Ok(Box::new(
            postgres::PostgresConnection::new(connection_string, kind, config).await?,
        )),
        #[cfg(feature = "mysql")]
        BackendKind::MySql => Ok(Box::new(
            mysql::MySqlConnection::new(connection_string, config).await?,
        )),
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Ok(Box::new(
            sqlite::SqliteConnection::new(connection_string, config).await?,
        )),
        other => Err(DbScoutError::driver_unavailable(other, other.driver_hint())),
    }
}

/// Error context for a failed statement, truncated to keep logs readable.
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub(crate) fn statement_context(sql: &str) -> String {
    let head: String = sql.trim().chars().take(48).collect();
    format!("statement '{head}' failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(ConnectionConfig::default().validate().is_ok());

        let zero_pool = ConnectionConfig {
            max_connections: 0,
            ..ConnectionConfig::default()
        };
        assert!(zero_pool.validate().is_err());

        let zero_timeout = ConnectionConfig {
            connect_timeout: Duration::ZERO,
            ..ConnectionConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_unsupported_scheme() {
        let err = connect("oracle://localhost/xe", &ConnectionConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbScoutError::UnsupportedBackend { .. }));
    }

    #[tokio::test]
    async fn test_connect_reports_missing_driver() {
        let err = connect("mssql://localhost/db", &ConnectionConfig::default())
            .await
            .err()
            .unwrap();
        match err {
            DbScoutError::DriverUnavailable { kind, .. } => {
                assert_eq!(kind, BackendKind::SqlServer);
            }
            other => panic!("expected DriverUnavailable, got {other:?}"),
        }
    }
}
