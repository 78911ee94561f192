//! Dialect catalogs: everything dbscout knows about a backend, as data.
//!
//! A [`QueryCatalog`] holds named SQL templates (`{table}`, `{column}`,
//! `{columns}`, `{n}`, `{schemas}` placeholders), the syntax quirks needed
//! to fill them, and the capability story derived from which optional
//! templates a dialect ships. Catalogs are `'static` and immutable; no
//! other module composes catalog SQL.
//!
//! Every system query commits to a fixed positional row shape, decoded
//! here through [`ColumnRow`], [`KeyRow`] and [`ScopedKeyRow`]. Dialects
//! without schema namespaces select a literal `''` for the schema slot.

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod redshift;
pub mod sqlite;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DbScoutError, Result};

/// Backend kinds with a dialect catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// PostgreSQL
    Postgres,
    /// Amazon Redshift (PostgreSQL wire protocol, its own catalog entry)
    Redshift,
    /// MySQL / MariaDB
    MySql,
    /// SQLite
    Sqlite,
    /// Microsoft SQL Server
    #[serde(rename = "mssql")]
    SqlServer,
}

/// All registered backend kinds, in display order.
pub const ALL_BACKENDS: &[BackendKind] = &[
    BackendKind::Postgres,
    BackendKind::Redshift,
    BackendKind::MySql,
    BackendKind::Sqlite,
    BackendKind::SqlServer,
];

impl BackendKind {
    /// Lowercase token used in profiles and connection strings.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Redshift => "redshift",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "mssql",
        }
    }

    /// Parses a profile `dbtype` token.
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redshift" => Ok(Self::Redshift),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            "mssql" | "sqlserver" => Ok(Self::SqlServer),
            other => Err(DbScoutError::unsupported_backend(other)),
        }
    }

    /// Whether a driver for this backend is compiled into the build.
    ///
    /// This is the capability registry: a kind can carry a full catalog
    /// entry while no driver satisfies it, and connecting then fails with
    /// an explicit error instead of an import-time surprise.
    pub const fn driver_available(self) -> bool {
        match self {
            Self::Postgres | Self::Redshift => cfg!(feature = "postgresql"),
            Self::MySql => cfg!(feature = "mysql"),
            Self::Sqlite => cfg!(feature = "sqlite"),
            Self::SqlServer => false,
        }
    }

    /// Human hint for [`DbScoutError::DriverUnavailable`].
    pub const fn driver_hint(self) -> &'static str {
        match self {
            Self::Postgres | Self::Redshift => "rebuild with --features postgresql",
            Self::MySql => "rebuild with --features mysql",
            Self::Sqlite => "rebuild with --features sqlite",
            Self::SqlServer => "no SQL Server driver ships with this build",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detects the backend kind from a connection string.
///
/// URL schemes take precedence; bare paths that look like SQLite database
/// files (and `:memory:`) detect as SQLite.
pub fn detect_backend(connection_string: &str) -> Result<BackendKind> {
    let lowered = connection_string.to_lowercase();
    if lowered.starts_with("postgres://") || lowered.starts_with("postgresql://") {
        return Ok(BackendKind::Postgres);
    }
    if lowered.starts_with("redshift://") {
        return Ok(BackendKind::Redshift);
    }
    if lowered.starts_with("mysql://") {
        return Ok(BackendKind::MySql);
    }
    if lowered.starts_with("mssql://") || lowered.starts_with("sqlserver://") {
        return Ok(BackendKind::SqlServer);
    }
    if lowered.starts_with("sqlite:") || lowered == ":memory:" {
        return Ok(BackendKind::Sqlite);
    }
    if lowered.ends_with(".db") || lowered.ends_with(".sqlite") || lowered.ends_with(".sqlite3") {
        return Ok(BackendKind::Sqlite);
    }
    match connection_string.split("://").next() {
        Some(scheme) if connection_string.contains("://") => {
            Err(DbScoutError::unsupported_backend(scheme))
        }
        _ => Err(DbScoutError::unsupported_backend(connection_string)),
    }
}

/// Templates for single-column query helpers.
#[derive(Debug, Clone, Copy)]
pub struct ColumnQueries {
    pub head: &'static str,
    pub all: &'static str,
    pub unique: &'static str,
    pub sample: &'static str,
}

/// Templates for whole-table query helpers.
#[derive(Debug, Clone, Copy)]
pub struct TableQueries {
    pub select: &'static str,
    pub head: &'static str,
    pub all: &'static str,
    pub unique: &'static str,
    pub sample: &'static str,
    pub count: &'static str,
}

/// Templates for schema introspection.
///
/// The optional members are capabilities: a dialect without
/// `columns_for_schemas` cannot filter by schema allow-list, and one
/// without the `*_for_db` pair cannot batch key resolution.
#[derive(Debug, Clone, Copy)]
pub struct SystemQueries {
    /// List all columns excluding system schemas; rows are [`ColumnRow`]s
    pub columns_no_system: &'static str,
    /// List all columns including system schemas
    pub columns_with_system: &'static str,
    /// List columns for an explicit `{schemas}` allow-list
    pub columns_for_schemas: Option<&'static str>,
    /// Foreign keys declared by `{table}`; rows are [`KeyRow`]s
    pub foreign_keys_for_table: &'static str,
    /// Foreign keys declared by `{table}.{column}`
    pub foreign_keys_for_column: &'static str,
    /// Keys elsewhere referencing `{table}`; rows are [`KeyRow`]s
    pub ref_keys_for_table: &'static str,
    /// Every foreign key in the database; rows are [`ScopedKeyRow`]s
    pub foreign_keys_for_db: Option<&'static str>,
    /// Every referencing key in the database; rows are [`ScopedKeyRow`]s
    pub ref_keys_for_db: Option<&'static str>,
}

/// Per-backend syntax quirks needed when filling templates.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxQuirks {
    /// Whether column lists are interpolated with quoted identifiers
    pub quote_columns: bool,
    /// Opening and closing identifier quote characters
    pub ident_quotes: (char, char),
}

/// Everything dbscout knows about one backend.
#[derive(Debug, Clone, Copy)]
pub struct QueryCatalog {
    pub kind: BackendKind,
    pub column: ColumnQueries,
    pub table: TableQueries,
    pub system: SystemQueries,
    pub quirks: SyntaxQuirks,
}

impl QueryCatalog {
    /// True when the dialect can resolve all keys in two database-wide
    /// queries.
    pub const fn supports_batched_keys(&self) -> bool {
        self.system.foreign_keys_for_db.is_some() && self.system.ref_keys_for_db.is_some()
    }

    /// True when the dialect accepts an explicit schema allow-list.
    pub const fn supports_schema_filter(&self) -> bool {
        self.system.columns_for_schemas.is_some()
    }

    /// Quotes one identifier with the dialect's quote characters.
    pub fn quote_ident(&self, name: &str) -> String {
        let (open, close) = self.quirks.ident_quotes;
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Formats a column list for interpolation; empty renders `*`.
    pub fn format_column_list(&self, names: &[&str]) -> String {
        if names.is_empty() {
            return "*".to_string();
        }
        let rendered: Vec<String> = if self.quirks.quote_columns {
            names.iter().map(|n| self.quote_ident(n)).collect()
        } else {
            names.iter().map(|n| (*n).to_string()).collect()
        };
        rendered.join(", ")
    }

    /// Renders the `FROM` target for a table.
    ///
    /// Bare name when no schema is attached; quoted `schema.table`
    /// otherwise.
    pub fn table_target(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) if !schema.is_empty() => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
            }
            _ => table.to_string(),
        }
    }
}

/// Static catalog lookup; every [`BackendKind`] has exactly one entry.
pub fn catalog(kind: BackendKind) -> &'static QueryCatalog {
    match kind {
        BackendKind::Postgres => &postgres::CATALOG,
        BackendKind::Redshift => &redshift::CATALOG,
        BackendKind::MySql => &mysql::CATALOG,
        BackendKind::Sqlite => &sqlite::CATALOG,
        BackendKind::SqlServer => &mssql::CATALOG,
    }
}

/// Expands `{name}` placeholders in a template.
pub fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut sql = template.to_string();
    for (name, value) in substitutions {
        sql = sql.replace(&format!("{{{name}}}"), value);
    }
    sql
}

/// Doubles single quotes for interpolation into a string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Renders a quoted literal list for the `{schemas}` placeholder.
pub fn format_schema_list(schemas: &[String]) -> String {
    schemas
        .iter()
        .map(|s| format!("'{}'", escape_literal(s)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row of a columns-listing query: (schema, table, column, type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub data_type: String,
}

impl ColumnRow {
    /// Decodes a positionally shaped catalog row.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            schema: opt_text(values, 0),
            table: text(values, 1, "table_name")?,
            column: text(values, 2, "column_name")?,
            data_type: text(values, 3, "data_type")?,
        })
    }
}

/// One row of a per-table key query.
///
/// `column` is on the table the query was issued for; the `other_*`
/// fields identify the far side of the relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub column: String,
    pub other_schema: Option<String>,
    pub other_table: String,
    pub other_column: String,
}

impl KeyRow {
    /// Decodes a positionally shaped key row.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            column: text(values, 0, "column_name")?,
            other_schema: opt_text(values, 1),
            other_table: text(values, 2, "foreign_table_name")?,
            other_column: text(values, 3, "foreign_column_name")?,
        })
    }
}

/// One row of a database-wide key query: the owning table plus a key row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedKeyRow {
    pub table: String,
    pub key: KeyRow,
}

impl ScopedKeyRow {
    /// Decodes a positionally shaped database-wide key row.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        let table = text(values, 0, "table_name")?;
        let key = KeyRow::from_values(values.get(1..).unwrap_or_default())?;
        Ok(Self { table, key })
    }
}

fn text(values: &[Value], index: usize, field: &str) -> Result<String> {
    match values.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(DbScoutError::configuration(format!(
            "catalog row field '{field}' has unexpected shape: {other}"
        ))),
        None => Err(DbScoutError::configuration(format!(
            "catalog row is missing field '{field}' at position {index}"
        ))),
    }
}

fn opt_text(values: &[Value], index: usize) -> Option<String> {
    match values.get(index) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_backend_url_schemes() {
        assert_eq!(
            detect_backend("postgres://user@localhost/db").unwrap(),
            BackendKind::Postgres
        );
        assert_eq!(
            detect_backend("postgresql://localhost/db").unwrap(),
            BackendKind::Postgres
        );
        assert_eq!(
            detect_backend("redshift://cluster:5439/analytics").unwrap(),
            BackendKind::Redshift
        );
        assert_eq!(
            detect_backend("mysql://localhost/db").unwrap(),
            BackendKind::MySql
        );
        assert_eq!(
            detect_backend("mssql://localhost/db").unwrap(),
            BackendKind::SqlServer
        );
    }

    #[test]
    fn test_detect_backend_sqlite_paths() {
        assert_eq!(
            detect_backend("sqlite:///tmp/app.db").unwrap(),
            BackendKind::Sqlite
        );
        assert_eq!(detect_backend(":memory:").unwrap(), BackendKind::Sqlite);
        assert_eq!(
            detect_backend("/var/data/app.sqlite3").unwrap(),
            BackendKind::Sqlite
        );
        assert_eq!(detect_backend("chinook.db").unwrap(), BackendKind::Sqlite);
    }

    #[test]
    fn test_detect_backend_unknown_scheme() {
        let err = detect_backend("oracle://localhost/xe").unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_backend_token_round_trip() {
        for kind in ALL_BACKENDS {
            assert_eq!(BackendKind::from_token(kind.as_str()).unwrap(), *kind);
        }
        assert!(BackendKind::from_token("dbase").is_err());
    }

    #[test]
    fn test_batched_capability_per_dialect() {
        assert!(catalog(BackendKind::Postgres).supports_batched_keys());
        assert!(catalog(BackendKind::Sqlite).supports_batched_keys());
        assert!(!catalog(BackendKind::Redshift).supports_batched_keys());
        assert!(!catalog(BackendKind::MySql).supports_batched_keys());
        assert!(!catalog(BackendKind::SqlServer).supports_batched_keys());
    }

    #[test]
    fn test_schema_filter_capability_per_dialect() {
        assert!(catalog(BackendKind::Postgres).supports_schema_filter());
        assert!(catalog(BackendKind::SqlServer).supports_schema_filter());
        assert!(!catalog(BackendKind::Sqlite).supports_schema_filter());
    }

    #[test]
    fn test_fill_replaces_named_placeholders() {
        let sql = fill(
            "select {column} from {table} limit {n};",
            &[("column", "Name"), ("table", "Artist"), ("n", "6")],
        );
        assert_eq!(sql, "select Name from Artist limit 6;");
    }

    #[test]
    fn test_escape_literal_doubles_quotes() {
        assert_eq!(escape_literal("O'Reilly"), "O''Reilly");
        assert_eq!(format_schema_list(&["public".to_string()]), "'public'");
    }

    #[test]
    fn test_format_column_list_quoting() {
        let pg = catalog(BackendKind::Postgres);
        assert_eq!(pg.format_column_list(&[]), "*");
        assert_eq!(
            pg.format_column_list(&["ArtistId", "Name"]),
            "\"ArtistId\", \"Name\""
        );

        let lite = catalog(BackendKind::Sqlite);
        assert_eq!(lite.format_column_list(&["ArtistId"]), "ArtistId");
    }

    #[test]
    fn test_table_target_qualification() {
        let pg = catalog(BackendKind::Postgres);
        assert_eq!(pg.table_target(None, "Artist"), "Artist");
        assert_eq!(
            pg.table_target(Some("public"), "Artist"),
            "\"public\".\"Artist\""
        );

        let ms = catalog(BackendKind::SqlServer);
        assert_eq!(ms.table_target(Some("dbo"), "Artist"), "[dbo].[Artist]");
    }

    #[test]
    fn test_every_catalog_names_its_placeholders() {
        for kind in ALL_BACKENDS {
            let entry = catalog(*kind);
            assert_eq!(entry.kind, *kind);
            assert!(entry.column.head.contains("{column}"));
            assert!(entry.column.head.contains("{table}"));
            assert!(entry.column.head.contains("{n}"));
            assert!(entry.table.select.contains("{columns}"));
            assert!(entry.table.count.contains("count(*)"));
            assert!(entry.system.foreign_keys_for_table.contains("{table}"));
            assert!(entry.system.foreign_keys_for_column.contains("{column}"));
            assert!(entry.system.ref_keys_for_table.contains("{table}"));
            if let Some(filtered) = entry.system.columns_for_schemas {
                assert!(filtered.contains("{schemas}"));
            }
        }
    }

    #[test]
    fn test_column_row_decode() {
        let row = ColumnRow::from_values(&[
            json!("public"),
            json!("Artist"),
            json!("ArtistId"),
            json!("int4"),
        ])
        .unwrap();
        assert_eq!(row.schema.as_deref(), Some("public"));
        assert_eq!(row.table, "Artist");

        let bare = ColumnRow::from_values(&[
            json!(""),
            json!("Artist"),
            json!("ArtistId"),
            json!("INTEGER"),
        ])
        .unwrap();
        assert_eq!(bare.schema, None);
    }

    #[test]
    fn test_scoped_key_row_decode() {
        let row = ScopedKeyRow::from_values(&[
            json!("Album"),
            json!("ArtistId"),
            json!(""),
            json!("Artist"),
            json!("ArtistId"),
        ])
        .unwrap();
        assert_eq!(row.table, "Album");
        assert_eq!(row.key.column, "ArtistId");
        assert_eq!(row.key.other_table, "Artist");
    }

    #[test]
    fn test_key_row_decode_rejects_short_rows() {
        let err = KeyRow::from_values(&[json!("ArtistId")]).unwrap_err();
        assert!(err.to_string().contains("foreign_table_name"));
    }
}
