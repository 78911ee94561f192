//! Schema resolution: catalog rows in, an atomic snapshot out.
//!
//! [`SchemaResolver::resolve`] runs the whole refresh pipeline on one
//! connection, strictly one query at a time: list columns, group them
//! into table drafts, fetch key relationships (database-wide when the
//! dialect offers batched queries, two queries per table otherwise),
//! then build every [`Table`] off to the side. The shared snapshot is
//! swapped only after the last table resolves, so a failure anywhere
//! leaves the previous snapshot untouched and queryable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info};

use crate::catalog::{
    ColumnRow, KeyRow, QueryCatalog, ScopedKeyRow, catalog, escape_literal, fill,
    format_schema_list,
};
use crate::connection::SqlConnection;
use crate::error::{DbScoutError, Result};
use crate::models::{Column, Table, TableRecord, TableSet};

/// How key relationships are fetched during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyResolution {
    /// Batched when the dialect has database-wide key queries, otherwise
    /// per-table.
    #[default]
    Auto,
    /// Require the database-wide pair; dialects without it refuse.
    Batched,
    /// Two key queries per table.
    PerTable,
}

/// Options for a schema refresh.
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Also list system schemas (`information_schema` and friends).
    pub include_system: bool,
    /// Restrict the refresh to these schemas; requires a dialect with a
    /// schema-filtered column listing.
    pub schemas: Option<Vec<String>>,
    /// Rebuild from cached table records when available, skipping every
    /// catalog query.
    pub use_cache: bool,
    /// Key fetch strategy.
    pub key_resolution: KeyResolution,
}

/// Per-table key rows in catalog order.
type KeyMap = HashMap<String, Vec<KeyRow>>;

/// A table mid-grouping: first-seen schema plus (column, data type)
/// pairs in catalog row order.
#[derive(Debug)]
struct TableDraft {
    schema: Option<String>,
    columns: Vec<(String, String)>,
}

enum KeySide {
    Foreign,
    Referencing,
}

/// Builds snapshots and owns the published one.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    snapshot: RwLock<Option<Arc<TableSet>>>,
    cached_records: RwLock<Option<Vec<TableRecord>>>,
}

impl SchemaResolver {
    /// Creates a resolver with no snapshot and no cached records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver seeded with records from a profile cache.
    pub fn with_cached_records(records: Vec<TableRecord>) -> Self {
        Self {
            snapshot: RwLock::new(None),
            cached_records: RwLock::new(Some(records)),
        }
    }

    /// The currently published snapshot, if any refresh has completed.
    pub fn snapshot(&self) -> Option<Arc<TableSet>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the cached records consulted by `use_cache` refreshes.
    pub fn store_cached_records(&self, records: Vec<TableRecord>) {
        *self
            .cached_records
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(records);
    }

    /// Runs a refresh and publishes the resulting snapshot.
    ///
    /// # Errors
    /// - [`DbScoutError::CatalogQuery`] when a catalog query fails
    /// - [`DbScoutError::DanglingKeyReference`] when a key row names a
    ///   column absent from the snapshot
    /// - [`DbScoutError::Configuration`] when the options ask for a
    ///   capability the dialect lacks
    pub async fn resolve(
        &self,
        conn: &dyn SqlConnection,
        options: &RefreshOptions,
    ) -> Result<Arc<TableSet>> {
        if options.use_cache {
            let cached = self
                .cached_records
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(records) = cached {
                debug!(tables = records.len(), "rebuilding snapshot from cached records");
                let set = Arc::new(TableSet::from_records(records));
                self.publish(Arc::clone(&set));
                return Ok(set);
            }
        }

        let started = Instant::now();
        let cat = catalog(conn.kind());

        conn.prepare_catalog()
            .await
            .map_err(|e| DbScoutError::catalog_query("preparing catalog metadata", e))?;

        let drafts = fetch_columns(conn, cat, options).await?;
        let (foreign, referencing) = fetch_keys(conn, cat, options, &drafts).await?;
        let key_rows = foreign.values().map(Vec::len).sum::<usize>()
            + referencing.values().map(Vec::len).sum::<usize>();

        let tables = build_tables(&drafts, &foreign, &referencing)?;
        let set = Arc::new(TableSet::new(tables));

        info!(
            backend = %conn.kind(),
            tables = set.len(),
            keys = key_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "schema refresh complete"
        );
        self.publish(Arc::clone(&set));
        Ok(set)
    }

    fn publish(&self, set: Arc<TableSet>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(set);
    }
}

/// Picks the column listing for the refresh options: the schema-filtered
/// template when an allow-list is set (refused by dialects without one),
/// otherwise the system or user listing.
fn column_listing_sql(cat: &QueryCatalog, options: &RefreshOptions) -> Result<String> {
    match &options.schemas {
        Some(schemas) => {
            let template = cat.system.columns_for_schemas.ok_or_else(|| {
                DbScoutError::configuration(format!(
                    "{} has no schema-filtered column listing",
                    cat.kind
                ))
            })?;
            Ok(fill(template, &[("schemas", &format_schema_list(schemas))]))
        }
        None if options.include_system => Ok(cat.system.columns_with_system.to_string()),
        None => Ok(cat.system.columns_no_system.to_string()),
    }
}

async fn fetch_columns(
    conn: &dyn SqlConnection,
    cat: &QueryCatalog,
    options: &RefreshOptions,
) -> Result<BTreeMap<String, TableDraft>> {
    let sql = column_listing_sql(cat, options)?;

    let result = conn
        .fetch(&sql)
        .await
        .map_err(|e| DbScoutError::catalog_query("listing columns", e))?;
    let mut rows = Vec::with_capacity(result.len());
    for values in &result.rows {
        rows.push(ColumnRow::from_values(values)?);
    }
    debug!(columns = rows.len(), "column listing fetched");
    Ok(group_columns(rows))
}

/// Groups column rows by table name, preserving catalog row order within
/// each table. The map iterates tables lexicographically. Tables of the
/// same name in different schemas merge under the first-seen schema, as
/// the column listing is ordered by schema then table.
fn group_columns(rows: Vec<ColumnRow>) -> BTreeMap<String, TableDraft> {
    let mut drafts: BTreeMap<String, TableDraft> = BTreeMap::new();
    for ColumnRow {
        schema,
        table,
        column,
        data_type,
    } in rows
    {
        let draft = drafts.entry(table).or_insert_with(|| TableDraft {
            schema: schema.clone(),
            columns: Vec::new(),
        });
        draft.columns.push((column, data_type));
    }
    drafts
}

fn batched_strategy(requested: KeyResolution, cat: &QueryCatalog) -> Result<bool> {
    match requested {
        KeyResolution::Auto => Ok(cat.supports_batched_keys()),
        KeyResolution::Batched => {
            if cat.supports_batched_keys() {
                Ok(true)
            } else {
                Err(DbScoutError::configuration(format!(
                    "{} has no database-wide key queries; use per-table resolution",
                    cat.kind
                )))
            }
        }
        KeyResolution::PerTable => Ok(false),
    }
}

async fn fetch_keys(
    conn: &dyn SqlConnection,
    cat: &QueryCatalog,
    options: &RefreshOptions,
    drafts: &BTreeMap<String, TableDraft>,
) -> Result<(KeyMap, KeyMap)> {
    if batched_strategy(options.key_resolution, cat)?
        && let (Some(fk_sql), Some(ref_sql)) =
            (cat.system.foreign_keys_for_db, cat.system.ref_keys_for_db)
    {
        debug!("resolving keys with database-wide queries");
        let foreign = fetch_scoped_keys(conn, fk_sql, "listing foreign keys").await?;
        let referencing = fetch_scoped_keys(conn, ref_sql, "listing reference keys").await?;
        return Ok((foreign, referencing));
    }

    debug!(tables = drafts.len(), "resolving keys table by table");
    let mut foreign = KeyMap::new();
    let mut referencing = KeyMap::new();
    for name in drafts.keys() {
        let escaped = escape_literal(name);
        let fk_sql = fill(cat.system.foreign_keys_for_table, &[("table", &escaped)]);
        let rows = fetch_key_rows(conn, &fk_sql, name, "foreign keys").await?;
        if !rows.is_empty() {
            foreign.insert(name.clone(), rows);
        }
        let ref_sql = fill(cat.system.ref_keys_for_table, &[("table", &escaped)]);
        let rows = fetch_key_rows(conn, &ref_sql, name, "reference keys").await?;
        if !rows.is_empty() {
            referencing.insert(name.clone(), rows);
        }
    }
    Ok((foreign, referencing))
}

async fn fetch_scoped_keys(
    conn: &dyn SqlConnection,
    sql: &str,
    what: &str,
) -> Result<KeyMap> {
    let result = conn
        .fetch(sql)
        .await
        .map_err(|e| DbScoutError::catalog_query(what, e))?;
    let mut map = KeyMap::new();
    for values in &result.rows {
        let row = ScopedKeyRow::from_values(values)?;
        map.entry(row.table).or_default().push(row.key);
    }
    Ok(map)
}

async fn fetch_key_rows(
    conn: &dyn SqlConnection,
    sql: &str,
    table: &str,
    what: &str,
) -> Result<Vec<KeyRow>> {
    let result = conn
        .fetch(sql)
        .await
        .map_err(|e| DbScoutError::catalog_query(format!("{what} for table '{table}'"), e))?;
    let mut rows = Vec::with_capacity(result.len());
    for values in &result.rows {
        rows.push(KeyRow::from_values(values)?);
    }
    Ok(rows)
}

/// Builds every table from its draft and key rows.
///
/// Key stubs carry the owning column's resolved data type, and both
/// endpoints of every key row must exist in the snapshot; a miss fails
/// the whole refresh rather than silently dropping the edge.
fn build_tables(
    drafts: &BTreeMap<String, TableDraft>,
    foreign: &KeyMap,
    referencing: &KeyMap,
) -> Result<Vec<Table>> {
    let mut tables = Vec::with_capacity(drafts.len());
    for (name, draft) in drafts {
        let mut columns: Vec<Column> = draft
            .columns
            .iter()
            .map(|(column, data_type)| {
                Column::new(draft.schema.clone(), name.clone(), column.clone(), data_type.clone())
            })
            .collect();
        if let Some(rows) = foreign.get(name) {
            for row in rows {
                attach_key(&mut columns, drafts, name, row, KeySide::Foreign)?;
            }
        }
        if let Some(rows) = referencing.get(name) {
            for row in rows {
                attach_key(&mut columns, drafts, name, row, KeySide::Referencing)?;
            }
        }
        tables.push(Table::new(draft.schema.clone(), name.clone(), columns));
    }
    Ok(tables)
}

fn attach_key(
    columns: &mut [Column],
    drafts: &BTreeMap<String, TableDraft>,
    table: &str,
    row: &KeyRow,
    side: KeySide,
) -> Result<()> {
    let Some(position) = columns.iter().position(|c| c.name == row.column) else {
        return Err(DbScoutError::dangling_key(
            table,
            &row.column,
            format!("{}.{}", row.other_table, row.other_column),
        ));
    };
    let target_known = drafts
        .get(&row.other_table)
        .is_some_and(|d| d.columns.iter().any(|(c, _)| c == &row.other_column));
    if !target_known {
        return Err(DbScoutError::dangling_key(
            table,
            &row.column,
            format!("{}.{}", row.other_table, row.other_column),
        ));
    }

    let schema = row
        .other_schema
        .clone()
        .or_else(|| drafts.get(&row.other_table).and_then(|d| d.schema.clone()));
    let stub = Column::new(
        schema,
        row.other_table.clone(),
        row.other_column.clone(),
        columns[position].data_type.clone(),
    );
    match side {
        KeySide::Foreign => columns[position].foreign_keys.push(stub),
        KeySide::Referencing => columns[position].ref_keys.push(stub),
    }
    Ok(())
}
