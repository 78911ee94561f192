//! Schema entities shared across all database backends.
//!
//! A resolved snapshot is a [`TableSet`] of [`Table`]s, each holding its
//! [`Column`]s in catalog order plus the foreign-key and reference-key
//! relationships the backend catalog reported. Entities are plain data:
//! they carry no connection and never change after the resolver publishes
//! them.
//!
//! The `*Record` types mirror the serialized profile envelope. A key stub
//! (a column appearing inside another column's key list) serializes to the
//! four identifying fields `schema`/`table`/`name`/`type`.

use serde::{Deserialize, Serialize};

/// Accessor names reserved on [`Table`].
///
/// A column whose name collides with one of these is addressed through
/// [`Table::column`] as `{table}_{column}` instead. The rename is
/// deterministic and is the whole story for ambiguous column names; no
/// error is ever raised for them.
pub const RESERVED_ACCESSORS: &[&str] = &[
    "name",
    "schema",
    "count",
    "columns",
    "foreign_keys",
    "ref_keys",
];

/// A single column of a resolved table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Owning schema, `None` for backends without schema namespaces
    pub schema: Option<String>,
    /// Owning table name
    pub table: String,
    /// Column name as reported by the catalog
    pub name: String,
    /// Backend-reported type string, never normalized
    pub data_type: String,
    /// Targets of foreign keys declared on this column (stub columns)
    pub foreign_keys: Vec<Column>,
    /// Columns elsewhere that declare a foreign key onto this column (stubs)
    pub ref_keys: Vec<Column>,
}

impl Column {
    /// Creates a column with empty key lists.
    pub fn new(
        schema: Option<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            table: table.into(),
            name: name.into(),
            data_type: data_type.into(),
            foreign_keys: Vec::new(),
            ref_keys: Vec::new(),
        }
    }

    /// `table.name`, the form used in key summaries and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

/// Ordered collection of columns with name lookup.
///
/// Order is whatever the producer supplied: catalog order for a table's
/// columns, snapshot order for search results, key-row order for the
/// flattened key sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    /// Wraps columns preserving their order.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// First column with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Iterates columns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the set holds no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl From<Vec<Column>> for ColumnSet {
    fn from(columns: Vec<Column>) -> Self {
        Self::new(columns)
    }
}

/// A resolved table: columns in catalog order plus aggregated key sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Owning schema, `None` for backends without schema namespaces
    pub schema: Option<String>,
    /// Table name, unique within a snapshot
    pub name: String,
    /// Columns in catalog order
    pub columns: Vec<Column>,
    /// All foreign-key targets declared by this table's columns, flattened
    pub foreign_keys: ColumnSet,
    /// All columns elsewhere referencing this table's columns, flattened
    pub ref_keys: ColumnSet,
}

impl Table {
    /// Builds a table from resolved columns.
    ///
    /// The flattened `foreign_keys`/`ref_keys` sets are derived from the
    /// per-column lists here, so they can never disagree with them.
    pub fn new(schema: Option<String>, name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut foreign_keys = Vec::new();
        let mut ref_keys = Vec::new();
        for column in &columns {
            foreign_keys.extend(column.foreign_keys.iter().cloned());
            ref_keys.extend(column.ref_keys.iter().cloned());
        }
        Self {
            schema,
            name: name.into(),
            columns,
            foreign_keys: ColumnSet::new(foreign_keys),
            ref_keys: ColumnSet::new(ref_keys),
        }
    }

    /// Accessor name for a column of this table.
    ///
    /// Names colliding with [`RESERVED_ACCESSORS`] become
    /// `{table}_{column}`; everything else is the column name unchanged.
    pub fn accessor_for(&self, column_name: &str) -> String {
        if RESERVED_ACCESSORS.contains(&column_name) {
            format!("{}_{}", self.name, column_name)
        } else {
            column_name.to_string()
        }
    }

    /// Looks up a column by accessor name.
    ///
    /// A column named `count` on table `Invoice` is found as
    /// `Invoice_count`, not `count`.
    pub fn column(&self, accessor: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| self.accessor_for(&c.name) == accessor)
    }

    /// Column names in catalog order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Lexicographically ordered collection of tables; the snapshot type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    /// Wraps tables, sorting them by name.
    pub fn new(mut tables: Vec<Table>) -> Self {
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Self { tables }
    }

    /// Table with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Iterates tables in name order.
    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when the snapshot holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in order.
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Serializable records for every table, in snapshot order.
    pub fn to_records(&self) -> Vec<TableRecord> {
        self.tables.iter().map(TableRecord::from).collect()
    }

    /// Rebuilds a snapshot from serialized records.
    pub fn from_records(records: Vec<TableRecord>) -> Self {
        Self::new(records.into_iter().map(TableRecord::into_table).collect())
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// Tabular result of a query helper or raw query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column headers in select order
    pub columns: Vec<String>,
    /// Row cells, positionally matching `columns`
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// Creates a result set.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows came back.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialized form of one column.
///
/// Key stubs round-trip through the four identifying fields; the key
/// lists are skipped when empty so stubs keep the compact legacy shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    /// Owning schema, null for backends without schemas
    pub schema: Option<String>,
    /// Owning table name
    pub table: String,
    /// Column name
    pub name: String,
    /// Backend-reported type string
    #[serde(rename = "type")]
    pub data_type: String,
    /// Foreign-key target stubs, absent when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ColumnRecord>,
    /// Referencing-column stubs, absent when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ref_keys: Vec<ColumnRecord>,
}

impl From<&Column> for ColumnRecord {
    fn from(column: &Column) -> Self {
        Self {
            schema: column.schema.clone(),
            table: column.table.clone(),
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            foreign_keys: column.foreign_keys.iter().map(Self::from).collect(),
            ref_keys: column.ref_keys.iter().map(Self::from).collect(),
        }
    }
}

impl ColumnRecord {
    /// Rebuilds the column, key stubs included.
    pub fn into_column(self) -> Column {
        Column {
            schema: self.schema,
            table: self.table,
            name: self.name,
            data_type: self.data_type,
            foreign_keys: self
                .foreign_keys
                .into_iter()
                .map(Self::into_column)
                .collect(),
            ref_keys: self.ref_keys.into_iter().map(Self::into_column).collect(),
        }
    }
}

/// Serialized form of a column set, the `{"columns": [...]}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColumnSetRecord {
    /// Member columns in set order
    pub columns: Vec<ColumnRecord>,
}

impl From<&ColumnSet> for ColumnSetRecord {
    fn from(set: &ColumnSet) -> Self {
        Self {
            columns: set.iter().map(ColumnRecord::from).collect(),
        }
    }
}

/// Serialized form of one table, the profile cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// Owning schema
    pub schema: Option<String>,
    /// Table name
    pub name: String,
    /// Columns in catalog order, carrying their key stubs
    pub columns: Vec<ColumnRecord>,
    /// Flattened foreign-key targets (derived; kept for the envelope shape)
    #[serde(default)]
    pub foreign_keys: ColumnSetRecord,
    /// Flattened referencing columns (derived; kept for the envelope shape)
    #[serde(default)]
    pub ref_keys: ColumnSetRecord,
}

impl From<&Table> for TableRecord {
    fn from(table: &Table) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
            columns: table.columns.iter().map(ColumnRecord::from).collect(),
            foreign_keys: ColumnSetRecord::from(&table.foreign_keys),
            ref_keys: ColumnSetRecord::from(&table.ref_keys),
        }
    }
}

impl TableRecord {
    /// Rebuilds the table from its columns.
    ///
    /// The flattened key sets are recomputed by [`Table::new`], so a
    /// hand-edited envelope cannot desynchronize them.
    pub fn into_table(self) -> Table {
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .map(ColumnRecord::into_column)
            .collect();
        Table::new(self.schema, self.name, columns)
    }
}
