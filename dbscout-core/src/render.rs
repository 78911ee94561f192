//! Terminal and HTML rendering for snapshot entities and query results.
//!
//! Terminal output goes through prettytable grids. The `Display` impls
//! use default options; [`render_table`] takes [`RenderOptions`] for
//! callers that want a different key summary cutoff.

use std::fmt;

use prettytable::{Cell, Row, Table as Grid};
use serde_json::Value as JsonValue;

use crate::models::{Column, ColumnSet, QueryResult, Table, TableSet};

/// Keys shown per column before the summary truncates.
pub const DEFAULT_KEYS_PER_COLUMN: usize = 5;

/// Rendering knobs.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Key relationships listed per column before `(+ N more)`.
    pub keys_per_column: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            keys_per_column: DEFAULT_KEYS_PER_COLUMN,
        }
    }
}

/// HTML `<table>` rendering, the notebook-style counterpart of `Display`.
pub trait ToHtml {
    /// Renders as a plain HTML table.
    fn to_html(&self) -> String;
}

fn grid(headers: &[&str], rows: &[Vec<String>]) -> Grid {
    let mut grid = Grid::new();
    grid.add_row(Row::new(headers.iter().map(|h| Cell::new(h)).collect()));
    for row in rows {
        grid.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }
    grid
}

/// Joins qualified key names, cutting over to `(+ N more)` past the limit.
fn key_summary(keys: &[Column], limit: usize) -> String {
    let shown: Vec<String> = keys.iter().take(limit).map(Column::qualified_name).collect();
    let head = shown.join(", ");
    if keys.len() > limit {
        format!("{head} (+ {} more)", keys.len() - limit)
    } else {
        head
    }
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn qualified_table_name(table: &Table) -> String {
    match &table.schema {
        Some(schema) => format!("{schema}.{}", table.name),
        None => table.name.clone(),
    }
}

/// Renders one table as a column grid.
///
/// The first header cell is the table's own name, the layout dbscout has
/// always printed.
pub fn render_table(table: &Table, options: &RenderOptions) -> Grid {
    let name = qualified_table_name(table);
    let rows: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.data_type.clone(),
                key_summary(&column.foreign_keys, options.keys_per_column),
                key_summary(&column.ref_keys, options.keys_per_column),
            ]
        })
        .collect();
    grid(&[name.as_str(), "Type", "Foreign Keys", "Reference Keys"], &rows)
}

/// Renders the snapshot summary grid.
pub fn render_table_set(set: &TableSet) -> Grid {
    let rows: Vec<Vec<String>> = set
        .iter()
        .map(|table| {
            vec![
                qualified_table_name(table),
                table.columns.len().to_string(),
                table.foreign_keys.len().to_string(),
                table.ref_keys.len().to_string(),
            ]
        })
        .collect();
    grid(&["Table", "Columns", "Foreign Keys", "Reference Keys"], &rows)
}

/// Renders a column search result grid; the schema column appears only
/// when some column carries one.
pub fn render_column_set(set: &ColumnSet) -> Grid {
    let with_schema = set.iter().any(|column| column.schema.is_some());
    let rows: Vec<Vec<String>> = set
        .iter()
        .map(|column| {
            let mut row = Vec::with_capacity(4);
            if with_schema {
                row.push(column.schema.clone().unwrap_or_default());
            }
            row.push(column.table.clone());
            row.push(column.name.clone());
            row.push(column.data_type.clone());
            row
        })
        .collect();
    if with_schema {
        grid(&["Schema", "Table", "Column", "Type"], &rows)
    } else {
        grid(&["Table", "Column", "Type"], &rows)
    }
}

/// Renders a query result grid.
pub fn render_query_result(result: &QueryResult) -> Grid {
    let headers: Vec<&str> = result.columns.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    grid(&headers, &rows)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_table(self, &RenderOptions::default()))
    }
}

impl fmt::Display for TableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(no tables)");
        }
        write!(f, "{}", render_table_set(self))
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(no columns)");
        }
        write!(f, "{}", render_column_set(self))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "(no results)");
        }
        write!(f, "{}", render_query_result(self))
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn html_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::from("<table>\n<tr>");
    for header in headers {
        out.push_str("<th>");
        out.push_str(&html_escape(header));
        out.push_str("</th>");
    }
    out.push_str("</tr>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&html_escape(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>");
    out
}

impl ToHtml for TableSet {
    fn to_html(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .iter()
            .map(|table| {
                vec![
                    qualified_table_name(table),
                    table.columns.len().to_string(),
                    table.foreign_keys.len().to_string(),
                    table.ref_keys.len().to_string(),
                ]
            })
            .collect();
        html_table(&["Table", "Columns", "Foreign Keys", "Reference Keys"], &rows)
    }
}

impl ToHtml for Table {
    fn to_html(&self) -> String {
        let name = qualified_table_name(self);
        let rows: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|column| {
                vec![
                    column.name.clone(),
                    column.data_type.clone(),
                    key_summary(&column.foreign_keys, DEFAULT_KEYS_PER_COLUMN),
                    key_summary(&column.ref_keys, DEFAULT_KEYS_PER_COLUMN),
                ]
            })
            .collect();
        html_table(&[name.as_str(), "Type", "Foreign Keys", "Reference Keys"], &rows)
    }
}

impl ToHtml for ColumnSet {
    fn to_html(&self) -> String {
        // Same conditional layout as `render_column_set`.
        let with_schema = self.iter().any(|column| column.schema.is_some());
        let rows: Vec<Vec<String>> = self
            .iter()
            .map(|column| {
                let mut row = Vec::with_capacity(4);
                if with_schema {
                    row.push(column.schema.clone().unwrap_or_default());
                }
                row.push(column.table.clone());
                row.push(column.name.clone());
                row.push(column.data_type.clone());
                row
            })
            .collect();
        if with_schema {
            html_table(&["Schema", "Table", "Column", "Type"], &rows)
        } else {
            html_table(&["Table", "Column", "Type"], &rows)
        }
    }
}

impl ToHtml for QueryResult {
    fn to_html(&self) -> String {
        let headers: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        html_table(&headers, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyed_column(n: usize) -> Column {
        let mut column = Column::new(None, "Track", "AlbumId", "INTEGER");
        for i in 0..n {
            column
                .foreign_keys
                .push(Column::new(None, format!("T{i}"), "Id", "INTEGER"));
        }
        column
    }

    #[test]
    fn test_key_summary_below_limit() {
        let column = keyed_column(2);
        assert_eq!(key_summary(&column.foreign_keys, 5), "T0.Id, T1.Id");
    }

    #[test]
    fn test_key_summary_truncates() {
        let column = keyed_column(8);
        let summary = key_summary(&column.foreign_keys, 5);
        assert!(summary.ends_with("(+ 3 more)"));
        assert!(summary.starts_with("T0.Id, "));
    }

    #[test]
    fn test_key_summary_empty() {
        assert_eq!(key_summary(&[], 5), "");
    }

    #[test]
    fn test_table_display_uses_name_as_header() {
        let table = Table::new(
            None,
            "Album",
            vec![Column::new(None, "Album", "AlbumId", "INTEGER")],
        );
        let rendered = table.to_string();
        assert!(rendered.contains("Album"));
        assert!(rendered.contains("AlbumId"));
        assert!(rendered.contains("INTEGER"));
    }

    #[test]
    fn test_query_result_display_blanks_nulls() {
        let result = QueryResult::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![json!("x"), json!(null)], vec![json!(7), json!(1.5)]],
        );
        let rendered = result.to_string();
        assert!(rendered.contains('x'));
        assert!(rendered.contains('7'));
        assert!(rendered.contains("1.5"));
        assert!(!rendered.contains("null"));
    }

    #[test]
    fn test_empty_result_display() {
        let result = QueryResult::new(Vec::new(), Vec::new());
        assert_eq!(result.to_string(), "(no results)");
    }

    #[test]
    fn test_html_escapes_cells() {
        let result = QueryResult::new(
            vec!["note".to_string()],
            vec![vec![json!("<b>&</b>")]],
        );
        let html = result.to_html();
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(html.starts_with("<table>"));
    }

    #[test]
    fn test_column_set_display_adds_schema_when_present() {
        let set = ColumnSet::new(vec![
            Column::new(Some("public".to_string()), "users", "id", "int4"),
        ]);
        let rendered = set.to_string();
        assert!(rendered.contains("Schema"));
        assert!(rendered.contains("public"));
    }

    #[test]
    fn test_column_set_html_matches_display_layout() {
        let bare = ColumnSet::new(vec![Column::new(None, "Artist", "Name", "TEXT")]);
        let html = bare.to_html();
        assert!(html.contains("<th>Table</th><th>Column</th><th>Type</th>"));
        assert!(!html.contains("Schema"));

        let scoped = ColumnSet::new(vec![
            Column::new(Some("public".to_string()), "users", "id", "int4"),
            Column::new(None, "users", "email", "text"),
        ]);
        let html = scoped.to_html();
        assert!(html.contains("<th>Schema</th><th>Table</th><th>Column</th><th>Type</th>"));
        assert!(html.contains("<td>public</td><td>users</td><td>id</td><td>int4</td>"));
        // Columns without a schema get an empty cell, keeping rows aligned.
        assert!(html.contains("<td></td><td>users</td><td>email</td><td>text</td>"));
    }
}
