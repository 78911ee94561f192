//! Glob search over a resolved snapshot.
//!
//! Patterns use fnmatch semantics (`*`, `?`, `[...]`) via the `glob`
//! crate and match case-sensitively against bare table and column names.
//! Results keep snapshot order, so repeated searches over the same
//! snapshot return identical sets.

use glob::Pattern;

use crate::error::{DbScoutError, Result};
use crate::models::{Column, ColumnSet, TableSet};

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| {
        DbScoutError::configuration(format!("Invalid glob pattern '{pattern}': {e}"))
    })
}

/// Tables whose name matches the pattern.
///
/// # Errors
/// Returns [`DbScoutError::Configuration`] for an invalid pattern.
pub fn find_table(snapshot: &TableSet, pattern: &str) -> Result<TableSet> {
    let matcher = compile(pattern)?;
    let tables = snapshot
        .iter()
        .filter(|table| matcher.matches(&table.name))
        .cloned()
        .collect();
    Ok(TableSet::new(tables))
}

/// Columns across all tables whose name matches the pattern.
///
/// # Errors
/// Returns [`DbScoutError::Configuration`] for an invalid pattern.
pub fn find_column(snapshot: &TableSet, pattern: &str) -> Result<ColumnSet> {
    find_column_filtered(snapshot, pattern, &[])
}

/// Like [`find_column`], keeping only columns whose reported data type
/// exactly matches one of `data_types` (no filter when empty).
///
/// # Errors
/// Returns [`DbScoutError::Configuration`] for an invalid pattern.
pub fn find_column_filtered(
    snapshot: &TableSet,
    pattern: &str,
    data_types: &[&str],
) -> Result<ColumnSet> {
    let matcher = compile(pattern)?;
    let columns: Vec<Column> = snapshot
        .iter()
        .flat_map(|table| table.columns.iter())
        .filter(|column| matcher.matches(&column.name))
        .filter(|column| {
            data_types.is_empty() || data_types.contains(&column.data_type.as_str())
        })
        .cloned()
        .collect();
    Ok(ColumnSet::new(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;

    fn chinook_snapshot() -> TableSet {
        let artist = Table::new(
            None,
            "Artist",
            vec![
                Column::new(None, "Artist", "ArtistId", "INTEGER"),
                Column::new(None, "Artist", "Name", "TEXT"),
            ],
        );
        let album = Table::new(
            None,
            "Album",
            vec![
                Column::new(None, "Album", "AlbumId", "INTEGER"),
                Column::new(None, "Album", "Title", "TEXT"),
                Column::new(None, "Album", "ArtistId", "INTEGER"),
            ],
        );
        let track = Table::new(
            None,
            "Track",
            vec![
                Column::new(None, "Track", "TrackId", "INTEGER"),
                Column::new(None, "Track", "Name", "TEXT"),
                Column::new(None, "Track", "AlbumId", "INTEGER"),
                Column::new(None, "Track", "Composer", "TEXT"),
            ],
        );
        TableSet::new(vec![artist, album, track])
    }

    #[test]
    fn test_find_table_prefix_pattern() {
        let snapshot = chinook_snapshot();
        let hits = find_table(&snapshot, "A*").unwrap();
        assert_eq!(hits.names(), ["Album", "Artist"]);
    }

    #[test]
    fn test_find_table_no_match_is_empty() {
        let snapshot = chinook_snapshot();
        assert!(find_table(&snapshot, "Z*").unwrap().is_empty());
    }

    #[test]
    fn test_find_column_suffix_pattern() {
        let snapshot = chinook_snapshot();
        let hits = find_column(&snapshot, "*Id").unwrap();
        assert_eq!(hits.len(), 5);
        let qualified: Vec<String> = hits.iter().map(Column::qualified_name).collect();
        assert_eq!(
            qualified,
            [
                "Album.AlbumId",
                "Album.ArtistId",
                "Artist.ArtistId",
                "Track.TrackId",
                "Track.AlbumId",
            ]
        );
    }

    #[test]
    fn test_find_column_is_case_sensitive() {
        let snapshot = chinook_snapshot();
        assert!(find_column(&snapshot, "*id").unwrap().is_empty());
    }

    #[test]
    fn test_find_column_data_type_filter() {
        let snapshot = chinook_snapshot();
        let text_names = find_column_filtered(&snapshot, "*", &["TEXT"]).unwrap();
        assert_eq!(text_names.len(), 4);
        let composers = find_column_filtered(&snapshot, "Composer", &["INTEGER"]).unwrap();
        assert!(composers.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let snapshot = chinook_snapshot();
        let err = find_table(&snapshot, "[unclosed").unwrap_err();
        assert!(matches!(err, DbScoutError::Configuration { .. }));
    }
}
