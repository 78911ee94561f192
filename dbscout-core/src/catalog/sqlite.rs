//! SQLite dialect catalog.
//!
//! SQLite has no queryable information schema, so the connection layer
//! synthesizes TEMP metatables from `sqlite_master` and the
//! `table_info`/`foreign_key_list` pragmas before each live refresh:
//!
//! - `tmp_dbscout_schema(table_name, column_name, data_type)`
//! - `tmp_dbscout_keys(table_name, column_name, foreign_table, foreign_column)`
//!
//! Every template here reads those metatables. Both key directions live
//! in one metatable, which is why SQLite exposes the database-wide
//! batched pair alongside the per-table templates.

use super::{BackendKind, ColumnQueries, QueryCatalog, SyntaxQuirks, SystemQueries, TableQueries};

/// Synthesized column listing, rebuilt by the connection layer.
pub const SCHEMA_METATABLE: &str = "tmp_dbscout_schema";

/// Synthesized foreign-key listing, rebuilt by the connection layer.
pub const KEYS_METATABLE: &str = "tmp_dbscout_keys";

pub static CATALOG: QueryCatalog = QueryCatalog {
    kind: BackendKind::Sqlite,
    column: ColumnQueries {
        head: "select {column} from {table} limit {n};",
        all: "select {column} from {table};",
        unique: "select distinct {column} from {table};",
        sample: "select {column} from {table} order by random() limit {n};",
    },
    table: TableQueries {
        select: "select {columns} from {table};",
        head: "select * from {table} limit {n};",
        all: "select * from {table};",
        unique: "select distinct {columns} from {table};",
        sample: "select * from {table} order by random() limit {n};",
        count: "select count(*) from {table};",
    },
    system: SystemQueries {
        columns_no_system: r"
            select
                '' as table_schema
                , table_name
                , column_name
                , data_type
            from tmp_dbscout_schema
            order by rowid;
        ",
        columns_with_system: r"
            select
                '' as table_schema
                , table_name
                , column_name
                , data_type
            from tmp_dbscout_schema
            order by rowid;
        ",
        columns_for_schemas: None,
        foreign_keys_for_table: r"
            select
                column_name
                , '' as foreign_table_schema
                , foreign_table as foreign_table_name
                , foreign_column as foreign_column_name
            from tmp_dbscout_keys
            where table_name = '{table}'
            order by rowid;
        ",
        foreign_keys_for_column: r"
            select
                column_name
                , '' as foreign_table_schema
                , foreign_table as foreign_table_name
                , foreign_column as foreign_column_name
            from tmp_dbscout_keys
            where table_name = '{table}' and column_name = '{column}'
            order by rowid;
        ",
        ref_keys_for_table: r"
            select
                foreign_column
                , '' as foreign_table_schema
                , table_name
                , column_name
            from tmp_dbscout_keys
            where foreign_table = '{table}'
            order by rowid;
        ",
        foreign_keys_for_db: Some(
            r"
            select
                table_name
                , column_name
                , '' as foreign_table_schema
                , foreign_table
                , foreign_column
            from tmp_dbscout_keys
            order by rowid;
        ",
        ),
        ref_keys_for_db: Some(
            r"
            select
                foreign_table
                , foreign_column
                , '' as foreign_table_schema
                , table_name
                , column_name
            from tmp_dbscout_keys
            order by rowid;
        ",
        ),
    },
    quirks: SyntaxQuirks {
        quote_columns: false,
        ident_quotes: ('"', '"'),
    },
};
