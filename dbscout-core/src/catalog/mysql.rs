//! MySQL dialect catalog.
//!
//! Key relationships come straight from
//! `information_schema.key_column_usage` rows where
//! `referenced_table_name` is populated.

use super::{BackendKind, ColumnQueries, QueryCatalog, SyntaxQuirks, SystemQueries, TableQueries};

pub static CATALOG: QueryCatalog = QueryCatalog {
    kind: BackendKind::MySql,
    column: ColumnQueries {
        head: "select {column} from {table} limit {n};",
        all: "select {column} from {table};",
        unique: "select distinct {column} from {table};",
        sample: "select {column} from {table} order by rand() limit {n};",
    },
    table: TableQueries {
        select: "select {columns} from {table};",
        head: "select * from {table} limit {n};",
        all: "select * from {table};",
        unique: "select distinct {columns} from {table};",
        sample: "select * from {table} order by rand() limit {n};",
        count: "select count(*) from {table};",
    },
    system: SystemQueries {
        columns_no_system: r"
            select
                table_schema
                , table_name
                , column_name
                , data_type
            from
                information_schema.columns
            where
                table_schema not in ('information_schema', 'mysql', 'performance_schema', 'sys')
            order by table_schema, table_name, ordinal_position;
        ",
        columns_with_system: r"
            select
                table_schema
                , table_name
                , column_name
                , data_type
            from
                information_schema.columns
            order by table_schema, table_name, ordinal_position;
        ",
        columns_for_schemas: Some(
            r"
            select
                table_schema
                , table_name
                , column_name
                , data_type
            from
                information_schema.columns
            where
                table_schema in ({schemas})
            order by table_schema, table_name, ordinal_position;
        ",
        ),
        foreign_keys_for_table: r"
            select
                kcu.column_name
                , kcu.referenced_table_schema as foreign_table_schema
                , kcu.referenced_table_name as foreign_table_name
                , kcu.referenced_column_name as foreign_column_name
            from
                information_schema.key_column_usage as kcu
            where
                kcu.referenced_table_name is not null
                and kcu.table_name = '{table}';
        ",
        foreign_keys_for_column: r"
            select
                kcu.column_name
                , kcu.referenced_table_schema as foreign_table_schema
                , kcu.referenced_table_name as foreign_table_name
                , kcu.referenced_column_name as foreign_column_name
            from
                information_schema.key_column_usage as kcu
            where
                kcu.referenced_table_name is not null
                and kcu.table_name = '{table}'
                and kcu.column_name = '{column}';
        ",
        ref_keys_for_table: r"
            select
                kcu.referenced_column_name
                , kcu.table_schema as foreign_table_schema
                , kcu.table_name as foreign_table_name
                , kcu.column_name as foreign_column_name
            from
                information_schema.key_column_usage as kcu
            where
                kcu.referenced_table_name is not null
                and kcu.referenced_table_name = '{table}';
        ",
        foreign_keys_for_db: None,
        ref_keys_for_db: None,
    },
    quirks: SyntaxQuirks {
        quote_columns: false,
        ident_quotes: ('`', '`'),
    },
};
