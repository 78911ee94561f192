//! Amazon Redshift dialect catalog.
//!
//! Shares the PostgreSQL wire protocol and `information_schema` layout
//! but not the batched key capability: `constraint_column_usage` scans
//! are expensive enough on large clusters that keys resolve per table.

use super::{BackendKind, ColumnQueries, QueryCatalog, SyntaxQuirks, SystemQueries, TableQueries};

pub static CATALOG: QueryCatalog = QueryCatalog {
    kind: BackendKind::Redshift,
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
                table_schema
                , table_name
                , column_name
                , udt_name
            from
                information_schema.columns
            where
                table_schema not in ('information_schema', 'pg_catalog')
            order by table_schema, table_name, ordinal_position;
        ",
        columns_with_system: r"
            select
                table_schema
                , table_name
                , column_name
                , udt_name
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
                , udt_name
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
                , ccu.table_schema as foreign_table_schema
                , ccu.table_name as foreign_table_name
                , ccu.column_name as foreign_column_name
            from
                information_schema.table_constraints as tc
                join information_schema.key_column_usage as kcu
                  on tc.constraint_name = kcu.constraint_name
                join information_schema.constraint_column_usage as ccu
                  on ccu.constraint_name = tc.constraint_name
            where tc.constraint_type = 'FOREIGN KEY' and tc.table_name = '{table}';
        ",
        foreign_keys_for_column: r"
            select
                kcu.column_name
                , ccu.table_schema as foreign_table_schema
                , ccu.table_name as foreign_table_name
                , ccu.column_name as foreign_column_name
            from
                information_schema.table_constraints as tc
                join information_schema.key_column_usage as kcu
                  on tc.constraint_name = kcu.constraint_name
                join information_schema.constraint_column_usage as ccu
                  on ccu.constraint_name = tc.constraint_name
            where tc.constraint_type = 'FOREIGN KEY'
                and tc.table_name = '{table}'
                and kcu.column_name = '{column}';
        ",
        ref_keys_for_table: r"
            select
                ccu.column_name
                , kcu.table_schema as foreign_table_schema
                , kcu.table_name as foreign_table_name
                , kcu.column_name as foreign_column_name
            from
                information_schema.table_constraints as tc
                join information_schema.key_column_usage as kcu
                  on tc.constraint_name = kcu.constraint_name
                join information_schema.constraint_column_usage as ccu
                  on ccu.constraint_name = tc.constraint_name
            where tc.constraint_type = 'FOREIGN KEY' and ccu.table_name = '{table}';
        ",
        foreign_keys_for_db: None,
        ref_keys_for_db: None,
    },
    quirks: SyntaxQuirks {
        quote_columns: true,
        ident_quotes: ('"', '"'),
    },
};
