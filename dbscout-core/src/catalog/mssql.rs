//! SQL Server dialect catalog.
//!
//! No driver for SQL Server ships with this build; the entry exists so
//! capability checks and profile handling stay uniform, and so a driver
//! can be added without touching anything but the connection layer.
//!
//! Key queries walk `sys.foreign_key_columns` joined to `sys.columns`
//! and `sys.tables`, which covers both directions of a relationship.
//! Sampling orders by `newid()`; `rand()` evaluates once per query on
//! SQL Server and shuffles nothing.

use super::{BackendKind, ColumnQueries, QueryCatalog, SyntaxQuirks, SystemQueries, TableQueries};

pub static CATALOG: QueryCatalog = QueryCatalog {
    kind: BackendKind::SqlServer,
    column: ColumnQueries {
        head: "select top {n} {column} from {table};",
        all: "select {column} from {table};",
        unique: "select distinct {column} from {table};",
        sample: "select top {n} {column} from {table} order by newid();",
    },
    table: TableQueries {
        select: "select {columns} from {table};",
        head: "select top {n} * from {table};",
        all: "select * from {table};",
        unique: "select distinct {columns} from {table};",
        sample: "select top {n} * from {table} order by newid();",
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
                table_schema not in ('information_schema', 'sys')
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
                pc.name as column_name
                , schema_name(rt.schema_id) as foreign_table_schema
                , rt.name as foreign_table_name
                , rc.name as foreign_column_name
            from sys.foreign_key_columns as fkc
                join sys.columns as pc
                  on pc.object_id = fkc.parent_object_id
                 and pc.column_id = fkc.parent_column_id
                join sys.columns as rc
                  on rc.object_id = fkc.referenced_object_id
                 and rc.column_id = fkc.referenced_column_id
                join sys.tables as rt
                  on rt.object_id = fkc.referenced_object_id
            where object_name(fkc.parent_object_id) = '{table}';
        ",
        foreign_keys_for_column: r"
            select
                pc.name as column_name
                , schema_name(rt.schema_id) as foreign_table_schema
                , rt.name as foreign_table_name
                , rc.name as foreign_column_name
            from sys.foreign_key_columns as fkc
                join sys.columns as pc
                  on pc.object_id = fkc.parent_object_id
                 and pc.column_id = fkc.parent_column_id
                join sys.columns as rc
                  on rc.object_id = fkc.referenced_object_id
                 and rc.column_id = fkc.referenced_column_id
                join sys.tables as rt
                  on rt.object_id = fkc.referenced_object_id
            where object_name(fkc.parent_object_id) = '{table}'
                and pc.name = '{column}';
        ",
        ref_keys_for_table: r"
            select
                rc.name as column_name
                , schema_name(pt.schema_id) as foreign_table_schema
                , pt.name as foreign_table_name
                , pc.name as foreign_column_name
            from sys.foreign_key_columns as fkc
                join sys.columns as pc
                  on pc.object_id = fkc.parent_object_id
                 and pc.column_id = fkc.parent_column_id
                join sys.columns as rc
                  on rc.object_id = fkc.referenced_object_id
                 and rc.column_id = fkc.referenced_column_id
                join sys.tables as pt
                  on pt.object_id = fkc.parent_object_id
            where object_name(fkc.referenced_object_id) = '{table}';
        ",
        foreign_keys_for_db: None,
        ref_keys_for_db: None,
    },
    quirks: SyntaxQuirks {
        quote_columns: false,
        ident_quotes: ('[', ']'),
    },
};
