//! H2 dialect.
//!
//! H2's `information_schema.COLUMNS` has no column-key field, so the query
//! joins `information_schema.CONSTRAINTS` and the constraint's comma-separated
//! `COLUMN_LIST` is parsed to decide which columns are primary or unique.
//! The join yields one row per (column, constraint) pair; rows for the same
//! column are merged.

use crate::connection::MetadataRow;
use crate::schema::{ColumnData, StateMap, TableData};

use super::{prefix_filter, Dialect};

const METADATA_QUERY: &str = "SELECT \
     col.TABLE_NAME AS table_name, \
     col.COLUMN_NAME AS column_name, \
     col.COLUMN_DEFAULT AS column_default, \
     col.IS_NULLABLE AS is_nullable, \
     col.TYPE_NAME AS type_name, \
     CAST(col.CHARACTER_MAXIMUM_LENGTH AS VARCHAR) AS character_maximum_length, \
     CAST(col.NUMERIC_PRECISION AS VARCHAR) AS numeric_precision, \
     CAST(col.NUMERIC_SCALE AS VARCHAR) AS numeric_scale, \
     con.CONSTRAINT_TYPE AS constraint_type, \
     con.COLUMN_LIST AS column_list \
     FROM information_schema.COLUMNS AS col \
     LEFT JOIN information_schema.CONSTRAINTS AS con \
     ON col.TABLE_NAME = con.TABLE_NAME AND col.TABLE_SCHEMA = con.TABLE_SCHEMA \
     WHERE col.TABLE_SCHEMA <> 'INFORMATION_SCHEMA'";

/// Marker H2 puts in the default expression of identity columns.
const IDENTITY_MARKER: &str = "SYSTEM_SEQUENCE";

/// H2 dialect.
#[derive(Debug, Clone, Default)]
pub struct H2Dialect;

impl H2Dialect {
    /// Creates a new H2 dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn column_from_row(&self, row: &MetadataRow) -> ColumnData {
        let type_name = row.text_or_empty("type_name").to_uppercase();
        let mut column = ColumnData::new(
            row.text_or_empty("column_name"),
            self.translator().translate(&type_name),
        );

        let default = row.text("column_default").map(|d| d.replace('\'', ""));
        column.increment = default
            .as_deref()
            .is_some_and(|d| d.contains(IDENTITY_MARKER));
        column.default_value = default.filter(|d| !d.contains(IDENTITY_MARKER));

        column.nullable = row.text_or_empty("is_nullable").eq_ignore_ascii_case("yes");
        column.length = row.number("character_maximum_length");
        column.precision = row.number("numeric_precision");
        column.scale = row.number("numeric_scale");

        let column_list = row.text_or_empty("column_list");
        if !column_list.trim().is_empty() {
            let name = column.name.to_lowercase();
            let listed = column_list
                .to_lowercase()
                .split(',')
                .any(|c| c.trim() == name);
            let constraint_type = row.text_or_empty("constraint_type").to_lowercase();

            column.unique = listed && constraint_type.contains("unique");
            column.primary = listed && constraint_type.contains("primary");
        }

        column
    }
}

impl Dialect for H2Dialect {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn supports_collation(&self) -> bool {
        false
    }

    /// H2 table engines are Java classes, not storage engine names.
    fn engine(&self, _engine: &str) -> String {
        String::new()
    }

    fn metadata_query(&self, prefixes: &[String]) -> String {
        match prefix_filter("col.TABLE_NAME", prefixes) {
            Some(filter) => format!(
                "{} AND {} ORDER BY col.TABLE_NAME, col.ORDINAL_POSITION",
                METADATA_QUERY, filter
            ),
            None => format!(
                "{} ORDER BY col.TABLE_NAME, col.ORDINAL_POSITION",
                METADATA_QUERY
            ),
        }
    }

    fn read_metadata(&self, rows: &[MetadataRow]) -> StateMap {
        let mut tables = StateMap::new();

        for row in rows {
            let table_name = row.text_or_empty("table_name");
            let table = tables
                .entry(table_name.to_lowercase())
                .or_insert_with(|| TableData::new(table_name));

            let column = self.column_from_row(row);
            match table.column_ignore_case_mut(&column.name) {
                Some(existing) => {
                    existing.primary |= column.primary;
                    existing.unique |= column.unique;
                }
                None => table.add_column(column),
            }
        }

        tables
    }
}
