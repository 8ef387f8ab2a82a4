//! MySQL dialect.
//!
//! Reads `information_schema.COLUMNS` for the current database. The
//! `column_key` field carries `PRI`/`UNI` markers and `extra` carries
//! `auto_increment`, so a single query describes every column.

use crate::connection::MetadataRow;
use crate::schema::{ColumnData, StateMap, TableData};

use super::{prefix_filter, Dialect};

const METADATA_QUERY: &str = "SELECT \
     CAST(TABLE_NAME AS CHAR) AS table_name, \
     CAST(COLUMN_NAME AS CHAR) AS column_name, \
     CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
     CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
     CAST(DATA_TYPE AS CHAR) AS data_type, \
     CAST(CHARACTER_MAXIMUM_LENGTH AS CHAR) AS character_maximum_length, \
     CAST(NUMERIC_PRECISION AS CHAR) AS numeric_precision, \
     CAST(NUMERIC_SCALE AS CHAR) AS numeric_scale, \
     CAST(CHARACTER_SET_NAME AS CHAR) AS character_set_name, \
     CAST(COLLATION_NAME AS CHAR) AS collation_name, \
     CAST(COLUMN_KEY AS CHAR) AS column_key, \
     CAST(EXTRA AS CHAR) AS extra \
     FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE()";

/// MySQL (and MariaDB) dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn column_from_row(&self, row: &MetadataRow) -> ColumnData {
        let data_type = row.text_or_empty("data_type");
        let mut column = ColumnData::new(
            row.text_or_empty("column_name"),
            self.translator().translate(data_type),
        );

        column.default_value = normalize_default(row.text("column_default"));
        column.nullable = row.text_or_empty("is_nullable").eq_ignore_ascii_case("yes");
        column.length = row.number("character_maximum_length");
        column.precision = row.number("numeric_precision");
        column.scale = row.number("numeric_scale");
        column.character_set = row.text_or_empty("character_set_name").to_string();
        column.collate = row.text_or_empty("collation_name").to_string();

        let column_key = row.text_or_empty("column_key").to_lowercase();
        column.unique = column_key.contains("uni");
        column.primary = column_key.contains("pri");
        column.increment = row
            .text_or_empty("extra")
            .to_lowercase()
            .contains("auto_increment");

        column
    }
}

/// MariaDB reports defaults as quoted literals and a missing default as the
/// text `NULL`; MySQL reports the bare value or SQL NULL.
fn normalize_default(raw: Option<&str>) -> Option<String> {
    let value = raw?;
    if value.eq_ignore_ascii_case("null") {
        return None;
    }
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value);
    Some(unquoted.to_string())
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn metadata_query(&self, prefixes: &[String]) -> String {
        match prefix_filter("TABLE_NAME", prefixes) {
            Some(filter) => format!(
                "{} AND {} ORDER BY TABLE_NAME, ORDINAL_POSITION",
                METADATA_QUERY, filter
            ),
            None => format!("{} ORDER BY TABLE_NAME, ORDINAL_POSITION", METADATA_QUERY),
        }
    }

    fn read_metadata(&self, rows: &[MetadataRow]) -> StateMap {
        let mut tables = StateMap::new();

        for row in rows {
            let table_name = row.text_or_empty("table_name");
            let table = tables
                .entry(table_name.to_lowercase())
                .or_insert_with(|| TableData::new(table_name));
            table.add_column(self.column_from_row(row));
        }

        tables
    }
}
