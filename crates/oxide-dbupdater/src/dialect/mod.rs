//! Database dialect implementations.
//!
//! A dialect knows how to render DDL for its engine and how to read the
//! engine's catalog back into [`TableData`]. The provided trait methods
//! render MySQL-flavoured DDL; dialects override only what differs.

mod h2;
mod mysql;

pub use h2::H2Dialect;
pub use mysql::MySqlDialect;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::connection::{MetadataRow, SchemaConnection};
use crate::error::{Result, UpdaterError};
use crate::schema::{ColumnData, StateMap, TableData};
use crate::types::{BasicTypeTranslator, TypeTranslator};

static BASIC_TRANSLATOR: BasicTypeTranslator = BasicTypeTranslator;

/// Trait for database-specific DDL rendering and schema introspection.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the short name the dialect is registered under.
    fn name(&self) -> &'static str;

    /// Returns the translator used for both desired and introspected types.
    fn translator(&self) -> &dyn TypeTranslator {
        &BASIC_TRANSLATOR
    }

    /// Returns whether character set and collation clauses are emitted.
    fn supports_collation(&self) -> bool {
        true
    }

    /// Returns the verb that redefines a column in `ALTER TABLE`.
    fn modify_verb(&self) -> &'static str {
        "MODIFY"
    }

    /// Returns the catalog query listing the columns of tables whose name
    /// starts with any of `prefixes`.
    fn metadata_query(&self, prefixes: &[String]) -> String;

    /// Groups catalog rows into tables keyed by lowercased table name.
    fn read_metadata(&self, rows: &[MetadataRow]) -> StateMap;

    /// Quote an identifier (table name, column name).
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name)
    }

    /// Returns the `ALTER TABLE` head for a table.
    fn alter_table(&self, table: &str) -> String {
        format!("ALTER TABLE {}", self.quote_identifier(table))
    }

    /// Returns the character set clause, or an empty string.
    fn character_set(&self, character_set: &str) -> String {
        if character_set.is_empty() || !self.supports_collation() {
            return String::new();
        }
        format!(" CHARACTER SET {}", character_set)
    }

    /// Returns the collation clause, or an empty string.
    fn collation(&self, collate: &str) -> String {
        if collate.is_empty() || !self.supports_collation() {
            return String::new();
        }
        format!(" COLLATE {}", collate)
    }

    /// Returns the storage engine clause, or an empty string.
    fn engine(&self, engine: &str) -> String {
        if engine.is_empty() {
            return String::new();
        }
        format!(" ENGINE = {}", engine)
    }

    /// Returns the parenthesised length specifier of a column, if any.
    fn length_spec(&self, column: &ColumnData) -> Option<String> {
        let translator = self.translator();
        let column_type = translator.translate(&column.column_type);

        if translator.is_scaled(&column_type) && column.scale > -1 {
            Some(format!("({}, {})", column.precision, column.scale))
        } else if translator.is_numeric(&column_type) && column.precision > -1 {
            Some(format!("({})", column.precision))
        } else if column.length > -1 {
            Some(format!("({})", column.length))
        } else {
            None
        }
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnData) -> String {
        let mut sql = self.quote_identifier(&column.name);
        sql.push(' ');
        sql.push_str(&self.translator().translate(&column.column_type));

        if let Some(spec) = self.length_spec(column) {
            sql.push_str(&spec);
        }

        if !column.nullable || column.primary {
            sql.push_str(" NOT NULL");
        }

        if column.unique {
            sql.push_str(" UNIQUE");
        }

        if column.increment {
            sql.push_str(" AUTO_INCREMENT");
        }

        if let Some(ref default) = column.default_value {
            sql.push_str(&format!(" DEFAULT '{}'", default));
        }

        sql.push_str(&self.character_set(&column.character_set));
        sql.push_str(&self.collation(&column.collate));
        sql
    }

    /// Generates SQL for creating a table.
    fn create_table(&self, table: &TableData) -> String {
        let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
        sql.push_str(&self.quote_identifier(&table.name));
        sql.push_str(" (");

        let col_defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        sql.push_str(&col_defs.join(", "));

        let primary_keys = table.primary_keys(false);
        if !primary_keys.is_empty() {
            sql.push_str(", PRIMARY KEY(");
            sql.push_str(&primary_keys.join(", "));
            sql.push(')');
        }

        sql.push(')');
        sql.push_str(&self.engine(&table.engine));
        sql.push_str(&self.character_set(&table.character_set));
        sql.push_str(&self.collation(&table.collate));
        sql
    }

    /// Generates SQL for appending columns to an existing table.
    ///
    /// The first column is placed after `after` when given; each following
    /// column is placed after the one before it.
    fn add_columns(&self, table: &str, columns: &[&ColumnData], after: Option<&str>) -> String {
        let mut previous = after.map(str::to_string);
        let fragments: Vec<String> = columns
            .iter()
            .map(|column| {
                let mut fragment = format!("ADD COLUMN {}", self.column_definition(column));
                if let Some(ref prev) = previous {
                    fragment.push_str(&format!(" AFTER {}", self.quote_identifier(prev)));
                }
                previous = Some(column.name.clone());
                fragment
            })
            .collect();

        format!("{} {}", self.alter_table(table), fragments.join(", "))
    }

    /// Generates SQL for redefining an existing column.
    fn alter_column(&self, table: &str, column: &ColumnData) -> String {
        format!(
            "{} {} {}",
            self.alter_table(table),
            self.modify_verb(),
            self.column_definition(column)
        )
    }

    /// Generates SQL for dropping columns.
    fn drop_columns(&self, table: &str, columns: &[&str]) -> String {
        let fragments: Vec<String> = columns
            .iter()
            .map(|c| format!("DROP COLUMN {}", self.quote_identifier(c)))
            .collect();
        format!("{} {}", self.alter_table(table), fragments.join(", "))
    }

    /// Generates SQL for adding a primary key.
    fn add_primary_key(&self, table: &str, columns: &[String]) -> String {
        format!(
            "{} ADD PRIMARY KEY({})",
            self.alter_table(table),
            columns.join(", ")
        )
    }

    /// Generates SQL for dropping the primary key.
    fn drop_primary_key(&self, table: &str) -> String {
        format!("{} DROP PRIMARY KEY", self.alter_table(table))
    }
}

/// Renders `column LIKE 'prefix%'` tests OR-combined, matching case-insensitively.
///
/// LIKE wildcards inside a prefix are escaped so `app_` only matches a
/// literal underscore. Returns `None` when there is nothing to filter on.
pub(crate) fn prefix_filter(column: &str, prefixes: &[String]) -> Option<String> {
    if prefixes.is_empty() {
        return None;
    }

    let tests: Vec<String> = prefixes
        .iter()
        .map(|p| {
            let escaped = p.to_lowercase().replace('%', "\\%").replace('_', "\\_");
            format!("LOWER({}) LIKE '{}%'", column, escaped)
        })
        .collect();
    Some(format!("({})", tests.join(" OR ")))
}

/// Reads the live schema through `connection`.
///
/// Only tables whose names start with one of `prefixes` are returned, keyed
/// by lowercased table name.
pub async fn introspect<C: SchemaConnection>(
    dialect: &dyn Dialect,
    connection: &mut C,
    prefixes: &[String],
) -> Result<StateMap> {
    let sql = dialect.metadata_query(prefixes);
    debug!(dialect = dialect.name(), sql = %sql, "Introspecting schema");

    let rows = connection
        .fetch_metadata(&sql)
        .await
        .map_err(|e| UpdaterError::Introspection {
            dialect: dialect.name().to_string(),
            source: Box::new(e),
        })?;

    let tables = dialect.read_metadata(&rows);
    info!(
        dialect = dialect.name(),
        rows = rows.len(),
        tables = tables.len(),
        "Introspected live schema"
    );
    Ok(tables)
}

/// Dialects by short name.
#[derive(Debug, Clone)]
pub struct DialectRegistry {
    dialects: HashMap<&'static str, Arc<dyn Dialect>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(H2Dialect::new()));
        registry.register(Arc::new(MySqlDialect::new()));
        registry
    }
}

impl DialectRegistry {
    /// Creates a registry with no dialects.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Registers a dialect under its name, replacing any previous one.
    pub fn register(&mut self, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(dialect.name(), dialect);
    }

    /// Looks up a dialect by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Dialect>> {
        self.dialects
            .get(name)
            .cloned()
            .ok_or_else(|| UpdaterError::UnknownDialect(name.to_string()))
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.dialects.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
