//! Schema representation types.
//!
//! These types describe tables and columns on both sides of a reconciliation:
//! the desired layout loaded from a schema document and the actual layout
//! read back from the live database.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tables keyed by name.
///
/// Desired maps are keyed by the prefixed table name, actual maps by the
/// lowercased table name reported by the database.
pub type StateMap = BTreeMap<String, TableData>;

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnData {
    /// Column name.
    pub name: String,
    /// Canonical uppercase type name.
    pub column_type: String,
    /// Whether the column is part of the primary key.
    pub primary: bool,
    /// Whether the column has a UNIQUE constraint.
    pub unique: bool,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether the column auto-increments.
    pub increment: bool,
    /// Length for non-numeric types, -1 when unspecified.
    pub length: i64,
    /// Precision for numeric types, -1 when unspecified.
    pub precision: i64,
    /// Scale for scaled numeric types, -1 when unspecified.
    pub scale: i64,
    /// Default value, rendered as a quoted literal.
    pub default_value: Option<String>,
    /// Character set, empty to inherit.
    pub character_set: String,
    /// Collation, empty to inherit.
    pub collate: String,
}

impl ColumnData {
    /// Creates a nullable column with no length information.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            primary: false,
            unique: false,
            nullable: true,
            increment: false,
            length: -1,
            precision: -1,
            scale: -1,
            default_value: None,
            character_set: String::new(),
            collate: String::new(),
        }
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Marks the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn increment(mut self) -> Self {
        self.increment = true;
        self
    }

    /// Sets the length of a non-numeric column.
    #[must_use]
    pub fn length(mut self, length: i64) -> Self {
        self.length = length;
        self
    }

    /// Sets the precision, and the scale if it is not -1.
    #[must_use]
    pub fn precision(mut self, precision: i64, scale: i64) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the character set and collation.
    #[must_use]
    pub fn charset(mut self, character_set: impl Into<String>, collate: impl Into<String>) -> Self {
        self.character_set = character_set.into();
        self.collate = collate.into();
        self
    }
}

/// Definition of a table and its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    /// Table name, including any prefix.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnData>,
    /// Default character set, empty to inherit.
    pub character_set: String,
    /// Default collation, empty to inherit.
    pub collate: String,
    /// Storage engine, empty for the server default.
    pub engine: String,
}

impl TableData {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            character_set: String::new(),
            collate: String::new(),
            engine: String::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnData) -> Self {
        self.add_column(column);
        self
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets the default character set and collation.
    #[must_use]
    pub fn charset(mut self, character_set: impl Into<String>, collate: impl Into<String>) -> Self {
        self.character_set = character_set.into();
        self.collate = collate.into();
        self
    }

    /// Appends a column, or replaces the column of the same name in place.
    pub fn add_column(&mut self, column: ColumnData) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Gets a column by exact name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets a column by name, ignoring ASCII case.
    #[must_use]
    pub fn column_ignore_case(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Gets a mutable column by name, ignoring ASCII case.
    pub fn column_ignore_case_mut(&mut self, name: &str) -> Option<&mut ColumnData> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the primary key column names in column order.
    ///
    /// With `include_unique`, unique columns are returned as well.
    #[must_use]
    pub fn primary_keys(&self, include_unique: bool) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary || (include_unique && c.unique))
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_defaults() {
        let col = ColumnData::new("name", "VARCHAR");
        assert!(col.nullable);
        assert!(!col.primary);
        assert_eq!(col.length, -1);
        assert_eq!(col.precision, -1);
        assert_eq!(col.scale, -1);
        assert!(col.default_value.is_none());
        assert!(col.character_set.is_empty());
    }

    #[test]
    fn test_primary_keys_in_column_order() {
        let table = TableData::new("users")
            .column(ColumnData::new("b", "INTEGER").primary())
            .column(ColumnData::new("email", "VARCHAR").unique())
            .column(ColumnData::new("a", "INTEGER").primary());

        assert_eq!(table.primary_keys(false), vec!["b", "a"]);
        assert_eq!(table.primary_keys(true), vec!["b", "email", "a"]);
    }

    #[test]
    fn test_add_column_replaces_in_place() {
        let mut table = TableData::new("users")
            .column(ColumnData::new("id", "INTEGER"))
            .column(ColumnData::new("name", "VARCHAR"));
        table.add_column(ColumnData::new("id", "BIGINT"));

        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "id");
        assert_eq!(table.columns[0].column_type, "BIGINT");
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = TableData::new("users").column(ColumnData::new("Email", "VARCHAR"));
        assert!(table.get_column("email").is_none());
        assert!(table.column_ignore_case("EMAIL").is_some());
    }
}
