//! The desired-schema document.
//!
//! A document is the already-parsed form of an operator's schema file:
//!
//! ```json
//! {
//!   "Settings": { "Prefix": "app_" },
//!   "Tables": {
//!     "users": {
//!       "Settings": { "Engine": "InnoDB", "Charset": "utf8mb4" },
//!       "Columns": {
//!         "id":   { "Type": "INT", "Primary": true, "Increment": true },
//!         "name": { "Type": "VARCHAR", "Length": 100, "Null": false }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Table and column order is kept as written, since it decides the physical
//! column order of created and altered tables.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Result, UpdaterError};
use crate::schema::{ColumnData, StateMap, TableData};
use crate::types::TypeTranslator;

/// A parsed desired-schema document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaDocument {
    /// Document-wide settings.
    #[serde(default)]
    pub settings: DocumentSettings,
    /// Tables by unprefixed name.
    #[serde(default)]
    pub tables: IndexMap<String, TableDocument>,
}

/// Document-wide settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentSettings {
    /// Prefix prepended to every table name.
    #[serde(default)]
    pub prefix: String,
}

/// A table entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDocument {
    #[serde(default)]
    pub settings: TableSettings,
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDocument>,
}

/// Table-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableSettings {
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub charset: String,
    #[serde(default)]
    pub collate: String,
}

/// A column entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDocument {
    #[serde(rename = "Type", default = "default_type")]
    pub column_type: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    /// Length, or precision for numeric types.
    #[serde(default = "unspecified")]
    pub length: i64,
    #[serde(default = "unspecified")]
    pub scale: i64,
    #[serde(default)]
    pub default: Option<DefaultLiteral>,
    #[serde(default = "nullable")]
    pub null: bool,
    #[serde(default)]
    pub increment: bool,
    #[serde(default)]
    pub settings: ColumnSettings,
}

impl Default for ColumnDocument {
    fn default() -> Self {
        Self {
            column_type: default_type(),
            primary: false,
            unique: false,
            length: unspecified(),
            scale: unspecified(),
            default: None,
            null: nullable(),
            increment: false,
            settings: ColumnSettings::default(),
        }
    }
}

/// Column-level settings. Unset values inherit the table's.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnSettings {
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

/// A default value as written in the document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultLiteral {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl DefaultLiteral {
    /// Returns the literal as the text placed between quotes in DDL.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

fn default_type() -> String {
    "VARCHAR".to_string()
}

fn unspecified() -> i64 {
    -1
}

fn nullable() -> bool {
    true
}

impl SchemaDocument {
    /// Returns the table prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.settings.prefix
    }

    /// Builds the desired tables, keyed by prefixed name.
    ///
    /// Type names are canonicalized with `translator`.
    pub fn to_tables(&self, translator: &dyn TypeTranslator) -> Result<StateMap> {
        let prefix = self.prefix();
        let mut tables = StateMap::new();

        for (table_name, table_doc) in &self.tables {
            if table_doc.columns.is_empty() {
                return Err(UpdaterError::InvalidDocument(format!(
                    "table '{}' declares no columns",
                    table_name
                )));
            }

            let name = format!("{}{}", prefix, table_name);
            let settings = &table_doc.settings;
            let mut table = TableData::new(name.clone())
                .engine(settings.engine.clone())
                .charset(settings.charset.clone(), settings.collate.clone());

            for (column_name, column_doc) in &table_doc.columns {
                table.add_column(column_doc.to_column(column_name, settings, translator)?);
            }

            tables.insert(name, table);
        }

        Ok(tables)
    }
}

impl ColumnDocument {
    fn to_column(
        &self,
        name: &str,
        table: &TableSettings,
        translator: &dyn TypeTranslator,
    ) -> Result<ColumnData> {
        if self.length < -1 || self.scale < -1 {
            return Err(UpdaterError::InvalidDocument(format!(
                "column '{}' has a negative length or scale",
                name
            )));
        }

        let column_type = translator.translate(&self.column_type);
        let mut column = ColumnData::new(name, column_type.clone());
        column.primary = self.primary;
        column.unique = self.unique;
        column.nullable = self.null;
        column.increment = self.increment;

        if translator.is_numeric(&column_type) {
            column.precision = self.length;
        } else {
            column.length = self.length;
        }
        column.scale = self.scale;

        column.default_value = self.default.as_ref().map(DefaultLiteral::to_text);
        column.character_set = self
            .settings
            .charset
            .clone()
            .unwrap_or_else(|| table.charset.clone());
        column.collate = self
            .settings
            .collate
            .clone()
            .unwrap_or_else(|| table.collate.clone());

        Ok(column)
    }
}
