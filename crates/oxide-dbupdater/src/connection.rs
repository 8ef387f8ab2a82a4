//! Connection seam between the updater and a live database.
//!
//! The updater only needs two things from a connection: run a catalog query
//! and get its rows back as text, and execute a DDL statement. The caller
//! owns the connection; nothing here opens or closes one.

use std::collections::HashMap;

use sqlx::any::AnyRow;
use sqlx::{AnyConnection, AnyPool};
use sqlx::{Column, Row};
use tracing::debug;

use crate::error::Result;

/// One row of a metadata query.
///
/// Keys are stored lowercased so dialects can read fields regardless of how
/// the catalog spells its column labels. SQL NULL is stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    values: HashMap<String, Option<String>>,
}

impl MetadataRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    #[must_use]
    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        self.insert(key, value.map(str::to_string));
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, key: &str, value: Option<String>) {
        self.values.insert(key.to_ascii_lowercase(), value);
    }

    /// Returns the text of a field, or `None` for NULL or a missing field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .and_then(|v| v.as_deref())
    }

    /// Returns the text of a field, or an empty string.
    #[must_use]
    pub fn text_or_empty(&self, key: &str) -> &str {
        self.text(key).unwrap_or("")
    }

    /// Returns a numeric field, or -1 for NULL, missing or non-numeric values.
    #[must_use]
    pub fn number(&self, key: &str) -> i64 {
        self.text(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(-1)
    }

    /// Converts an `sqlx` row, rendering every supported cell as text.
    #[must_use]
    pub fn from_any_row(row: &AnyRow) -> Self {
        let mut out = Self::new();
        for (idx, column) in row.columns().iter().enumerate() {
            out.insert(column.name(), cell_text(row, idx));
        }
        out
    }
}

fn cell_text(row: &AnyRow, idx: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(idx) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(idx) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return value.map(|v| String::from_utf8_lossy(&v).into_owned());
    }
    None
}

/// A live database handle the updater can query and alter.
#[allow(async_fn_in_trait)]
pub trait SchemaConnection {
    /// Runs a metadata query and returns all rows.
    async fn fetch_metadata(&mut self, sql: &str) -> Result<Vec<MetadataRow>>;

    /// Executes a single DDL statement.
    async fn execute(&mut self, sql: &str) -> Result<()>;
}

impl SchemaConnection for AnyPool {
    async fn fetch_metadata(&mut self, sql: &str) -> Result<Vec<MetadataRow>> {
        debug!(sql = %sql, "Fetching metadata");
        let rows = sqlx::query(sql).fetch_all(&*self).await?;
        Ok(rows.iter().map(MetadataRow::from_any_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(sql).execute(&*self).await?;
        Ok(())
    }
}

impl SchemaConnection for AnyConnection {
    async fn fetch_metadata(&mut self, sql: &str) -> Result<Vec<MetadataRow>> {
        debug!(sql = %sql, "Fetching metadata");
        let rows = sqlx::query(sql).fetch_all(&mut *self).await?;
        Ok(rows.iter().map(MetadataRow::from_any_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(sql).execute(&mut *self).await?;
        Ok(())
    }
}
