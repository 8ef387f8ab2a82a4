//! Declarative schema reconciliation for Rust.
//!
//! `oxide-dbupdater` keeps a live database's tables in line with a schema
//! document checked in next to the application. Instead of writing numbered
//! migration files, operators describe the tables they want and the updater
//! emits the `CREATE TABLE` / `ALTER TABLE` statements needed to get there:
//! - Missing tables are created, missing columns are added in place
//! - Changed columns are redefined and stray columns are dropped
//! - Primary keys are rebuilt when their columns change
//! - DDL and catalog queries are dialect-aware (MySQL, H2)
//!
//! # Architecture
//!
//! - **Types** - Canonical type names (`INT` and `I` both become `INTEGER`)
//! - **Schema** - `TableData` / `ColumnData` for both desired and live tables
//! - **Document** - The parsed desired-schema document
//! - **Dialect** - Database-specific DDL rendering and catalog introspection
//! - **Manager** - Diffs desired against live tables and runs the statements
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_dbupdater::prelude::*;
//!
//! sqlx::any::install_default_drivers();
//! let mut pool = sqlx::AnyPool::connect("mysql://localhost/app").await?;
//!
//! let document: SchemaDocument = serde_json::from_str(r#"{
//!     "Settings": { "Prefix": "app_" },
//!     "Tables": { "users": { "Columns": {
//!         "id":   { "Type": "INT", "Primary": true, "Increment": true },
//!         "name": { "Type": "VARCHAR", "Length": 100 }
//!     } } }
//! }"#)?;
//!
//! let registry = DialectRegistry::default();
//! let mut manager = TableManager::from_registry(&registry, "mysql")?;
//! let report = manager.converge(&mut pool, &[document]).await?;
//! assert!(report.is_success());
//! ```

pub mod connection;
pub mod dialect;
pub mod document;
pub mod error;
pub mod manager;
pub mod schema;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::{MetadataRow, SchemaConnection};
    pub use crate::dialect::{introspect, Dialect, DialectRegistry, H2Dialect, MySqlDialect};
    pub use crate::document::SchemaDocument;
    pub use crate::error::{Result, UpdaterError};
    pub use crate::manager::{ErrorPolicy, Phase, RunReport, StatementFailure, TableManager};
    pub use crate::schema::{ColumnData, StateMap, TableData};
    pub use crate::types::{translate, BasicTypeTranslator, TypeTranslator};
}
