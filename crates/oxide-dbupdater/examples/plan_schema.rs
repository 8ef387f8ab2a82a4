//! Example: Planning a Schema Update
//!
//! This example shows the statements the updater would run to bring a blog
//! database in line with its schema document, without touching a database.
//! The live schema is supplied by hand instead of being introspected.
//!
//! Run with: cargo run --example plan_schema -p oxide-dbupdater

use std::sync::Arc;

use oxide_dbupdater::prelude::*;

const BLOG_SCHEMA: &str = r#"{
    "Settings": { "Prefix": "blog_" },
    "Tables": {
        "users": {
            "Settings": {
                "Engine": "InnoDB",
                "Charset": "utf8mb4",
                "Collate": "utf8mb4_unicode_ci"
            },
            "Columns": {
                "id":        { "Type": "BI", "Primary": true, "Increment": true },
                "username":  { "Type": "VARCHAR", "Length": 100, "Unique": true, "Null": false },
                "email":     { "Type": "VARCHAR", "Length": 255, "Null": false },
                "is_active": { "Type": "BOOLEAN", "Default": true }
            }
        },
        "posts": {
            "Settings": { "Engine": "InnoDB" },
            "Columns": {
                "id":        { "Type": "BI", "Primary": true, "Increment": true },
                "author_id": { "Type": "BI", "Null": false },
                "title":     { "Type": "VARCHAR", "Length": 200, "Null": false },
                "content":   { "Type": "TEXT" },
                "rating":    { "Type": "DECIMAL", "Length": 4, "Scale": 2 }
            }
        }
    }
}"#;

/// What the database looks like today: `blog_users` exists from an older
/// release with a shorter `username` and a column that has since been removed.
fn live_schema() -> StateMap {
    let users = TableData::new("blog_users")
        .engine("InnoDB")
        .column(ColumnData::new("id", "BIGINT").primary().not_null().increment())
        .column(
            ColumnData::new("username", "VARCHAR")
                .length(50)
                .unique()
                .not_null()
                .charset("utf8mb4", "utf8mb4_unicode_ci"),
        )
        .column(ColumnData::new("signature", "VARCHAR").length(255));

    StateMap::from([("blog_users".to_string(), users)])
}

fn main() -> Result<()> {
    let document: SchemaDocument = serde_json::from_str(BLOG_SCHEMA)
        .map_err(|e| UpdaterError::InvalidDocument(e.to_string()))?;

    let mut manager = TableManager::new(Arc::new(MySqlDialect::new()));
    manager.load(&document)?;
    manager.set_actual(live_schema())?;

    println!("-- Planned statements for prefix(es) {:?}", manager.prefixes());
    for sql in manager.compute_diff()? {
        println!("{};", sql);
    }

    Ok(())
}
