//! End-to-end tests for the reconciliation engine.
//!
//! The first half drives `TableManager::converge` through a scripted
//! connection that serves MySQL catalog rows. The second half executes the
//! computed statements against an in-memory SQLite database, which accepts
//! backtick identifiers but rejects `AFTER` placement, so it doubles as a
//! database with one known-bad statement.

use std::sync::Arc;

use oxide_dbupdater::prelude::*;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::Row;

// =============================================================================
// Scripted connection
// =============================================================================

#[derive(Default)]
struct ScriptedConnection {
    rows: Vec<MetadataRow>,
    executed: Vec<String>,
}

impl SchemaConnection for ScriptedConnection {
    async fn fetch_metadata(&mut self, _sql: &str) -> Result<Vec<MetadataRow>> {
        Ok(self.rows.clone())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }
}

fn mysql_row(table: &str, column: &str, data_type: &str) -> MetadataRow {
    MetadataRow::new()
        .with("TABLE_NAME", Some(table))
        .with("COLUMN_NAME", Some(column))
        .with("COLUMN_DEFAULT", None)
        .with("IS_NULLABLE", Some("YES"))
        .with("DATA_TYPE", Some(data_type))
        .with("CHARACTER_MAXIMUM_LENGTH", None)
        .with("NUMERIC_PRECISION", None)
        .with("NUMERIC_SCALE", None)
        .with("CHARACTER_SET_NAME", None)
        .with("COLLATION_NAME", None)
        .with("COLUMN_KEY", Some(""))
        .with("EXTRA", Some(""))
}

fn blog_document() -> SchemaDocument {
    serde_json::from_value(serde_json::json!({
        "Settings": { "Prefix": "blog_" },
        "Tables": {
            "users": {
                "Settings": { "Engine": "InnoDB" },
                "Columns": {
                    "id": { "Type": "INT", "Primary": true, "Increment": true },
                    "name": { "Type": "VARCHAR", "Length": 100, "Null": false },
                    "email": { "Type": "VARCHAR", "Length": 255, "Unique": true }
                }
            },
            "posts": {
                "Columns": {
                    "id": { "Type": "BIGINT", "Primary": true, "Increment": true },
                    "title": { "Type": "VARCHAR", "Length": 200 },
                    "published": { "Type": "BOOLEAN", "Default": false }
                }
            }
        }
    }))
    .unwrap()
}

/// Catalog rows for a database that already holds the converged schema.
fn converged_rows() -> Vec<MetadataRow> {
    vec![
        mysql_row("blog_posts", "id", "bigint")
            .with("IS_NULLABLE", Some("NO"))
            .with("NUMERIC_PRECISION", Some("19"))
            .with("NUMERIC_SCALE", Some("0"))
            .with("COLUMN_KEY", Some("PRI"))
            .with("EXTRA", Some("auto_increment")),
        mysql_row("blog_posts", "title", "varchar")
            .with("CHARACTER_MAXIMUM_LENGTH", Some("200"))
            .with("CHARACTER_SET_NAME", Some("utf8mb4"))
            .with("COLLATION_NAME", Some("utf8mb4_general_ci")),
        mysql_row("blog_posts", "published", "tinyint")
            .with("COLUMN_DEFAULT", Some("0"))
            .with("NUMERIC_PRECISION", Some("3"))
            .with("NUMERIC_SCALE", Some("0")),
        mysql_row("blog_users", "id", "int")
            .with("IS_NULLABLE", Some("NO"))
            .with("NUMERIC_PRECISION", Some("10"))
            .with("NUMERIC_SCALE", Some("0"))
            .with("COLUMN_KEY", Some("PRI"))
            .with("EXTRA", Some("auto_increment")),
        mysql_row("blog_users", "name", "varchar")
            .with("IS_NULLABLE", Some("NO"))
            .with("CHARACTER_MAXIMUM_LENGTH", Some("100")),
        mysql_row("blog_users", "email", "varchar")
            .with("CHARACTER_MAXIMUM_LENGTH", Some("255"))
            .with("COLUMN_KEY", Some("UNI")),
    ]
}

#[tokio::test]
async fn test_empty_database_gets_every_table() {
    let mut conn = ScriptedConnection::default();
    let mut manager = TableManager::new(Arc::new(MySqlDialect::new()));

    let report = manager.converge(&mut conn, &[blog_document()]).await.unwrap();

    assert!(report.is_success());
    assert_eq!(manager.phase(), Phase::Applied);
    assert_eq!(
        conn.executed,
        vec![
            "CREATE TABLE IF NOT EXISTS `blog_posts` (`id` BIGINT NOT NULL AUTO_INCREMENT, \
             `title` VARCHAR(200), `published` TINYINT DEFAULT '0', PRIMARY KEY(id))"
                .to_string(),
            "CREATE TABLE IF NOT EXISTS `blog_users` (`id` INTEGER NOT NULL AUTO_INCREMENT, \
             `name` VARCHAR(100) NOT NULL, `email` VARCHAR(255) UNIQUE, PRIMARY KEY(id)) \
             ENGINE = InnoDB"
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn test_converged_database_is_left_alone() {
    let mut conn = ScriptedConnection {
        rows: converged_rows(),
        ..Default::default()
    };
    let registry = DialectRegistry::default();
    let mut manager = TableManager::from_registry(&registry, "mysql").unwrap();

    let report = manager.converge(&mut conn, &[blog_document()]).await.unwrap();

    assert!(report.is_success());
    assert!(report.applied.is_empty());
    assert!(conn.executed.is_empty());
}

#[tokio::test]
async fn test_drifted_database_is_repaired() {
    // `title` shrank, `email` is gone and a stray column was added.
    let mut rows: Vec<MetadataRow> = converged_rows()
        .into_iter()
        .filter(|r| r.text("column_name") != Some("email"))
        .map(|r| {
            if r.text("column_name") == Some("title") {
                r.with("CHARACTER_MAXIMUM_LENGTH", Some("80"))
            } else {
                r
            }
        })
        .collect();
    rows.push(
        mysql_row("blog_users", "nickname", "varchar")
            .with("CHARACTER_MAXIMUM_LENGTH", Some("30")),
    );

    let mut conn = ScriptedConnection {
        rows,
        ..Default::default()
    };
    let mut manager = TableManager::new(Arc::new(MySqlDialect::new()));
    let report = manager.converge(&mut conn, &[blog_document()]).await.unwrap();

    assert!(report.is_success());
    assert_eq!(
        conn.executed,
        vec![
            "ALTER TABLE `blog_posts` MODIFY `title` VARCHAR(200)".to_string(),
            "ALTER TABLE `blog_users` ADD COLUMN `email` VARCHAR(255) UNIQUE AFTER `name`"
                .to_string(),
            "ALTER TABLE `blog_users` DROP COLUMN `nickname`".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_dialect_fails_before_io() {
    let registry = DialectRegistry::default();
    let err = TableManager::from_registry(&registry, "oracle").unwrap_err();
    assert!(matches!(err, UpdaterError::UnknownDialect(ref name) if name == "oracle"));
}

// =============================================================================
// SQLite-backed runs
// =============================================================================

async fn create_test_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

async fn table_sql(pool: &AnyPool, table: &str) -> Option<String> {
    sqlx::query("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table.to_string())
        .fetch_optional(pool)
        .await
        .unwrap()
        .map(|row| row.get::<String, _>(0))
}

fn app_document() -> SchemaDocument {
    serde_json::from_value(serde_json::json!({
        "Settings": { "Prefix": "app_" },
        "Tables": {
            "users": {
                "Columns": {
                    "id": { "Type": "INTEGER", "Primary": true },
                    "name": { "Type": "VARCHAR", "Length": 50 },
                    "email": { "Type": "VARCHAR", "Length": 100 }
                }
            },
            "logs": {
                "Columns": {
                    "id": { "Type": "INTEGER", "Primary": true },
                    "line": { "Type": "TEXT" }
                }
            }
        }
    }))
    .unwrap()
}

/// The live `app_users` table: `email` is missing and `legacy` is stray.
fn live_users() -> StateMap {
    let users = TableData::new("app_users")
        .column(ColumnData::new("id", "INTEGER").primary())
        .column(ColumnData::new("name", "VARCHAR").length(50))
        .column(ColumnData::new("legacy", "VARCHAR").length(10));
    StateMap::from([("app_users".to_string(), users)])
}

async fn prepared_manager(pool: &mut AnyPool, policy: ErrorPolicy) -> TableManager {
    pool.execute(
        "CREATE TABLE app_users \
         (id INTEGER NOT NULL, name VARCHAR(50), legacy VARCHAR(10), PRIMARY KEY(id))",
    )
    .await
    .unwrap();

    let mut manager =
        TableManager::new(Arc::new(MySqlDialect::new())).with_policy(policy);
    manager.load(&app_document()).unwrap();
    manager.set_actual(live_users()).unwrap();

    let pending = manager.compute_diff().unwrap();
    assert_eq!(pending.len(), 3);
    assert!(pending[0].starts_with("CREATE TABLE IF NOT EXISTS `app_logs`"));
    assert!(pending[1].ends_with("AFTER `name`"));
    assert!(pending[2].ends_with("DROP COLUMN `legacy`"));
    manager
}

#[tokio::test]
async fn test_failed_statement_does_not_stop_the_run() {
    let mut pool = create_test_pool().await;
    let mut manager = prepared_manager(&mut pool, ErrorPolicy::ContinueOnError).await;

    let report = manager.run(&mut pool).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.skipped.is_empty());
    assert!(report.failed[0].statement.contains("ADD COLUMN `email`"));
    assert!(matches!(
        report.failed[0].error,
        UpdaterError::Statement { .. }
    ));

    assert!(table_sql(&pool, "app_logs").await.is_some());
    let users = table_sql(&pool, "app_users").await.unwrap();
    assert!(!users.contains("legacy"));
}

#[tokio::test]
async fn test_abort_policy_skips_the_rest() {
    let mut pool = create_test_pool().await;
    let mut manager = prepared_manager(&mut pool, ErrorPolicy::Abort).await;

    let report = manager.run(&mut pool).await.unwrap();

    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].contains("DROP COLUMN `legacy`"));

    assert!(table_sql(&pool, "app_logs").await.is_some());
    let users = table_sql(&pool, "app_users").await.unwrap();
    assert!(users.contains("legacy"));
}
