//! Error types for schema reconciliation.

/// Errors that can occur while loading, introspecting or converging a schema.
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    /// No dialect is registered under the requested name.
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),

    /// The desired-schema document could not be turned into tables.
    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),

    /// Database driver error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The metadata query for the live schema failed.
    #[error("Failed to introspect schema with dialect '{dialect}': {source}")]
    Introspection {
        /// Name of the dialect whose query failed.
        dialect: String,
        /// Underlying failure.
        #[source]
        source: Box<UpdaterError>,
    },

    /// A single DDL statement failed to execute.
    #[error("Statement failed: {statement}: {source}")]
    Statement {
        /// The statement text.
        statement: String,
        /// Underlying failure.
        #[source]
        source: Box<UpdaterError>,
    },

    /// An operation was called out of order.
    #[error("Invalid updater state: {0}")]
    InvalidState(String),
}

/// Result type for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;
