//! Schema reconciliation engine.
//!
//! [`TableManager`] loads the desired tables, reads the live ones through a
//! [`Dialect`], computes the ordered list of DDL statements that converges
//! the two, and executes it. The steps must happen in that order:
//!
//! ```text
//! Empty -> Loaded -> Introspected -> Diffed -> Applied
//! ```
//!
//! A run is not resumable. Running the whole sequence again re-diffs against
//! whatever the database looks like by then.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::connection::SchemaConnection;
use crate::dialect::{self, Dialect, DialectRegistry};
use crate::document::SchemaDocument;
use crate::error::{Result, UpdaterError};
use crate::schema::{ColumnData, StateMap, TableData};

/// What to do when introspection or a statement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the failure and keep going with the next statement.
    #[default]
    ContinueOnError,
    /// Stop at the first failure.
    Abort,
}

/// Where a [`TableManager`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded yet.
    Empty,
    /// At least one desired-schema document loaded.
    Loaded,
    /// The live schema has been read.
    Introspected,
    /// Statements have been computed.
    Diffed,
    /// Statements have been executed.
    Applied,
}

/// A statement that failed during [`TableManager::run`].
#[derive(Debug)]
pub struct StatementFailure {
    /// The statement text.
    pub statement: String,
    /// Why it failed.
    pub error: UpdaterError,
}

/// Outcome of executing the pending statements.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Statements that executed successfully, in order.
    pub applied: Vec<String>,
    /// Statements that failed.
    pub failed: Vec<StatementFailure>,
    /// Statements never attempted because the run was aborted.
    pub skipped: Vec<String>,
}

impl RunReport {
    /// Returns whether every statement was applied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Reconciles desired tables with a live database.
#[derive(Debug)]
pub struct TableManager {
    dialect: Arc<dyn Dialect>,
    policy: ErrorPolicy,
    phase: Phase,
    desired: StateMap,
    actual: StateMap,
    prefixes: Vec<String>,
    pending: Vec<String>,
}

impl TableManager {
    /// Creates a manager for the given dialect.
    #[must_use]
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            policy: ErrorPolicy::default(),
            phase: Phase::Empty,
            desired: StateMap::new(),
            actual: StateMap::new(),
            prefixes: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Creates a manager for the dialect registered under `name`.
    ///
    /// Fails with [`UpdaterError::UnknownDialect`] before any I/O happens.
    pub fn from_registry(registry: &DialectRegistry, name: &str) -> Result<Self> {
        Ok(Self::new(registry.get(name)?))
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the desired tables, keyed by prefixed name.
    #[must_use]
    pub fn desired(&self) -> &StateMap {
        &self.desired
    }

    /// Returns the live tables, keyed by lowercased name.
    #[must_use]
    pub fn actual(&self) -> &StateMap {
        &self.actual
    }

    /// Returns the table prefixes seen so far.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns the computed statements in execution order.
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Removes and returns the computed statements without executing them.
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    fn expect_phase(&self, allowed: &[Phase], operation: &str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(UpdaterError::InvalidState(format!(
                "cannot {} in phase {:?}",
                operation, self.phase
            )))
        }
    }

    /// Adds the tables of a desired-schema document.
    ///
    /// Documents must all be loaded before introspection, since the prefixes
    /// they declare scope the catalog query.
    pub fn load(&mut self, document: &SchemaDocument) -> Result<()> {
        self.expect_phase(&[Phase::Empty, Phase::Loaded], "load a schema document")?;

        let tables = document.to_tables(self.dialect.translator())?;
        let prefix = document.prefix().to_string();
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }

        info!(
            prefix = %document.prefix(),
            tables = tables.len(),
            "Loaded schema document"
        );
        self.desired.extend(tables);
        self.phase = Phase::Loaded;
        Ok(())
    }

    /// Reads the live schema for the known prefixes.
    ///
    /// Under [`ErrorPolicy::ContinueOnError`] a failed query is logged and
    /// the live schema is treated as empty.
    pub async fn introspect<C: SchemaConnection>(&mut self, connection: &mut C) -> Result<()> {
        self.expect_phase(&[Phase::Loaded], "introspect")?;

        match dialect::introspect(self.dialect.as_ref(), connection, &self.prefixes).await {
            Ok(actual) => self.actual = actual,
            Err(e) if self.policy == ErrorPolicy::ContinueOnError => {
                warn!(error = %e, "Introspection failed, assuming no existing tables");
                self.actual = StateMap::new();
            }
            Err(e) => return Err(e),
        }

        self.phase = Phase::Introspected;
        Ok(())
    }

    /// Supplies the live schema directly instead of querying for it.
    pub fn set_actual(&mut self, actual: StateMap) -> Result<()> {
        self.expect_phase(&[Phase::Loaded], "set the live schema")?;
        self.actual = actual
            .into_values()
            .map(|t| (t.name.to_lowercase(), t))
            .collect();
        self.phase = Phase::Introspected;
        Ok(())
    }

    /// Computes the statements that converge the live schema to the desired
    /// one and returns them.
    pub fn compute_diff(&mut self) -> Result<&[String]> {
        self.expect_phase(&[Phase::Introspected], "compute a diff")?;

        let dialect = self.dialect.as_ref();
        let mut statements = Vec::new();
        let mut created = HashSet::new();

        for (name, table) in &self.desired {
            if !self.actual.contains_key(&name.to_lowercase()) {
                debug!(table = %name, "Table missing, creating");
                statements.push(dialect.create_table(table));
                created.insert(name.as_str());
            }
        }

        for (name, desired) in &self.desired {
            if created.contains(name.as_str()) {
                continue;
            }
            if let Some(actual) = self.actual.get(&name.to_lowercase()) {
                statements.extend(diff_table(dialect, desired, actual));
            }
        }

        info!(
            tables = self.desired.len(),
            created = created.len(),
            statements = statements.len(),
            "Computed schema diff"
        );

        self.pending = statements;
        self.phase = Phase::Diffed;
        Ok(&self.pending)
    }

    /// Executes the computed statements in order, without a transaction.
    pub async fn run<C: SchemaConnection>(&mut self, connection: &mut C) -> Result<RunReport> {
        self.expect_phase(&[Phase::Diffed], "run statements")?;
        self.phase = Phase::Applied;

        let mut report = RunReport::default();
        let mut statements = std::mem::take(&mut self.pending).into_iter();

        while let Some(statement) = statements.next() {
            match connection.execute(&statement).await {
                Ok(()) => report.applied.push(statement),
                Err(e) => {
                    let error = UpdaterError::Statement {
                        statement: statement.clone(),
                        source: Box::new(e),
                    };
                    warn!(error = %error, "Statement failed");
                    report.failed.push(StatementFailure { statement, error });

                    if self.policy == ErrorPolicy::Abort {
                        report.skipped.extend(statements.by_ref());
                        break;
                    }
                }
            }
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Schema update finished"
        );
        Ok(report)
    }

    /// Loads `documents`, reads the live schema, and applies the difference.
    pub async fn converge<C: SchemaConnection>(
        &mut self,
        connection: &mut C,
        documents: &[SchemaDocument],
    ) -> Result<RunReport> {
        for document in documents {
            self.load(document)?;
        }
        self.introspect(connection).await?;
        self.compute_diff()?;
        self.run(connection).await
    }
}

/// Returns the statements needed to turn an existing table into `desired`.
fn diff_table(dialect: &dyn Dialect, desired: &TableData, actual: &TableData) -> Vec<String> {
    let mut statements = Vec::new();
    let table = desired.name.as_str();

    if primary_key_changed(desired, actual) {
        debug!(table = %table, "Primary key changed");
        if !actual.primary_keys(false).is_empty() {
            statements.push(dialect.drop_primary_key(table));
        }
        statements.push(dialect.add_primary_key(table, &desired.primary_keys(false)));
    }

    let mut last_column: Option<&str> = None;
    for column in &desired.columns {
        match actual.column_ignore_case(&column.name) {
            None => {
                debug!(table = %table, column = %column.name, "Adding column");
                statements.push(dialect.add_columns(table, &[column], last_column));
            }
            Some(existing) => {
                let wanted = dialect.column_definition(column);
                let current = dialect.column_definition(&comparable(existing, column));
                if !wanted.eq_ignore_ascii_case(&current) {
                    debug!(
                        table = %table,
                        column = %column.name,
                        current = %current,
                        wanted = %wanted,
                        "Column differs"
                    );
                    statements.push(dialect.alter_column(table, column));
                }
            }
        }
        last_column = Some(column.name.as_str());
    }

    for column in &actual.columns {
        if desired.column_ignore_case(&column.name).is_none() {
            debug!(table = %table, column = %column.name, "Dropping column");
            statements.push(dialect.drop_columns(table, &[column.name.as_str()]));
        }
    }

    statements
}

/// Returns whether the primary key has to be rebuilt.
///
/// A desired primary column is satisfied by an actual primary *or unique*
/// column, and an actual primary column is satisfied by a desired primary or
/// unique column.
fn primary_key_changed(desired: &TableData, actual: &TableData) -> bool {
    let lower = |names: Vec<String>| -> HashSet<String> {
        names.into_iter().map(|n| n.to_lowercase()).collect()
    };

    let desired_pk = lower(desired.primary_keys(false));
    let desired_tolerant = lower(desired.primary_keys(true));
    let actual_pk = lower(actual.primary_keys(false));
    let actual_tolerant = lower(actual.primary_keys(true));

    desired_pk.iter().any(|c| !actual_tolerant.contains(c))
        || actual_pk.iter().any(|c| !desired_tolerant.contains(c))
}

/// Copies `actual` with the attributes `desired` leaves unspecified masked
/// out, so server-chosen lengths and inherited charsets do not count as
/// differences.
fn comparable(actual: &ColumnData, desired: &ColumnData) -> ColumnData {
    let mut column = actual.clone();
    // MySQL reports a primary column's key as PRI only, never UNI as well.
    if desired.unique && column.primary {
        column.unique = true;
    }
    if desired.length < 0 {
        column.length = -1;
    }
    if desired.precision < 0 {
        column.precision = -1;
    }
    if desired.scale < 0 {
        column.scale = -1;
    }
    if desired.character_set.is_empty() {
        column.character_set.clear();
    }
    if desired.collate.is_empty() {
        column.collate.clear();
    }
    column
}
