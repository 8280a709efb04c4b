//! Core connector trait.
//!
//! This module defines the `Connector` trait that every engine driver implements.
//! A connector is bound to one `ConnectionProfile` and holds no connection of its
//! own: each call opens a native connection, uses it, and releases it before
//! returning, on success and on failure alike.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::error::ConnectorError;
use super::schema::{ExecutionResult, TableStructure};
use super::types::{ConnectionProfile, EngineType};

/// Callback receiving `(table_name, ddl)` once per fetched table.
pub type StructureCallback<'a> = dyn FnMut(&str, &str) + Send + 'a;

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Uniform surface over the supported database engines.
///
/// # Example
///
/// ```ignore
/// use dbscope::services::database::drivers::ConnectorFactory;
///
/// let connector = ConnectorFactory::create(profile)?;
/// if connector.test_connection().await? {
///     let result = connector.execute("mydb", "SELECT 1 AS x").await?;
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the engine this connector talks to
    fn engine_type(&self) -> EngineType;

    /// Get the bound profile
    fn profile(&self) -> &ConnectionProfile;

    /// Open a connection and close it immediately.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Connection` with the native diagnostic on
    /// authentication failures, network errors or unreachable hosts. A failed
    /// check is never reported as `Ok(false)`.
    async fn test_connection(&self) -> ConnectorResult<bool>;

    /// Run `statement` verbatim against `database_name`.
    ///
    /// The statement is not sanitized. Mutations take effect immediately.
    async fn execute(&self, database_name: &str, statement: &str)
    -> ConnectorResult<ExecutionResult>;

    /// List user databases, excluding the engine's reserved ones.
    async fn get_databases(&self) -> ConnectorResult<Vec<String>>;

    /// List base tables of `database_name`. Views and system tables are excluded.
    async fn get_tables(&self, database_name: &str) -> ConnectorResult<Vec<String>>;

    /// Fetch one table's DDL and hand it to `on_fetched` exactly once.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Structure` when the table is missing or ambiguous;
    /// the callback is not invoked in that case.
    async fn get_table_structure(
        &self,
        database_name: &str,
        table_name: &str,
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()>;

    /// Fetch the DDL of every table in `table_names`, one callback per table.
    ///
    /// Fails fast: the first table that cannot be resolved stops the batch and
    /// its error is returned. Callbacks already delivered stand.
    async fn get_table_structure_batch(
        &self,
        database_name: &str,
        table_names: &[String],
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        for table_name in table_names {
            self.get_table_structure(database_name, table_name, &mut *on_fetched)
                .await?;
        }
        Ok(())
    }

    /// Lazily yield `(name, ddl)` pairs for `table_names`.
    ///
    /// Each item is fetched when polled. The stream ends after the first error.
    fn table_structures<'a>(
        &'a self,
        database_name: &'a str,
        table_names: &'a [String],
    ) -> BoxStream<'a, ConnectorResult<TableStructure>> {
        stream::unfold(
            (table_names.iter(), false),
            move |(mut remaining, failed)| async move {
                if failed {
                    return None;
                }
                let table_name = remaining.next()?;

                let mut structure = None;
                let fetched = {
                    let mut capture =
                        |_: &str, ddl: &str| structure = Some(ddl.to_string());
                    self.get_table_structure(database_name, table_name, &mut capture)
                        .await
                };
                let item = fetched.map(|()| TableStructure {
                    name: table_name.clone(),
                    structure: structure.unwrap_or_default(),
                });
                let failed = item.is_err();
                Some((item, (remaining, failed)))
            },
        )
        .boxed()
    }
}

/// A boxed connector trait object.
pub type BoxedConnector = Box<dyn Connector>;
