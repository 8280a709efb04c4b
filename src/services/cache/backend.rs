//! The remote side of schema discovery.
//!
//! The orchestrator never talks to a database directly. It sends
//! `SchemaRequest`s to a `SchemaBackend` and reads `ApiResponse`s back, the same
//! contract an HTTP handler would serve.

use async_trait::async_trait;

use super::orchestrator::OrchestratorError;
use super::transport::{ApiResponse, SchemaRequest};
use crate::config::ConnectorSettings;
use crate::services::database::drivers::ConnectorFactory;
use crate::services::database::traits::{Connector, ConnectorResult, Table};

/// Serves database lists and table schemas.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// List the databases of `request.connection`.
    async fn fetch_databases(
        &self,
        request: SchemaRequest,
    ) -> Result<ApiResponse<Vec<String>>, OrchestratorError>;

    /// List the tables of `request.database`, with their structures.
    async fn fetch_schema(
        &self,
        request: SchemaRequest,
    ) -> Result<ApiResponse<Vec<Table>>, OrchestratorError>;
}

/// In-process backend going through the connector factory.
///
/// Database listing failures propagate as errors; schema failures are reported
/// in the response `message`.
#[derive(Debug, Clone, Default)]
pub struct ConnectorBackend {
    settings: ConnectorSettings,
}

impl ConnectorBackend {
    pub fn new(settings: ConnectorSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SchemaBackend for ConnectorBackend {
    async fn fetch_databases(
        &self,
        request: SchemaRequest,
    ) -> Result<ApiResponse<Vec<String>>, OrchestratorError> {
        let connector = ConnectorFactory::create_with_settings(request.connection, &self.settings)?;
        let databases = connector.get_databases().await?;
        Ok(ApiResponse::ok(databases))
    }

    async fn fetch_schema(
        &self,
        request: SchemaRequest,
    ) -> Result<ApiResponse<Vec<Table>>, OrchestratorError> {
        let Some(database) = request.database else {
            return Ok(ApiResponse::failure("a database name is required"));
        };
        let connector = ConnectorFactory::create_with_settings(request.connection, &self.settings)?;

        match tables_with_structure(connector.as_ref(), &database).await {
            Ok(tables) => Ok(ApiResponse::ok(tables)),
            Err(e) => {
                tracing::warn!("Schema fetch for {} failed: {}", database, e);
                Ok(ApiResponse::failure(e.to_string()))
            }
        }
    }
}

/// List the tables of `database_name` and fill their DDL with one batch fetch.
pub async fn tables_with_structure(
    connector: &dyn Connector,
    database_name: &str,
) -> ConnectorResult<Vec<Table>> {
    let names = connector.get_tables(database_name).await?;
    let mut tables: Vec<Table> = names.iter().map(Table::new).collect();

    let mut fill = |name: &str, ddl: &str| {
        if let Some(table) = tables.iter_mut().find(|table| table.name == name) {
            table.structure = ddl.to_string();
        }
    };
    connector
        .get_table_structure_batch(database_name, &names, &mut fill)
        .await?;

    Ok(tables)
}
