//! PostgreSQL connector implementation.
//!
//! This module implements the `Connector` trait for PostgreSQL using a single
//! SQLx `PgConnection` per call. PostgreSQL cannot query across databases, so
//! every per-database operation connects to that database directly.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Either, Executor, PgConnection};

use super::types::PgValueConverter;
use crate::config::ConnectorSettings;
use crate::services::database::drivers::ddl::with_connect_deadline;
use crate::services::database::traits::error::sqlx_message;
use crate::services::database::traits::{
    BoxedConnector, ConnectionProfile, Connector, ConnectorError, ConnectorResult, EngineType,
    ExecutionResult, StructureCallback,
};

/// Database used for server-level calls when the profile names none.
const MAINTENANCE_DATABASE: &str = "postgres";

/// PostgreSQL connector bound to one profile.
pub struct PostgresConnector {
    profile: ConnectionProfile,
    settings: ConnectorSettings,
}

impl std::fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnector")
            .field("profile", &self.profile.display_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl PostgresConnector {
    pub fn new(profile: ConnectionProfile, settings: ConnectorSettings) -> Self {
        Self { profile, settings }
    }

    /// Create a boxed connector (for factory use).
    pub fn boxed(profile: ConnectionProfile, settings: ConnectorSettings) -> BoxedConnector {
        Box::new(Self::new(profile, settings))
    }

    /// Build PgConnectOptions, falling back to the profile database and then
    /// to `postgres`.
    pub(crate) fn build_connect_options(&self, database: Option<&str>) -> PgConnectOptions {
        let database = database
            .or(self.profile.database.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(MAINTENANCE_DATABASE);

        let options = PgConnectOptions::new()
            .host(&self.profile.host)
            .port(self.profile.port)
            .username(&self.profile.username)
            .password(&self.profile.password)
            .database(database);

        PgValueConverter::apply_ssl(options, self.profile.ssl.as_ref())
    }

    async fn open(&self, database: Option<&str>) -> ConnectorResult<PgConnection> {
        let options = self.build_connect_options(database);
        tracing::debug!(
            "Opening PostgreSQL connection to {} ({:?})",
            self.profile.display_name(),
            options.get_database()
        );

        with_connect_deadline(self.settings.connect_timeout, async {
            PgConnection::connect_with(&options)
                .await
                .map_err(|e| ConnectorError::Connection(sqlx_message(&e)))
        })
        .await
    }

    async fn release(conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close PostgreSQL connection cleanly: {}", e);
        }
    }

    /// Run a statement through the simple query protocol.
    async fn run_statement(
        conn: &mut PgConnection,
        statement: &str,
    ) -> ConnectorResult<ExecutionResult> {
        let mut rows = Vec::new();
        let mut affected_rows = 0;

        let mut results = conn.fetch_many(statement);
        while let Some(step) = results
            .try_next()
            .await
            .map_err(|e| ConnectorError::Execution(sqlx_message(&e)))?
        {
            match step {
                Either::Left(done) => affected_rows += done.rows_affected(),
                Either::Right(row) => rows.push(PgValueConverter::convert_row(&row)),
            }
        }

        Ok(ExecutionResult::from_parts(rows, affected_rows))
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn engine_type(&self) -> EngineType {
        EngineType::PostgreSQL
    }

    fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    async fn test_connection(&self) -> ConnectorResult<bool> {
        let conn = self.open(None).await?;
        Self::release(conn).await;
        Ok(true)
    }

    async fn execute(
        &self,
        database_name: &str,
        statement: &str,
    ) -> ConnectorResult<ExecutionResult> {
        let mut conn = self.open(Some(database_name)).await?;
        let result = Self::run_statement(&mut conn, statement).await;
        Self::release(conn).await;
        result
    }

    async fn get_databases(&self) -> ConnectorResult<Vec<String>> {
        let mut conn = self.open(None).await?;
        let result = Self::list_databases(&mut conn).await;
        Self::release(conn).await;
        result
    }

    async fn get_tables(&self, database_name: &str) -> ConnectorResult<Vec<String>> {
        let mut conn = self.open(Some(database_name)).await?;
        let result = Self::list_tables(&mut conn).await;
        Self::release(conn).await;
        result
    }

    async fn get_table_structure(
        &self,
        database_name: &str,
        table_name: &str,
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        let mut conn = self.open(Some(database_name)).await?;
        let result = Self::create_table_statement(&mut conn, table_name).await;
        Self::release(conn).await;
        on_fetched(table_name, &result?);
        Ok(())
    }

    /// Reuses one connection for the whole batch; fails fast.
    async fn get_table_structure_batch(
        &self,
        database_name: &str,
        table_names: &[String],
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        if table_names.is_empty() {
            return Ok(());
        }

        let mut conn = self.open(Some(database_name)).await?;
        let mut result = Ok(());
        for table_name in table_names {
            match Self::create_table_statement(&mut conn, table_name).await {
                Ok(ddl) => on_fetched(table_name, &ddl),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        Self::release(conn).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_profile() -> ConnectionProfile {
        ConnectionProfile::new(
            "test".to_string(),
            EngineType::PostgreSQL,
            "localhost".to_string(),
            5432,
            "postgres".to_string(),
            "password".to_string(),
        )
    }

    #[test]
    fn test_postgres_connector_new() {
        let conn = PostgresConnector::new(create_test_profile(), ConnectorSettings::default());

        assert_eq!(conn.engine_type(), EngineType::PostgreSQL);
        assert_eq!(conn.profile().port, 5432);
    }

    #[test]
    fn test_build_connect_options_database_fallbacks() {
        let conn = PostgresConnector::new(create_test_profile(), ConnectorSettings::default());
        assert_eq!(conn.build_connect_options(None).get_database(), Some("postgres"));
        assert_eq!(
            conn.build_connect_options(Some("shop")).get_database(),
            Some("shop")
        );

        let profile = create_test_profile().with_database("analytics");
        let conn = PostgresConnector::new(profile, ConnectorSettings::default());
        assert_eq!(
            conn.build_connect_options(None).get_database(),
            Some("analytics")
        );
    }

    #[test]
    fn test_unreachable_server_is_connection_error() {
        let mut profile = create_test_profile();
        profile.host = "127.0.0.1".to_string();
        profile.port = 1;
        let settings = ConnectorSettings::default().with_connect_timeout(Duration::from_secs(2));
        let conn = PostgresConnector::new(profile, settings);

        let result = smol::block_on(conn.get_databases());
        assert!(matches!(result, Err(ConnectorError::Connection(_))));
    }

    #[test]
    fn test_empty_batch_does_not_connect() {
        let mut profile = create_test_profile();
        profile.host = "127.0.0.1".to_string();
        profile.port = 1;
        let conn = PostgresConnector::new(profile, ConnectorSettings::default());

        let result = smol::block_on(conn.get_table_structure_batch(
            "shop",
            &[],
            &mut |_: &str, _: &str| {},
        ));
        assert_eq!(result, Ok(()));
    }
}
