//! MySQL connector implementation.
//!
//! This module implements the `Connector` trait for MySQL using a single SQLx
//! `MySqlConnection` per call.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, Either, Executor, MySqlConnection};

use super::types::MySqlValueConverter;
use crate::config::ConnectorSettings;
use crate::services::database::drivers::ddl::with_connect_deadline;
use crate::services::database::traits::error::sqlx_message;
use crate::services::database::traits::{
    BoxedConnector, ConnectionProfile, Connector, ConnectorError, ConnectorResult, EngineType,
    ExecutionResult, StructureCallback,
};

/// MySQL connector bound to one profile.
pub struct MySqlConnector {
    profile: ConnectionProfile,
    settings: ConnectorSettings,
}

impl std::fmt::Debug for MySqlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnector")
            .field("profile", &self.profile.display_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl MySqlConnector {
    /// Create a new MySQL connector. Nothing is opened until an operation runs.
    pub fn new(profile: ConnectionProfile, settings: ConnectorSettings) -> Self {
        Self { profile, settings }
    }

    /// Create a boxed connector (for factory use).
    pub fn boxed(profile: ConnectionProfile, settings: ConnectorSettings) -> BoxedConnector {
        Box::new(Self::new(profile, settings))
    }

    /// Build MySqlConnectOptions from the profile, optionally rebinding the database.
    pub(crate) fn build_connect_options(&self, database: Option<&str>) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.profile.host)
            .port(self.profile.port)
            .username(&self.profile.username)
            .password(&self.profile.password);

        let options = match database.or(self.profile.database.as_deref()) {
            Some(database) if !database.is_empty() => options.database(database),
            _ => options,
        };

        MySqlValueConverter::apply_ssl(options, self.profile.ssl.as_ref())
    }

    /// Open a fresh connection.
    async fn open(&self, database: Option<&str>) -> ConnectorResult<MySqlConnection> {
        let options = self.build_connect_options(database);
        tracing::debug!("Opening MySQL connection to {}", self.profile.display_name());

        with_connect_deadline(self.settings.connect_timeout, async {
            MySqlConnection::connect_with(&options)
                .await
                .map_err(|e| ConnectorError::Connection(sqlx_message(&e)))
        })
        .await
    }

    /// Close a connection, logging (not surfacing) close failures.
    async fn release(conn: MySqlConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close MySQL connection cleanly: {}", e);
        }
    }

    /// Run a statement through the text protocol, collecting rows and counts.
    async fn run_statement(
        conn: &mut MySqlConnection,
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
                Either::Right(row) => rows.push(MySqlValueConverter::convert_row(&row)),
            }
        }

        Ok(ExecutionResult::from_parts(rows, affected_rows))
    }

    async fn structures(
        conn: &mut MySqlConnection,
        database_name: &str,
        table_names: &[String],
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        for table_name in table_names {
            let ddl = Self::show_create_table(conn, database_name, table_name).await?;
            on_fetched(table_name, &ddl);
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    fn engine_type(&self) -> EngineType {
        EngineType::MySQL
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
        let mut conn = self.open(None).await?;
        let result = Self::list_tables(&mut conn, database_name).await;
        Self::release(conn).await;
        result
    }

    async fn get_table_structure(
        &self,
        database_name: &str,
        table_name: &str,
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        let mut conn = self.open(None).await?;
        let result = Self::show_create_table(&mut conn, database_name, table_name).await;
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

        let mut conn = self.open(None).await?;
        let result = Self::structures(&mut conn, database_name, table_names, on_fetched).await;
        Self::release(conn).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::SslConfig;
    use std::time::Duration;

    fn create_test_profile() -> ConnectionProfile {
        ConnectionProfile::new(
            "test".to_string(),
            EngineType::MySQL,
            "localhost".to_string(),
            3306,
            "root".to_string(),
            "password".to_string(),
        )
    }

    #[test]
    fn test_mysql_connector_new() {
        let conn = MySqlConnector::new(create_test_profile(), ConnectorSettings::default());

        assert_eq!(conn.engine_type(), EngineType::MySQL);
        assert_eq!(conn.profile().title, "test");
    }

    #[test]
    fn test_build_connect_options_rebinds_database() {
        let profile = create_test_profile().with_database("app");
        let conn = MySqlConnector::new(profile, ConnectorSettings::default());

        let options = conn.build_connect_options(Some("mydb"));
        assert_eq!(options.get_database(), Some("mydb"));

        let options = conn.build_connect_options(None);
        assert_eq!(options.get_database(), Some("app"));
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_host(), "localhost");
    }

    #[test]
    fn test_build_connect_options_with_ssl() {
        let profile = create_test_profile().with_ssl(SslConfig::default());
        let conn = MySqlConnector::new(profile, ConnectorSettings::default());

        let options = conn.build_connect_options(None);
        assert_eq!(options.get_database(), None);
    }

    #[test]
    fn test_unreachable_server_is_connection_error() {
        let mut profile = create_test_profile();
        profile.host = "127.0.0.1".to_string();
        profile.port = 1;
        let settings = ConnectorSettings::default().with_connect_timeout(Duration::from_secs(2));
        let conn = MySqlConnector::new(profile, settings);

        let result = smol::block_on(conn.test_connection());
        assert!(matches!(result, Err(ConnectorError::Connection(_))));
    }

    #[test]
    fn test_structure_not_delivered_when_unreachable() {
        let mut profile = create_test_profile();
        profile.host = "127.0.0.1".to_string();
        profile.port = 1;
        let settings = ConnectorSettings::default().with_connect_timeout(Duration::from_secs(2));
        let conn = MySqlConnector::new(profile, settings);
        let mut invoked = false;

        let result = smol::block_on(conn.get_table_structure(
            "mydb",
            "orders",
            &mut |_: &str, _: &str| invoked = true,
        ));

        assert!(result.is_err());
        assert!(!invoked);
    }
}
