//! MSSQL connector implementation.
//!
//! This module implements the `Connector` trait for SQL Server using a single
//! tiberius `Client` over a smol `TcpStream` per call.

use async_trait::async_trait;
use smol::net::TcpStream;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};

use super::types::MssqlValueConverter;
use crate::config::ConnectorSettings;
use crate::services::database::drivers::ddl::with_connect_deadline;
use crate::services::database::traits::error::tiberius_message;
use crate::services::database::traits::{
    BoxedConnector, ConnectionProfile, Connector, ConnectorError, ConnectorResult, EngineType,
    ExecutionResult, StructureCallback,
};

pub(super) type MssqlClient = Client<TcpStream>;

pub(super) fn execution_error(e: tiberius::error::Error) -> ConnectorError {
    ConnectorError::Execution(tiberius_message(&e))
}

fn connection_error(e: tiberius::error::Error) -> ConnectorError {
    ConnectorError::Connection(tiberius_message(&e))
}

/// Lowercased leading keyword of every statement in a T-SQL batch.
fn statement_keywords(batch: &str) -> Vec<String> {
    let bytes = batch.as_bytes();
    let mut keywords = Vec::new();
    let mut at_start = true;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                idx = batch[idx..].find('\n').map_or(bytes.len(), |end| idx + end + 1);
            }
            b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                idx = batch[idx + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| idx + 2 + end + 2);
            }
            b'\'' => {
                idx += 1;
                while idx < bytes.len() {
                    if bytes[idx] == b'\'' {
                        if bytes.get(idx + 1) != Some(&b'\'') {
                            break;
                        }
                        idx += 1;
                    }
                    idx += 1;
                }
                idx += 1;
                at_start = false;
            }
            b';' => {
                at_start = true;
                idx += 1;
            }
            b'(' => idx += 1,
            byte if byte.is_ascii_whitespace() => idx += 1,
            byte if at_start && byte.is_ascii_alphabetic() => {
                let start = idx;
                while bytes
                    .get(idx)
                    .is_some_and(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
                {
                    idx += 1;
                }
                keywords.push(batch[start..idx].to_ascii_lowercase());
                at_start = false;
            }
            _ => {
                at_start = false;
                idx += 1;
            }
        }
    }

    keywords
}

/// SQL Server connector bound to one profile.
pub struct MssqlConnector {
    profile: ConnectionProfile,
    settings: ConnectorSettings,
}

impl std::fmt::Debug for MssqlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnector")
            .field("profile", &self.profile.display_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl MssqlConnector {
    pub fn new(profile: ConnectionProfile, settings: ConnectorSettings) -> Self {
        Self { profile, settings }
    }

    /// Create a boxed connector (for factory use).
    pub fn boxed(profile: ConnectionProfile, settings: ConnectorSettings) -> BoxedConnector {
        Box::new(Self::new(profile, settings))
    }

    /// Write the profile's CA certificate to a `.pem` file tiberius can read.
    ///
    /// The file is removed when the returned handle drops, so it must outlive
    /// the TLS handshake.
    pub(crate) fn write_ca_file(&self) -> ConnectorResult<Option<NamedTempFile>> {
        let Some(ca) = self
            .profile
            .ssl
            .as_ref()
            .and_then(|ssl| ssl.ca.as_deref())
            .filter(|ca| !ca.is_empty())
        else {
            return Ok(None);
        };

        let ca_error = |e: std::io::Error| {
            ConnectorError::Connection(format!("failed to stage CA certificate: {}", e))
        };
        let mut file = tempfile::Builder::new()
            .prefix("dbscope-ca-")
            .suffix(".pem")
            .tempfile()
            .map_err(ca_error)?;
        file.write_all(ca.as_bytes()).map_err(ca_error)?;
        file.flush().map_err(ca_error)?;
        Ok(Some(file))
    }

    /// Build the tiberius configuration.
    ///
    /// Without TLS settings only the login is encrypted. With TLS settings the
    /// whole session is. The server certificate is then validated against
    /// `ca_path` when given, otherwise it is trusted as presented.
    pub(crate) fn build_config(&self, database: Option<&str>, ca_path: Option<&Path>) -> Config {
        let mut config = Config::new();
        config.host(&self.profile.host);
        config.port(self.profile.port);
        config.authentication(AuthMethod::sql_server(
            &self.profile.username,
            &self.profile.password,
        ));

        if let Some(database) = database
            .or(self.profile.database.as_deref())
            .filter(|name| !name.is_empty())
        {
            config.database(database);
        }

        match (&self.profile.ssl, ca_path) {
            (None, _) => {
                config.encryption(EncryptionLevel::Off);
                config.trust_cert();
            }
            (Some(_), Some(ca_path)) => {
                config.encryption(EncryptionLevel::Required);
                config.trust_cert_ca(ca_path.to_string_lossy());
            }
            (Some(_), None) => {
                config.encryption(EncryptionLevel::Required);
                config.trust_cert();
            }
        }

        config
    }

    async fn open(&self, database: Option<&str>) -> ConnectorResult<MssqlClient> {
        let ca_file = self.write_ca_file()?;
        let config = self.build_config(database, ca_file.as_ref().map(NamedTempFile::path));
        tracing::debug!("Opening MSSQL connection to {}", self.profile.display_name());

        let client = with_connect_deadline(self.settings.connect_timeout, async move {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| ConnectorError::Connection(e.to_string()))?;
            tcp.set_nodelay(true)
                .map_err(|e| ConnectorError::Connection(e.to_string()))?;

            Client::connect(config, tcp).await.map_err(connection_error)
        })
        .await;

        drop(ca_file);
        client
    }

    async fn release(client: MssqlClient) {
        if let Err(e) = client.close().await {
            tracing::warn!("Failed to close MSSQL connection cleanly: {}", e);
        }
    }

    /// Whether a batch may produce a result set. tiberius reports either rows
    /// or affected counts for a call, never both.
    ///
    /// True when any statement of the batch leads with `SELECT`, `WITH` or
    /// `EXEC`/`EXECUTE`. Comments, string literals and opening parentheses are
    /// skipped while looking for the leading keywords.
    fn returns_rows(statement: &str) -> bool {
        statement_keywords(statement)
            .iter()
            .any(|keyword| matches!(keyword.as_str(), "select" | "with" | "exec" | "execute"))
    }

    async fn run_statement(
        client: &mut MssqlClient,
        statement: &str,
    ) -> ConnectorResult<ExecutionResult> {
        if Self::returns_rows(statement) {
            let results = client
                .simple_query(statement)
                .await
                .map_err(execution_error)?
                .into_results()
                .await
                .map_err(execution_error)?;

            let rows = results
                .iter()
                .flatten()
                .map(MssqlValueConverter::convert_row)
                .collect();
            Ok(ExecutionResult::from_parts(rows, 0))
        } else {
            let done = client
                .execute(statement, &[])
                .await
                .map_err(execution_error)?;
            Ok(ExecutionResult::affected(done.rows_affected().iter().sum()))
        }
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    fn engine_type(&self) -> EngineType {
        EngineType::MSSQL
    }

    fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    async fn test_connection(&self) -> ConnectorResult<bool> {
        let client = self.open(None).await?;
        Self::release(client).await;
        Ok(true)
    }

    async fn execute(
        &self,
        database_name: &str,
        statement: &str,
    ) -> ConnectorResult<ExecutionResult> {
        let mut client = self.open(Some(database_name)).await?;
        let result = Self::run_statement(&mut client, statement).await;
        Self::release(client).await;
        result
    }

    async fn get_databases(&self) -> ConnectorResult<Vec<String>> {
        let mut client = self.open(None).await?;
        let result = Self::list_databases(&mut client).await;
        Self::release(client).await;
        result
    }

    async fn get_tables(&self, database_name: &str) -> ConnectorResult<Vec<String>> {
        let mut client = self.open(Some(database_name)).await?;
        let result = Self::list_tables(&mut client).await;
        Self::release(client).await;
        result
    }

    async fn get_table_structure(
        &self,
        database_name: &str,
        table_name: &str,
        on_fetched: &mut StructureCallback<'_>,
    ) -> ConnectorResult<()> {
        let mut client = self.open(Some(database_name)).await?;
        let result = Self::create_table_statement(&mut client, table_name).await;
        Self::release(client).await;
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

        let mut client = self.open(Some(database_name)).await?;
        let mut result = Ok(());
        for table_name in table_names {
            match Self::create_table_statement(&mut client, table_name).await {
                Ok(ddl) => on_fetched(table_name, &ddl),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        Self::release(client).await;
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
            EngineType::MSSQL,
            "localhost".to_string(),
            1433,
            "sa".to_string(),
            "Passw0rd!".to_string(),
        )
    }

    #[test]
    fn test_mssql_connector_new() {
        let conn = MssqlConnector::new(create_test_profile(), ConnectorSettings::default());
        assert_eq!(conn.engine_type(), EngineType::MSSQL);
    }

    #[test]
    fn test_build_config_address() {
        let conn = MssqlConnector::new(create_test_profile(), ConnectorSettings::default());
        assert_eq!(conn.build_config(Some("shop"), None).get_addr(), "localhost:1433");

        let profile = create_test_profile().with_ssl(SslConfig::default());
        let conn = MssqlConnector::new(profile, ConnectorSettings::default());
        assert_eq!(conn.build_config(None, None).get_addr(), "localhost:1433");
    }

    #[test]
    fn test_ca_file_holds_profile_certificate() {
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
        let profile = create_test_profile().with_ssl(SslConfig {
            ca: Some(pem.to_string()),
            ..SslConfig::default()
        });
        let conn = MssqlConnector::new(profile, ConnectorSettings::default());

        let file = conn.write_ca_file().unwrap().unwrap();
        assert_eq!(file.path().extension().and_then(|e| e.to_str()), Some("pem"));
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), pem);

        let path = file.path().to_path_buf();
        let config = conn.build_config(None, Some(&path));
        assert_eq!(config.get_addr(), "localhost:1433");
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_no_ca_file_without_certificate() {
        let conn = MssqlConnector::new(create_test_profile(), ConnectorSettings::default());
        assert!(conn.write_ca_file().unwrap().is_none());

        let profile = create_test_profile().with_ssl(SslConfig {
            ca: Some(String::new()),
            ..SslConfig::default()
        });
        let conn = MssqlConnector::new(profile, ConnectorSettings::default());
        assert!(conn.write_ca_file().unwrap().is_none());
    }

    #[test]
    fn test_returns_rows() {
        assert!(MssqlConnector::returns_rows("  SELECT 1"));
        assert!(MssqlConnector::returns_rows("with t as (select 1 as x) select * from t"));
        assert!(!MssqlConnector::returns_rows("UPDATE t SET x = 1"));
        assert!(!MssqlConnector::returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!MssqlConnector::returns_rows(""));
    }

    #[test]
    fn test_returns_rows_skips_comments_and_parens() {
        assert!(MssqlConnector::returns_rows("-- list\nSELECT 1 AS x"));
        assert!(MssqlConnector::returns_rows("/* report; v2 */ select name from sys.tables"));
        assert!(MssqlConnector::returns_rows("(SELECT 1 AS x)"));
        assert!(MssqlConnector::returns_rows("-- a; b\n  ((select 1))"));
        assert!(!MssqlConnector::returns_rows("-- SELECT\nDELETE FROM t"));
    }

    #[test]
    fn test_returns_rows_for_procedures_and_batches() {
        assert!(MssqlConnector::returns_rows("EXEC sp_databases"));
        assert!(MssqlConnector::returns_rows("execute dbo.report @year = 2024"));
        assert!(MssqlConnector::returns_rows("SET NOCOUNT ON; SELECT 1 AS x"));
        assert!(!MssqlConnector::returns_rows("SET NOCOUNT ON; UPDATE t SET x = 1"));
        assert!(!MssqlConnector::returns_rows("UPDATE t SET note = 'a; select'"));
    }

    #[test]
    fn test_statement_keywords() {
        assert_eq!(
            statement_keywords("set nocount on;\n/* x */ insert into t select 1; exec p"),
            vec!["set".to_string(), "insert".to_string(), "exec".to_string()]
        );
        assert_eq!(statement_keywords("UPDATE t SET s = 'it''s; fine'"), vec!["update".to_string()]);
    }

    #[test]
    fn test_unreachable_server_is_connection_error() {
        let mut profile = create_test_profile();
        profile.host = "127.0.0.1".to_string();
        profile.port = 1;
        let settings = ConnectorSettings::default().with_connect_timeout(Duration::from_secs(2));
        let conn = MssqlConnector::new(profile, settings);

        let result = smol::block_on(conn.test_connection());
        assert!(matches!(result, Err(ConnectorError::Connection(_))));
    }
}
