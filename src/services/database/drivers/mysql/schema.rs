//! MySQL schema introspection.
//!
//! Metadata queries run on a connection opened by the caller; the caller owns
//! its release.

use sqlx::mysql::MySqlDatabaseError;
use sqlx::{Executor, MySqlConnection};

use super::connection::MySqlConnector;
use super::types::MySqlValueConverter;
use crate::services::database::drivers::ddl::{retain_user_databases, Quote};
use crate::services::database::traits::error::sqlx_message;
use crate::services::database::traits::{ConnectorError, ConnectorResult};

/// Databases MySQL reserves for itself.
pub const SYSTEM_DATABASES: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// SQLSTATE for "table doesn't exist".
const NO_SUCH_TABLE: &str = "42S02";

impl MySqlConnector {
    pub(super) async fn list_databases(conn: &mut MySqlConnection) -> ConnectorResult<Vec<String>> {
        let query = r#"
            SELECT schema_name AS db_name
            FROM information_schema.schemata
            WHERE schema_name NOT IN (?, ?, ?, ?)
            ORDER BY schema_name
        "#;

        let mut statement = sqlx::query(query);
        for name in SYSTEM_DATABASES {
            statement = statement.bind(name);
        }
        let rows = statement
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ConnectorError::Execution(sqlx_message(&e)))?;

        let names = rows
            .iter()
            .map(|row| MySqlValueConverter::text_column(row, 0))
            .collect::<ConnectorResult<Vec<_>>>()?;

        Ok(retain_user_databases(names, &SYSTEM_DATABASES))
    }

    pub(super) async fn list_tables(
        conn: &mut MySqlConnection,
        database_name: &str,
    ) -> ConnectorResult<Vec<String>> {
        let query = r#"
            SELECT TABLE_NAME AS table_name
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(query)
            .bind(database_name)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ConnectorError::Execution(sqlx_message(&e)))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = MySqlValueConverter::text_column(row, 0)?;
            if !name.is_empty() {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// `SHOW CREATE TABLE` for one table. A missing table is a structure error.
    pub(super) async fn show_create_table(
        conn: &mut MySqlConnection,
        database_name: &str,
        table_name: &str,
    ) -> ConnectorResult<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}",
            Quote::Backtick.qualified(Some(database_name), table_name)
        );

        let rows = match conn.fetch_all(sql.as_str()).await {
            Ok(rows) => rows,
            Err(e) if Self::is_missing_table(&e) => {
                return Err(ConnectorError::structure(table_name, 0));
            }
            Err(e) => return Err(ConnectorError::Execution(sqlx_message(&e))),
        };

        if rows.len() != 1 {
            return Err(ConnectorError::structure(table_name, rows.len()));
        }

        // Columns are (Table, Create Table)
        MySqlValueConverter::text_column(&rows[0], 1)
    }

    fn is_missing_table(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db_err| db_err.try_downcast_ref::<MySqlDatabaseError>())
            .and_then(|db_err| db_err.code())
            == Some(NO_SUCH_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_databases() {
        for name in ["information_schema", "mysql", "performance_schema", "sys"] {
            assert!(SYSTEM_DATABASES.contains(&name));
        }
    }

    #[test]
    fn test_client_errors_are_not_missing_tables() {
        assert!(!MySqlConnector::is_missing_table(&sqlx::Error::RowNotFound));
    }
}
