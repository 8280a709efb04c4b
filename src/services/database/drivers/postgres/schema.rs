//! PostgreSQL schema introspection.
//!
//! PostgreSQL has no `SHOW CREATE TABLE`; the DDL is rendered from
//! `pg_attribute` and `pg_constraint`.

use sqlx::postgres::types::Oid;
use sqlx::PgConnection;

use super::connection::PostgresConnector;
use crate::services::database::drivers::ddl::{
    display_table_name, render_create_table, retain_user_databases, split_table_name, Quote,
};
use crate::services::database::traits::error::sqlx_message;
use crate::services::database::traits::{ColumnDetail, ConnectorError, ConnectorResult};

/// Template databases shipped with every cluster.
pub const TEMPLATE_DATABASES: [&str; 2] = ["template0", "template1"];

/// Schema whose tables are listed without a prefix.
pub const DEFAULT_SCHEMA: &str = "public";

fn execution_error(e: sqlx::Error) -> ConnectorError {
    ConnectorError::Execution(sqlx_message(&e))
}

impl PostgresConnector {
    pub(super) async fn list_databases(conn: &mut PgConnection) -> ConnectorResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT datname::text FROM pg_database WHERE NOT datistemplate ORDER BY datname",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(execution_error)?;

        Ok(retain_user_databases(names, &TEMPLATE_DATABASES))
    }

    pub(super) async fn list_tables(conn: &mut PgConnection) -> ConnectorResult<Vec<String>> {
        let query = r#"
            SELECT n.nspname::text, c.relname::text
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('r', 'p')
              AND NOT c.relispartition
              AND n.nspname NOT IN ('pg_catalog', 'information_schema')
              AND n.nspname NOT LIKE 'pg_toast%'
              AND n.nspname NOT LIKE 'pg_temp%'
            ORDER BY n.nspname, c.relname
        "#;

        let rows: Vec<(String, String)> = sqlx::query_as(query)
            .fetch_all(&mut *conn)
            .await
            .map_err(execution_error)?;

        Ok(rows
            .iter()
            .map(|(schema, table)| display_table_name(schema, table, DEFAULT_SCHEMA))
            .collect())
    }

    /// Render `CREATE TABLE` for a listed table name.
    pub(super) async fn create_table_statement(
        conn: &mut PgConnection,
        table_name: &str,
    ) -> ConnectorResult<String> {
        let (schema, table) = split_table_name(table_name, DEFAULT_SCHEMA);
        let schema: &str = &schema;

        let oids: Vec<Oid> = sqlx::query_scalar(
            r#"
            SELECT c.oid
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname::text = $1 AND c.relname::text = $2 AND c.relkind IN ('r', 'p')
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(execution_error)?;

        let [oid] = oids[..] else {
            return Err(ConnectorError::structure(table_name, oids.len()));
        };

        let columns = Self::columns(conn, oid).await?;
        let constraints = Self::constraints(conn, oid).await?;

        Ok(render_create_table(
            Quote::Double,
            &Quote::Double.qualified(Some(schema), table),
            &columns,
            &constraints,
        ))
    }

    async fn columns(conn: &mut PgConnection, oid: Oid) -> ConnectorResult<Vec<ColumnDetail>> {
        let query = r#"
            SELECT a.attname::text,
                   format_type(a.atttypid, a.atttypmod),
                   a.attnotnull,
                   pg_get_expr(d.adbin, d.adrelid)
            FROM pg_attribute a
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE a.attrelid = $1 AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows: Vec<(String, String, bool, Option<String>)> = sqlx::query_as(query)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(execution_error)?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, not_null, default)| {
                ColumnDetail::new(name, data_type)
                    .with_nullable(!not_null)
                    .with_default(default)
            })
            .collect())
    }

    /// Constraint clauses, primary key first. Not-null constraints are already
    /// part of the column definitions.
    async fn constraints(conn: &mut PgConnection, oid: Oid) -> ConnectorResult<Vec<String>> {
        let query = r#"
            SELECT conname::text, pg_get_constraintdef(oid)
            FROM pg_constraint
            WHERE conrelid = $1 AND contype <> 'n'
            ORDER BY contype <> 'p', conname
        "#;

        let rows: Vec<(String, String)> = sqlx::query_as(query)
            .bind(oid)
            .fetch_all(&mut *conn)
            .await
            .map_err(execution_error)?;

        Ok(rows
            .iter()
            .map(|(name, definition)| {
                format!("CONSTRAINT {} {}", Quote::Double.ident(name), definition)
            })
            .collect())
    }
}
