//! MSSQL schema introspection through `sys.databases` and `INFORMATION_SCHEMA`.

use tiberius::{Row, ToSql};

use super::connection::{execution_error, MssqlClient, MssqlConnector};
use super::types::MssqlValueConverter;
use crate::services::database::drivers::ddl::{
    display_table_name, render_create_table, retain_user_databases, split_table_name, Quote,
};
use crate::services::database::traits::{ColumnDetail, ConnectorError, ConnectorResult};

/// Databases SQL Server reserves for itself.
pub const SYSTEM_DATABASES: [&str; 4] = ["master", "tempdb", "model", "msdb"];

/// Schema whose tables are listed without a prefix.
pub const DEFAULT_SCHEMA: &str = "dbo";

fn text(row: &Row, index: usize) -> ConnectorResult<Option<String>> {
    row.try_get::<&str, _>(index)
        .map(|value| value.map(str::to_string))
        .map_err(execution_error)
}

fn number(row: &Row, index: usize) -> ConnectorResult<Option<i32>> {
    row.try_get::<i32, _>(index).map_err(execution_error)
}

/// Group `(constraint, kind, column)` rows, already ordered, into clauses.
fn key_constraints(rows: &[(String, String, String)]) -> Vec<String> {
    let mut grouped: Vec<(&str, &str, Vec<String>)> = Vec::new();
    for (name, kind, column) in rows {
        match grouped.last_mut() {
            Some((last, _, columns)) if *last == name.as_str() => {
                columns.push(Quote::Bracket.ident(column));
            }
            _ => grouped.push((name.as_str(), kind.as_str(), vec![Quote::Bracket.ident(column)])),
        }
    }

    grouped
        .into_iter()
        .map(|(name, kind, columns)| {
            format!(
                "CONSTRAINT {} {} ({})",
                Quote::Bracket.ident(name),
                kind,
                columns.join(", ")
            )
        })
        .collect()
}

impl MssqlConnector {
    pub(super) async fn list_databases(client: &mut MssqlClient) -> ConnectorResult<Vec<String>> {
        let reserved = SYSTEM_DATABASES;
        let params: Vec<&dyn ToSql> = reserved
            .iter()
            .map(|name| name as &dyn ToSql)
            .collect();

        let rows = client
            .query(
                "SELECT name FROM sys.databases WHERE name NOT IN (@P1, @P2, @P3, @P4) ORDER BY name",
                &params,
            )
            .await
            .map_err(execution_error)?
            .into_first_result()
            .await
            .map_err(execution_error)?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(name) = text(row, 0)? {
                names.push(name);
            }
        }
        Ok(retain_user_databases(names, &SYSTEM_DATABASES))
    }

    pub(super) async fn list_tables(client: &mut MssqlClient) -> ConnectorResult<Vec<String>> {
        let rows = client
            .simple_query(
                "SELECT TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_SCHEMA, TABLE_NAME",
            )
            .await
            .map_err(execution_error)?
            .into_first_result()
            .await
            .map_err(execution_error)?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            if let (Some(schema), Some(table)) = (text(row, 0)?, text(row, 1)?) {
                tables.push(display_table_name(&schema, &table, DEFAULT_SCHEMA));
            }
        }
        Ok(tables)
    }

    /// Render `CREATE TABLE` for a listed table name.
    pub(super) async fn create_table_statement(
        client: &mut MssqlClient,
        table_name: &str,
    ) -> ConnectorResult<String> {
        let (schema, table) = split_table_name(table_name, DEFAULT_SCHEMA);
        let schema: &str = &schema;

        let matches = client
            .query(
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2",
                &[&schema, &table],
            )
            .await
            .map_err(execution_error)?
            .into_row()
            .await
            .map_err(execution_error)?;
        let count = match &matches {
            Some(row) => number(row, 0)?.unwrap_or(0),
            None => 0,
        };
        if count != 1 {
            return Err(ConnectorError::structure(table_name, count.max(0) as usize));
        }

        let columns = Self::columns(client, schema, table).await?;
        let constraints = Self::constraints(client, schema, table).await?;

        Ok(render_create_table(
            Quote::Bracket,
            &Quote::Bracket.qualified(Some(schema), table),
            &columns,
            &constraints,
        ))
    }

    async fn columns(
        client: &mut MssqlClient,
        schema: &str,
        table: &str,
    ) -> ConnectorResult<Vec<ColumnDetail>> {
        let query = r#"
            SELECT COLUMN_NAME,
                   DATA_TYPE,
                   CAST(CHARACTER_MAXIMUM_LENGTH AS INT),
                   CAST(NUMERIC_PRECISION AS INT),
                   CAST(NUMERIC_SCALE AS INT),
                   IS_NULLABLE,
                   COLUMN_DEFAULT
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = client
            .query(query, &[&schema, &table])
            .await
            .map_err(execution_error)?
            .into_first_result()
            .await
            .map_err(execution_error)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text(row, 0)?.unwrap_or_default();
            let data_type = MssqlValueConverter::render_type(
                &text(row, 1)?.unwrap_or_default(),
                number(row, 2)?,
                number(row, 3)?,
                number(row, 4)?,
            );
            let nullable = text(row, 5)?.is_none_or(|v| v.eq_ignore_ascii_case("YES"));

            columns.push(
                ColumnDetail::new(name, data_type)
                    .with_nullable(nullable)
                    .with_default(text(row, 6)?),
            );
        }
        Ok(columns)
    }

    async fn constraints(
        client: &mut MssqlClient,
        schema: &str,
        table: &str,
    ) -> ConnectorResult<Vec<String>> {
        let query = r#"
            SELECT tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, kcu.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
              ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
             AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
              AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY tc.CONSTRAINT_TYPE, tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows = client
            .query(query, &[&schema, &table])
            .await
            .map_err(execution_error)?
            .into_first_result()
            .await
            .map_err(execution_error)?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            if let (Some(name), Some(kind), Some(column)) =
                (text(row, 0)?, text(row, 1)?, text(row, 2)?)
            {
                keys.push((name, kind, column));
            }
        }
        Ok(key_constraints(&keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, kind: &str, column: &str) -> (String, String, String) {
        (name.to_string(), kind.to_string(), column.to_string())
    }

    #[test]
    fn test_key_constraints_grouping() {
        let rows = vec![
            key("PK_orders", "PRIMARY KEY", "id"),
            key("PK_orders", "PRIMARY KEY", "region"),
            key("UQ_orders_ref", "UNIQUE", "ref"),
        ];

        assert_eq!(
            key_constraints(&rows),
            vec![
                "CONSTRAINT [PK_orders] PRIMARY KEY ([id], [region])".to_string(),
                "CONSTRAINT [UQ_orders_ref] UNIQUE ([ref])".to_string(),
            ]
        );
        assert!(key_constraints(&[]).is_empty());
    }

    #[test]
    fn test_system_databases_are_reserved() {
        let names = vec!["master".to_string(), "shop".to_string(), "msdb".to_string()];
        assert_eq!(
            retain_user_databases(names, &SYSTEM_DATABASES),
            vec!["shop".to_string()]
        );
        assert_eq!(
            display_table_name("dbo", "orders", DEFAULT_SCHEMA),
            "orders"
        );
    }

    #[test]
    fn test_dotted_table_resolves_to_its_schema() {
        let listed = display_table_name("dbo", "events.v2", DEFAULT_SCHEMA);
        assert_eq!(listed, "dbo.events.v2");

        let (schema, table) = split_table_name(&listed, DEFAULT_SCHEMA);
        assert_eq!((&*schema, table), ("dbo", "events.v2"));
        assert_eq!(
            Quote::Bracket.qualified(Some(&*schema), table),
            "[dbo].[events.v2]"
        );
    }
}
