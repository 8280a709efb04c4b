//! Shared helpers for identifier quoting, system database filtering and
//! `CREATE TABLE` rendering for engines without a native "show create" command.

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use futures::future::{self, Either};

use crate::services::database::traits::{ColumnDetail, ConnectorError};

/// Identifier quoting style of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `name` (MySQL)
    Backtick,
    /// "name" (PostgreSQL)
    Double,
    /// [name] (MSSQL)
    Bracket,
}

impl Quote {
    /// Quote a single identifier, escaping the closing delimiter.
    pub fn ident(self, name: &str) -> String {
        match self {
            Quote::Backtick => format!("`{}`", name.replace('`', "``")),
            Quote::Double => format!("\"{}\"", name.replace('"', "\"\"")),
            Quote::Bracket => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Quote `schema.table`, or just `table` when there is no schema.
    pub fn qualified(self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.ident(schema), self.ident(table)),
            None => self.ident(table),
        }
    }
}

/// Split a listed table name into `(schema, table)`.
///
/// Inverse of `display_table_name`. Everything after the first separator is
/// the table name, so dotted table names survive the round trip.
pub fn split_table_name<'a>(name: &'a str, default_schema: &'a str) -> (Cow<'a, str>, &'a str) {
    if let Some((schema, table)) = split_quoted_schema(name) {
        return (Cow::Owned(schema), table);
    }
    match name.split_once('.') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
            (Cow::Borrowed(schema), table)
        }
        _ => (Cow::Borrowed(default_schema), name),
    }
}

/// Name under which a table is listed.
///
/// Tables in the default schema are bare unless the bare form would be
/// misread as qualified. Schemas containing `.` or `"` are double-quoted.
pub fn display_table_name(schema: &str, table: &str, default_schema: &str) -> String {
    if schema == default_schema && !table.contains('.') && !table.starts_with('"') {
        return table.to_string();
    }
    if schema.contains('.') || schema.contains('"') {
        format!("{}.{}", Quote::Double.ident(schema), table)
    } else {
        format!("{}.{}", schema, table)
    }
}

/// Parse a `"schema".table` prefix, unescaping doubled quotes.
fn split_quoted_schema(name: &str) -> Option<(String, &str)> {
    let rest = name.strip_prefix('"')?;
    let mut schema = String::new();
    let mut chars = rest.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c != '"' {
            schema.push(c);
            continue;
        }
        if rest[idx + 1..].starts_with('"') {
            schema.push('"');
            chars.next();
            continue;
        }
        let table = rest[idx + 1..].strip_prefix('.')?;
        return (!table.is_empty()).then_some((schema, table));
    }
    None
}

/// Drop reserved databases from a listing.
pub fn retain_user_databases(names: Vec<String>, reserved: &[&str]) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !name.is_empty() && !reserved.contains(&name.as_str()))
        .collect()
}

/// Render a `CREATE TABLE` statement.
///
/// `constraints` are complete constraint clauses (e.g. `CONSTRAINT pk PRIMARY KEY (id)`).
pub fn render_create_table(
    quote: Quote,
    qualified_name: &str,
    columns: &[ColumnDetail],
    constraints: &[String],
) -> String {
    let mut lines: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut line = format!("  {} {}", quote.ident(&column.column_name), column.data_type);
            if !column.is_nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &column.column_default {
                line.push_str(" DEFAULT ");
                line.push_str(default);
            }
            line
        })
        .collect();

    lines.extend(constraints.iter().map(|constraint| format!("  {}", constraint)));

    format!("CREATE TABLE {} (\n{}\n);", qualified_name, lines.join(",\n"))
}

/// Await `connect`, failing with a connection error once `timeout` elapses.
pub async fn with_connect_deadline<T, F>(
    timeout: Duration,
    connect: F,
) -> Result<T, ConnectorError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    let timer = smol::Timer::after(timeout);
    futures::pin_mut!(connect);

    match future::select(connect, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(ConnectorError::Connection(format!(
            "timed out after {}s",
            timeout.as_secs_f64()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_delimiters() {
        assert_eq!(Quote::Backtick.ident("or`ders"), "`or``ders`");
        assert_eq!(Quote::Double.ident("Orders\""), "\"Orders\"\"\"");
        assert_eq!(Quote::Bracket.ident("a]b"), "[a]]b]");
        assert_eq!(
            Quote::Double.qualified(Some("sales"), "orders"),
            "\"sales\".\"orders\""
        );
        assert_eq!(Quote::Bracket.qualified(None, "orders"), "[orders]");
    }

    fn resolve(name: &str, default_schema: &str) -> (String, String) {
        let (schema, table) = split_table_name(name, default_schema);
        (schema.into_owned(), table.to_string())
    }

    fn listed(schema: &str, table: &str) -> (String, String) {
        (schema.to_string(), table.to_string())
    }

    #[test]
    fn test_split_table_name() {
        assert_eq!(resolve("orders", "public"), listed("public", "orders"));
        assert_eq!(resolve("sales.orders", "public"), listed("sales", "orders"));
        assert_eq!(resolve(".orders", "dbo"), listed("dbo", ".orders"));
        assert_eq!(resolve("\"a.b\".c", "dbo"), listed("a.b", "c"));
        assert_eq!(display_table_name("dbo", "orders", "dbo"), "orders");
        assert_eq!(display_table_name("hr", "people", "dbo"), "hr.people");
    }

    #[test]
    fn test_dotted_names_round_trip() {
        let cases = [
            ("public", "sales.2024"),
            ("public", ".hidden"),
            ("public", "\"quoted"),
            ("billing", "invoices.v2"),
            ("a.b", "c"),
            ("we\"ird.schema", "t.x"),
            ("public", "orders"),
        ];
        for (schema, table) in cases {
            let name = display_table_name(schema, table, "public");
            assert_eq!(resolve(&name, "public"), listed(schema, table), "listed as {name}");
        }
        assert_eq!(display_table_name("public", "sales.2024", "public"), "public.sales.2024");
    }

    #[test]
    fn test_retain_user_databases() {
        let names = vec![
            "app".to_string(),
            "mysql".to_string(),
            "sys".to_string(),
            String::new(),
            "analytics".to_string(),
        ];
        assert_eq!(
            retain_user_databases(names, &["information_schema", "mysql", "sys"]),
            vec!["app".to_string(), "analytics".to_string()]
        );
    }

    #[test]
    fn test_render_create_table() {
        let columns = vec![
            ColumnDetail::new("id".to_string(), "integer".to_string())
                .with_nullable(false)
                .with_default(Some("nextval('orders_id_seq'::regclass)".to_string())),
            ColumnDetail::new("note".to_string(), "text".to_string()),
        ];
        let ddl = render_create_table(
            Quote::Double,
            "\"orders\"",
            &columns,
            &["CONSTRAINT \"orders_pkey\" PRIMARY KEY (id)".to_string()],
        );

        assert_eq!(
            ddl,
            "CREATE TABLE \"orders\" (\n  \"id\" integer NOT NULL DEFAULT nextval('orders_id_seq'::regclass),\n  \"note\" text,\n  CONSTRAINT \"orders_pkey\" PRIMARY KEY (id)\n);"
        );
    }

    #[test]
    fn test_connect_deadline_expires() {
        let result: Result<(), ConnectorError> = smol::block_on(with_connect_deadline(
            Duration::from_millis(10),
            futures::future::pending(),
        ));
        assert!(matches!(result, Err(ConnectorError::Connection(_))));
    }

    #[test]
    fn test_connect_deadline_passes_result_through() {
        let result = smol::block_on(with_connect_deadline(Duration::from_secs(1), async {
            Ok::<_, ConnectorError>(7)
        }));
        assert_eq!(result, Ok(7));
    }
}
