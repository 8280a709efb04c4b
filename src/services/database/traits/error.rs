//! Connector error taxonomy.

use thiserror::Error;

/// Errors surfaced by every `Connector` implementation.
///
/// The native diagnostic text is kept verbatim so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The server could not be reached or rejected the credentials
    #[error("connection failed: {0}")]
    Connection(String),

    /// The statement was rejected by the server
    #[error("{0}")]
    Execution(String),

    /// A table did not resolve to exactly one metadata row
    #[error("unexpected number of rows for table `{table}`: expected 1, got {rows}")]
    Structure { table: String, rows: usize },

    /// The profile names an engine without a driver
    #[error("unsupported engine type: {0}")]
    UnsupportedEngine(String),
}

impl ConnectorError {
    pub fn structure(table: impl Into<String>, rows: usize) -> Self {
        Self::Structure {
            table: table.into(),
            rows,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Native message of a sqlx error: the server's own text for database errors,
/// the client's description otherwise.
pub(crate) fn sqlx_message(err: &sqlx::Error) -> String {
    match err.as_database_error() {
        Some(db_err) => db_err.message().to_string(),
        None => err.to_string(),
    }
}

/// Native message of a tiberius error.
pub(crate) fn tiberius_message(err: &tiberius::error::Error) -> String {
    match err {
        tiberius::error::Error::Server(token) => token.message().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_error_display() {
        let err = ConnectorError::structure("orders", 0);
        assert_eq!(
            err.to_string(),
            "unexpected number of rows for table `orders`: expected 1, got 0"
        );
    }

    #[test]
    fn test_execution_error_keeps_native_text() {
        let err = ConnectorError::Execution("You have an error in your SQL syntax".to_string());
        assert_eq!(err.to_string(), "You have an error in your SQL syntax");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_sqlx_message_for_client_error() {
        let err = sqlx::Error::RowNotFound;
        assert_eq!(sqlx_message(&err), err.to_string());
    }
}
