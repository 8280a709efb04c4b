//! Normalized result and metadata shapes shared by every engine.

use serde::{Deserialize, Serialize};

/// One result row: column name to JSON value, in column order.
pub type RowObject = serde_json::Map<String, serde_json::Value>;

/// Outcome of `Connector::execute`.
///
/// Row-returning statements fill `raw_result` and leave `affected_rows` at 0.
/// Mutations report `affected_rows` and leave `raw_result` empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub raw_result: Vec<RowObject>,
    pub affected_rows: u64,
}

impl ExecutionResult {
    /// Result of a row-returning statement
    pub fn rows(raw_result: Vec<RowObject>) -> Self {
        Self {
            raw_result,
            affected_rows: 0,
        }
    }

    /// Result of a mutation
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            raw_result: Vec::new(),
            affected_rows,
        }
    }

    /// Build from whatever a statement produced. Rows win over counts.
    pub fn from_parts(raw_result: Vec<RowObject>, affected_rows: u64) -> Self {
        if raw_result.is_empty() {
            Self::affected(affected_rows)
        } else {
            Self::rows(raw_result)
        }
    }
}

/// A table and, once fetched, its DDL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub structure: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structure: String::new(),
        }
    }

    pub fn with_structure(mut self, structure: impl Into<String>) -> Self {
        self.structure = structure.into();
        self
    }
}

/// A `(table name, DDL)` pair yielded by structure streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStructure {
    pub name: String,
    pub structure: String,
}

impl From<TableStructure> for Table {
    fn from(value: TableStructure) -> Self {
        Table {
            name: value.name,
            structure: value.structure,
        }
    }
}

/// A database discovered under one connection profile.
///
/// An empty `table_list` means the tables have not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub connection_id: String,
    pub name: String,
    #[serde(default)]
    pub table_list: Vec<Table>,
}

impl Database {
    pub fn new(connection_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            name: name.into(),
            table_list: Vec::new(),
        }
    }

    /// Cache key
    pub fn key(&self) -> (&str, &str) {
        (&self.connection_id, &self.name)
    }

    pub fn matches(&self, connection_id: &str, name: &str) -> bool {
        self.connection_id == connection_id && self.name == name
    }

    pub fn is_fetched(&self) -> bool {
        !self.table_list.is_empty()
    }
}

/// Column metadata used to render `CREATE TABLE` statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDetail {
    pub column_name: String,
    /// Full SQL type, including length/precision
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
}

impl ColumnDetail {
    pub fn new(column_name: String, data_type: String) -> Self {
        Self {
            column_name,
            data_type,
            is_nullable: true,
            column_default: None,
        }
    }

    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.column_default = default.filter(|d| !d.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_result_rows_win() {
        let mut row = RowObject::new();
        row.insert("x".to_string(), json!(1));

        let result = ExecutionResult::from_parts(vec![row], 1);
        assert_eq!(result.affected_rows, 0);
        assert_eq!(result.raw_result.len(), 1);

        let result = ExecutionResult::from_parts(vec![], 3);
        assert_eq!(result.affected_rows, 3);
        assert!(result.raw_result.is_empty());
    }

    #[test]
    fn test_execution_result_serialization() {
        let mut row = RowObject::new();
        row.insert("x".to_string(), json!(1));
        let value = serde_json::to_value(ExecutionResult::rows(vec![row])).unwrap();
        assert_eq!(value, json!({"rawResult": [{"x": 1}], "affectedRows": 0}));
    }

    #[test]
    fn test_database_fetched_flag() {
        let mut db = Database::new("conn", "app");
        assert!(!db.is_fetched());
        db.table_list.push(Table::new("users"));
        assert!(db.is_fetched());
        assert!(db.matches("conn", "app"));
        assert!(!db.matches("other", "app"));
    }
}
