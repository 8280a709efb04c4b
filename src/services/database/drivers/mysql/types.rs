//! MySQL type conversion utilities.
//!
//! This module handles conversion between MySQL-specific types (from SQLx)
//! and the JSON row objects returned by `Connector::execute`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::services::database::traits::{ConnectorError, ConnectorResult, RowObject, SslConfig};

/// Converter for MySQL values to JSON.
pub struct MySqlValueConverter;

impl MySqlValueConverter {
    /// Convert a MySQL row to a JSON object keyed by column name.
    pub fn convert_row(mysql_row: &MySqlRow) -> RowObject {
        mysql_row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = Self::extract_value(mysql_row, idx, col.type_info().name());
                (col.name().to_string(), value)
            })
            .collect()
    }

    /// Extract a value from a MySQL row at the given column index.
    fn extract_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        Self::decode_by_type(row, index, type_name)
    }

    /// Decode a value based on its MySQL type name.
    fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        match type_name {
            // MySQL uses TINYINT(1) for booleans
            "BOOLEAN" | "BOOL" => row
                .try_get::<bool, _>(index)
                .map(Value::Bool)
                .unwrap_or(Value::Null),

            "TINYINT" => Self::number(row.try_get::<i8, _>(index).map(i64::from)),
            "TINYINT UNSIGNED" => Self::number(row.try_get::<u8, _>(index).map(i64::from)),
            "SMALLINT" => Self::number(row.try_get::<i16, _>(index).map(i64::from)),
            "SMALLINT UNSIGNED" => Self::number(row.try_get::<u16, _>(index).map(i64::from)),
            "MEDIUMINT" | "INT" | "INTEGER" => {
                Self::number(row.try_get::<i32, _>(index).map(i64::from))
            }
            "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => {
                Self::number(row.try_get::<u32, _>(index).map(i64::from))
            }
            "BIGINT" => Self::number(row.try_get::<i64, _>(index)),
            "BIGINT UNSIGNED" => row
                .try_get::<u64, _>(index)
                .map(|v| Value::Number(Number::from(v)))
                .unwrap_or(Value::Null),

            "FLOAT" => Self::float(row.try_get::<f32, _>(index).map(f64::from)),
            "DOUBLE" | "DOUBLE PRECISION" | "REAL" => Self::float(row.try_get::<f64, _>(index)),

            // Decimals keep their exact text
            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => row
                .try_get::<Decimal, _>(index)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),

            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => row
                .try_get::<String, _>(index)
                .map(Value::String)
                .unwrap_or(Value::Null),

            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
                row.try_get::<Vec<u8>, _>(index)
                    .map(Self::bytes)
                    .unwrap_or(Value::Null)
            }

            "DATE" => Self::text(row.try_get::<NaiveDate, _>(index)),
            "TIME" => Self::text(row.try_get::<NaiveTime, _>(index)),
            "DATETIME" => row
                .try_get::<NaiveDateTime, _>(index)
                .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
                .unwrap_or(Value::Null),
            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(|v| Value::String(v.to_rfc3339()))
                .or_else(|_| {
                    row.try_get::<NaiveDateTime, _>(index)
                        .map(|v| Value::String(v.to_string()))
                })
                .unwrap_or(Value::Null),

            "YEAR" => Self::number(
                row.try_get::<u16, _>(index)
                    .map(i64::from)
                    .or_else(|_| row.try_get::<i16, _>(index).map(i64::from)),
            ),

            "JSON" => row
                .try_get::<serde_json::Value, _>(index)
                .unwrap_or(Value::Null),

            _ if type_name.starts_with("ENUM") || type_name.starts_with("SET") => row
                .try_get::<String, _>(index)
                .map(Value::String)
                .unwrap_or(Value::Null),

            _ => Self::decode_fallback(row, index, type_name),
        }
    }

    /// Fallback for types without a dedicated mapping.
    fn decode_fallback(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        if let Ok(s) = row.try_get::<String, _>(index) {
            return Value::String(s);
        }
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return Value::Number(Number::from(v));
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return Self::float(Ok(v));
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return Self::bytes(v);
        }

        tracing::debug!("No JSON mapping for MySQL type {}", type_name);
        Value::Null
    }

    fn number(value: Result<i64, sqlx::Error>) -> Value {
        value
            .map(|v| Value::Number(Number::from(v)))
            .unwrap_or(Value::Null)
    }

    fn float(value: Result<f64, sqlx::Error>) -> Value {
        value
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }

    fn text<T: ToString>(value: Result<T, sqlx::Error>) -> Value {
        value
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null)
    }

    /// UTF-8 payloads become strings, anything else a byte array.
    fn bytes(bytes: Vec<u8>) -> Value {
        match String::from_utf8(bytes) {
            Ok(text) => Value::String(text),
            Err(e) => Value::Array(
                e.into_bytes()
                    .into_iter()
                    .map(|b| Value::Number(Number::from(b)))
                    .collect(),
            ),
        }
    }

    /// Read a text column that some server versions report as binary.
    pub fn text_column(row: &MySqlRow, index: usize) -> ConnectorResult<String> {
        match row.try_get::<String, _>(index) {
            Ok(text) => Ok(text),
            Err(_) => row
                .try_get::<Vec<u8>, _>(index)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| ConnectorError::Execution(e.to_string())),
        }
    }

    /// Apply the profile's TLS material.
    ///
    /// With a CA the server certificate is verified; with only client material
    /// TLS is required but unverified. Without TLS settings it is preferred.
    pub fn apply_ssl(options: MySqlConnectOptions, ssl: Option<&SslConfig>) -> MySqlConnectOptions {
        let Some(ssl) = ssl else {
            return options.ssl_mode(MySqlSslMode::Preferred);
        };

        let mut options = match ssl.ca.as_deref().filter(|ca| !ca.is_empty()) {
            Some(ca) => options
                .ssl_mode(MySqlSslMode::VerifyCa)
                .ssl_ca_from_pem(ca.as_bytes().to_vec()),
            None => options.ssl_mode(MySqlSslMode::Required),
        };
        if let Some(cert) = ssl.cert.as_deref().filter(|c| !c.is_empty()) {
            options = options.ssl_client_cert_from_pem(cert.as_bytes());
        }
        if let Some(key) = ssl.key.as_deref().filter(|k| !k.is_empty()) {
            options = options.ssl_client_key_from_pem(key.as_bytes());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_prefers_text() {
        assert_eq!(
            MySqlValueConverter::bytes(b"hello".to_vec()),
            Value::String("hello".to_string())
        );
        assert_eq!(
            MySqlValueConverter::bytes(vec![0xff, 0x01]),
            serde_json::json!([255, 1])
        );
    }

    #[test]
    fn test_float_rejects_nan() {
        assert_eq!(MySqlValueConverter::float(Ok(f64::NAN)), Value::Null);
        assert_eq!(MySqlValueConverter::float(Ok(1.5)), serde_json::json!(1.5));
    }

    #[test]
    fn test_number_mapping() {
        assert_eq!(MySqlValueConverter::number(Ok(1)), serde_json::json!(1));
        assert_eq!(
            MySqlValueConverter::number(Err(sqlx::Error::RowNotFound)),
            Value::Null
        );
    }
}
