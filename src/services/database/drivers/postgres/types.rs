//! PostgreSQL type conversion utilities.
//!
//! This module handles conversion between PostgreSQL-specific types (from SQLx)
//! and the JSON row objects returned by `Connector::execute`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::postgres::{PgConnectOptions, PgRow, PgSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::services::database::traits::{RowObject, SslConfig};

/// Converter for PostgreSQL values to JSON.
pub struct PgValueConverter;

impl PgValueConverter {
    /// Convert a PostgreSQL row to a JSON object keyed by column name.
    pub fn convert_row(pg_row: &PgRow) -> RowObject {
        pg_row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = Self::extract_value(pg_row, idx, col.type_info().name());
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn extract_value(row: &PgRow, index: usize, type_name: &str) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        Self::decode_by_type(row, index, type_name)
    }

    /// Decode a value based on its PostgreSQL type name.
    fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Value {
        match type_name {
            "BOOL" => row
                .try_get::<bool, _>(index)
                .map(Value::Bool)
                .unwrap_or(Value::Null),

            "INT2" => Self::number(row.try_get::<i16, _>(index).map(i64::from)),
            "INT4" => Self::number(row.try_get::<i32, _>(index).map(i64::from)),
            "INT8" => Self::number(row.try_get::<i64, _>(index)),
            "OID" => Self::number(
                row.try_get::<sqlx::postgres::types::Oid, _>(index)
                    .map(|oid| i64::from(oid.0)),
            ),

            "FLOAT4" => Self::float(row.try_get::<f32, _>(index).map(f64::from)),
            "FLOAT8" => Self::float(row.try_get::<f64, _>(index)),

            // Exact text, as for MySQL decimals
            "NUMERIC" => row
                .try_get::<Decimal, _>(index)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),

            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => row
                .try_get::<String, _>(index)
                .map(Value::String)
                .unwrap_or(Value::Null),

            "BYTEA" => row
                .try_get::<Vec<u8>, _>(index)
                .map(|bytes| {
                    Value::Array(bytes.into_iter().map(|b| Value::Number(b.into())).collect())
                })
                .unwrap_or(Value::Null),

            "DATE" => Self::text(row.try_get::<NaiveDate, _>(index)),
            "TIME" => Self::text(row.try_get::<NaiveTime, _>(index)),
            "TIMESTAMP" => Self::text(row.try_get::<NaiveDateTime, _>(index)),
            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(|v| Value::String(v.to_rfc3339()))
                .unwrap_or(Value::Null),

            "UUID" => Self::text(row.try_get::<Uuid, _>(index)),

            "JSON" | "JSONB" => row
                .try_get::<serde_json::Value, _>(index)
                .unwrap_or(Value::Null),

            "INT4[]" => Self::array(row.try_get::<Vec<i32>, _>(index), Value::from),
            "INT8[]" => Self::array(row.try_get::<Vec<i64>, _>(index), Value::from),
            "TEXT[]" | "VARCHAR[]" | "NAME[]" => {
                Self::array(row.try_get::<Vec<String>, _>(index), Value::String)
            }
            "BOOL[]" => Self::array(row.try_get::<Vec<bool>, _>(index), Value::Bool),
            "FLOAT8[]" => Self::array(row.try_get::<Vec<f64>, _>(index), |v| {
                Self::float(Ok(v))
            }),

            _ => Self::decode_fallback(row, index, type_name),
        }
    }

    /// Fallback for types without a dedicated mapping (enums, domains, ...).
    fn decode_fallback(row: &PgRow, index: usize, type_name: &str) -> Value {
        if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Value::String(s);
        }

        tracing::debug!("No JSON mapping for PostgreSQL type {}", type_name);
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

    fn array<T>(value: Result<Vec<T>, sqlx::Error>, map: impl Fn(T) -> Value) -> Value {
        value
            .map(|items| Value::Array(items.into_iter().map(map).collect()))
            .unwrap_or(Value::Null)
    }

    /// Apply the profile's TLS material.
    ///
    /// A CA switches to `verify-ca`; client material alone requires TLS without
    /// verification. Without TLS settings it is preferred.
    pub fn apply_ssl(options: PgConnectOptions, ssl: Option<&SslConfig>) -> PgConnectOptions {
        let Some(ssl) = ssl else {
            return options.ssl_mode(PgSslMode::Prefer);
        };

        let mut options = match ssl.ca.as_deref().filter(|ca| !ca.is_empty()) {
            Some(ca) => options
                .ssl_mode(PgSslMode::VerifyCa)
                .ssl_root_cert_from_pem(ca.as_bytes().to_vec()),
            None => options.ssl_mode(PgSslMode::Require),
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
    fn test_ssl_mode_selection() {
        let options = PgValueConverter::apply_ssl(PgConnectOptions::new(), None);
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Prefer));

        let options =
            PgValueConverter::apply_ssl(PgConnectOptions::new(), Some(&SslConfig::default()));
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));

        let ssl = SslConfig {
            ca: Some("-----BEGIN CERTIFICATE-----".to_string()),
            ..SslConfig::default()
        };
        let options = PgValueConverter::apply_ssl(PgConnectOptions::new(), Some(&ssl));
        assert!(matches!(options.get_ssl_mode(), PgSslMode::VerifyCa));
    }

    #[test]
    fn test_array_mapping() {
        assert_eq!(
            PgValueConverter::array(Ok(vec![1_i32, 2]), Value::from),
            serde_json::json!([1, 2])
        );
        assert_eq!(
            PgValueConverter::array::<i32>(Err(sqlx::Error::RowNotFound), Value::from),
            Value::Null
        );
    }
}
