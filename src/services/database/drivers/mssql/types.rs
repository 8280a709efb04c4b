//! MSSQL type conversion utilities.
//!
//! Converts tiberius `ColumnData` into the JSON row objects returned by
//! `Connector::execute`, and renders catalog column types back into T-SQL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use tiberius::{ColumnData, FromSql, Row};

use crate::services::database::traits::RowObject;

/// Converter for MSSQL values to JSON.
pub struct MssqlValueConverter;

impl MssqlValueConverter {
    /// Convert a tiberius row to a JSON object keyed by column name.
    pub fn convert_row(row: &Row) -> RowObject {
        row.cells()
            .map(|(column, data)| (column.name().to_string(), Self::convert_value(data)))
            .collect()
    }

    /// Convert a single cell. NULLs of every type map to `Value::Null`.
    pub fn convert_value(data: &ColumnData<'static>) -> Value {
        let value = match data {
            ColumnData::U8(v) => v.map(Value::from),
            ColumnData::I16(v) => v.map(Value::from),
            ColumnData::I32(v) => v.map(Value::from),
            ColumnData::I64(v) => v.map(Value::from),
            ColumnData::F32(v) => v.and_then(|f| Number::from_f64(f64::from(f)).map(Value::Number)),
            ColumnData::F64(v) => v.and_then(|f| Number::from_f64(f).map(Value::Number)),
            ColumnData::Bit(v) => v.map(Value::Bool),
            ColumnData::String(v) => v.as_deref().map(|s| Value::String(s.to_string())),
            ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
            ColumnData::Binary(v) => v
                .as_deref()
                .map(|bytes| Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())),
            ColumnData::Xml(v) => v
                .as_deref()
                .map(|xml| Value::String(xml.clone().into_string())),
            ColumnData::Numeric(_) => Self::decoded::<Decimal>(data),
            ColumnData::Date(_) => Self::decoded::<NaiveDate>(data),
            ColumnData::Time(_) => Self::decoded::<NaiveTime>(data),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                Self::decoded::<NaiveDateTime>(data)
            }
            ColumnData::DateTimeOffset(_) => Self::decoded::<DateTime<Utc>>(data),
            #[allow(unreachable_patterns)]
            _ => None,
        };

        value.unwrap_or(Value::Null)
    }

    /// Decode through tiberius' `FromSql` and render as text.
    fn decoded<'a, T>(data: &'a ColumnData<'static>) -> Option<Value>
    where
        T: FromSql<'a> + ToString,
    {
        match T::from_sql(data) {
            Ok(value) => value.map(|v| Value::String(v.to_string())),
            Err(e) => {
                tracing::debug!("Failed to decode MSSQL value: {}", e);
                None
            }
        }
    }

    /// Render a column type the way `CREATE TABLE` spells it.
    ///
    /// `max_length` of `-1` means `(max)`.
    pub fn render_type(
        data_type: &str,
        max_length: Option<i32>,
        precision: Option<i32>,
        scale: Option<i32>,
    ) -> String {
        let lower = data_type.to_lowercase();
        match lower.as_str() {
            "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" => match max_length
            {
                Some(-1) => format!("{}(max)", lower),
                Some(len) => format!("{}({})", lower, len),
                None => lower,
            },
            "decimal" | "numeric" => match (precision, scale) {
                (Some(p), Some(s)) => format!("{}({},{})", lower, p, s),
                (Some(p), None) => format!("{}({})", lower, p),
                _ => lower,
            },
            _ => lower,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_convert_scalars() {
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::I32(Some(42))),
            serde_json::json!(42)
        );
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::Bit(Some(true))),
            Value::Bool(true)
        );
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::String(Some(Cow::Borrowed("abc")))),
            Value::String("abc".to_string())
        );
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::F64(Some(0.5))),
            serde_json::json!(0.5)
        );
    }

    #[test]
    fn test_convert_nulls() {
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::I64(None)),
            Value::Null
        );
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::String(None)),
            Value::Null
        );
        assert_eq!(
            MssqlValueConverter::convert_value(&ColumnData::F64(Some(f64::NAN))),
            Value::Null
        );
    }

    #[test]
    fn test_render_type() {
        assert_eq!(
            MssqlValueConverter::render_type("nvarchar", Some(50), None, None),
            "nvarchar(50)"
        );
        assert_eq!(
            MssqlValueConverter::render_type("VARBINARY", Some(-1), None, None),
            "varbinary(max)"
        );
        assert_eq!(
            MssqlValueConverter::render_type("decimal", None, Some(10), Some(2)),
            "decimal(10,2)"
        );
        assert_eq!(
            MssqlValueConverter::render_type("int", None, Some(10), Some(0)),
            "int"
        );
    }
}
