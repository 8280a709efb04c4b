//! SQL Server driver.
//!
//! Implements `Connector` over tiberius. Tables outside `dbo` are listed as
//! `schema.table`; structures are rendered from `INFORMATION_SCHEMA` and cover
//! columns, defaults, primary keys and unique constraints.

mod connection;
mod schema;
mod types;

pub use connection::MssqlConnector;
pub use schema::{DEFAULT_SCHEMA, SYSTEM_DATABASES};
pub use types::MssqlValueConverter;
