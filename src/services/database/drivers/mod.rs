//! Engine drivers.
//!
//! - **MySQL**: SQLx, `SHOW CREATE TABLE` for structures
//! - **PostgreSQL**: SQLx, structures rendered from `pg_catalog`
//! - **MSSQL**: tiberius, structures rendered from `INFORMATION_SCHEMA`
//!
//! Each driver implements the `Connector` trait and opens one native
//! connection per call.

pub mod ddl;
mod factory;
pub mod mssql;
pub mod mysql;
pub mod postgres;

pub use factory::ConnectorFactory;
