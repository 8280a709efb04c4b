//! PostgreSQL driver.
//!
//! Implements `Connector` over SQLx. Tables outside `public` are listed as
//! `schema.table` and structures are rendered from the system catalogs.

mod connection;
mod schema;
mod types;

pub use connection::PostgresConnector;
pub use schema::{DEFAULT_SCHEMA, TEMPLATE_DATABASES};
pub use types::PgValueConverter;
