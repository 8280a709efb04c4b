//! MySQL driver.
//!
//! Implements `Connector` over SQLx. Table structures come from
//! `SHOW CREATE TABLE`.
//!
//! # Example
//!
//! ```ignore
//! use dbscope::config::ConnectorSettings;
//! use dbscope::services::database::drivers::mysql::MySqlConnector;
//! use dbscope::services::database::traits::{ConnectionProfile, Connector, EngineType};
//!
//! let profile = ConnectionProfile::new(
//!     "Local MySQL".to_string(),
//!     EngineType::MySQL,
//!     "localhost".to_string(),
//!     3306,
//!     "user".to_string(),
//!     "password".to_string(),
//! );
//!
//! let connector = MySqlConnector::new(profile, ConnectorSettings::default());
//! let databases = connector.get_databases().await?;
//! ```

mod connection;
mod schema;
mod types;

pub use connection::MySqlConnector;
pub use schema::SYSTEM_DATABASES;
pub use types::MySqlValueConverter;
