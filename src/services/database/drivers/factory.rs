//! Connector factory.
//!
//! Picks the driver matching a profile's engine type and hands it back behind
//! the `Connector` trait.

use super::mssql::MssqlConnector;
use super::mysql::MySqlConnector;
use super::postgres::PostgresConnector;
use crate::config::ConnectorSettings;
use crate::services::database::traits::{
    BoxedConnector, ConnectionProfile, ConnectorError, ConnectorResult, EngineType,
};

/// Factory for creating connectors based on a profile's engine type.
///
/// # Example
///
/// ```ignore
/// use dbscope::services::database::drivers::ConnectorFactory;
/// use dbscope::services::database::traits::{ConnectionProfile, EngineType};
///
/// let profile = ConnectionProfile::new(
///     "My DB".to_string(),
///     EngineType::PostgreSQL,
///     "localhost".to_string(),
///     5432,
///     "user".to_string(),
///     "pass".to_string(),
/// );
///
/// let connector = ConnectorFactory::create(profile)?;
/// ```
pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Create a connector with default settings.
    ///
    /// Nothing is opened here; the first operation on the connector connects.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedEngine` for an unknown engine tag.
    pub fn create(profile: ConnectionProfile) -> ConnectorResult<BoxedConnector> {
        Self::create_with_settings(profile, &ConnectorSettings::default())
    }

    /// Create a connector sharing the given settings.
    pub fn create_with_settings(
        profile: ConnectionProfile,
        settings: &ConnectorSettings,
    ) -> ConnectorResult<BoxedConnector> {
        let settings = settings.clone();
        match &profile.engine_type {
            EngineType::MySQL => Ok(MySqlConnector::boxed(profile, settings)),
            EngineType::PostgreSQL => Ok(PostgresConnector::boxed(profile, settings)),
            EngineType::MSSQL => Ok(MssqlConnector::boxed(profile, settings)),
            EngineType::Unknown(tag) => {
                tracing::warn!("Rejecting profile {} with engine {:?}", profile.id, tag);
                Err(ConnectorError::UnsupportedEngine(tag.clone()))
            }
        }
    }

    /// Check if an engine type has a driver.
    pub fn is_supported(engine_type: &EngineType) -> bool {
        engine_type.is_known()
    }

    /// Get a list of all supported engine types.
    pub fn supported_types() -> Vec<EngineType> {
        EngineType::all()
            .into_iter()
            .filter(|t| Self::is_supported(t))
            .collect()
    }
}
