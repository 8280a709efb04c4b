//! Engine type definitions and connection profiles.
//!
//! This module contains:
//! - `EngineType` - Enum of supported database engines
//! - `ConnectionProfile` - Credentials and host info for one server
//! - `SslConfig` - PEM material for TLS connections
//! - `ProfilePatch` - Partial update applied to a stored profile

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported database engines.
///
/// Engine tags coming from stored profiles are matched case-insensitively.
/// Tags that don't name a known engine are kept as `Unknown` so the factory
/// can reject them with a proper error instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineType {
    MySQL,
    PostgreSQL,
    MSSQL,
    Unknown(String),
}

impl EngineType {
    /// Get the display name for this engine
    pub fn display_name(&self) -> &str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::MSSQL => "MSSQL",
            Self::Unknown(tag) => tag,
        }
    }

    /// Get the default server port
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySQL => Some(3306),
            Self::PostgreSQL => Some(5432),
            Self::MSSQL => Some(1433),
            Self::Unknown(_) => None,
        }
    }

    /// Get all known engines
    pub fn all() -> Vec<EngineType> {
        vec![Self::MySQL, Self::PostgreSQL, Self::MSSQL]
    }

    /// Parse from a string representation
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "mysql" | "mariadb" => Self::MySQL,
            "postgresql" | "postgres" | "pg" => Self::PostgreSQL,
            "mssql" | "sqlserver" | "sql server" => Self::MSSQL,
            _ => Self::Unknown(tag.to_string()),
        }
    }

    /// Check if this engine has a driver
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for EngineType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<EngineType> for String {
    fn from(engine: EngineType) -> Self {
        engine.display_name().to_string()
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// PEM encoded TLS material. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A named set of credentials identifying one database server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Stable identity, assigned once on creation
    pub id: String,
    /// User-facing name
    pub title: String,
    pub engine_type: EngineType,
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Default database to connect to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslConfig>,
}

impl ConnectionProfile {
    /// Create a profile with a fresh identity.
    pub fn new(
        title: String,
        engine_type: EngineType,
        host: String,
        port: u16,
        username: String,
        password: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            engine_type,
            host,
            port,
            username,
            password,
            database: None,
            ssl: None,
        }
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the TLS material
    pub fn with_ssl(mut self, ssl: SslConfig) -> Self {
        self.ssl = Some(ssl);
        self
    }

    /// Human-readable "user@host:port/database" string.
    pub fn display_name(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username,
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("")
        )
    }
}

/// Partial update for a stored profile. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub title: Option<String>,
    pub engine_type: Option<EngineType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<Option<String>>,
    pub ssl: Option<Option<SslConfig>>,
}

impl ProfilePatch {
    /// Apply the set fields onto `profile`. The id is never touched.
    pub fn apply_to(&self, profile: &mut ConnectionProfile) {
        if let Some(title) = &self.title {
            profile.title = title.clone();
        }
        if let Some(engine_type) = &self.engine_type {
            profile.engine_type = engine_type.clone();
        }
        if let Some(host) = &self.host {
            profile.host = host.clone();
        }
        if let Some(port) = self.port {
            profile.port = port;
        }
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(password) = &self.password {
            profile.password = password.clone();
        }
        if let Some(database) = &self.database {
            profile.database = database.clone();
        }
        if let Some(ssl) = &self.ssl {
            profile.ssl = ssl.clone();
        }
    }
}

/// Ports arrive either as numbers or as decimal strings ("3306").
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(port) => Ok(port),
        PortRepr::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{}': {}", text, e))),
    }
}
