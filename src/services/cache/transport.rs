//! Request/response shapes exchanged with the schema backend.

use serde::{Deserialize, Serialize};

use crate::services::database::traits::ConnectionProfile;

/// A schema discovery request: the profile, plus the database for table fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub connection: ConnectionProfile,
    #[serde(default, alias = "db", skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl SchemaRequest {
    pub fn for_connection(connection: ConnectionProfile) -> Self {
        Self {
            connection,
            database: None,
        }
    }

    pub fn for_database(connection: ConnectionProfile, database: impl Into<String>) -> Self {
        Self {
            connection,
            database: Some(database.into()),
        }
    }
}

/// Response envelope. A present `message` means the call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.message.is_none()
    }

    /// Split into the payload or the error text.
    pub fn into_result(self) -> Result<T, String> {
        match self.message {
            None => Ok(self.data),
            Some(message) => Err(message),
        }
    }
}

impl<T: Default> ApiResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            message: Some(message.into()),
        }
    }
}
