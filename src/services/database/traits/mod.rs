//! Connector abstraction traits and types.
//!
//! This module provides the engine-agnostic surface every driver implements.
//! It defines:
//!
//! - **Types** (`types`): Engine enum, connection profiles, TLS material
//! - **Connector** (`connector`): Core connector trait and structure callbacks
//! - **Schema** (`schema`): Execution results, tables, databases, column metadata
//! - **Error** (`error`): The connector error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use dbscope::services::database::traits::{ConnectionProfile, EngineType};
//!
//! let profile = ConnectionProfile::new(
//!     "Local MySQL".to_string(),
//!     EngineType::MySQL,
//!     "localhost".to_string(),
//!     3306,
//!     "root".to_string(),
//!     "password".to_string(),
//! );
//! ```

pub mod connector;
pub mod error;
pub mod schema;
pub mod types;

pub use connector::{BoxedConnector, Connector, ConnectorResult, StructureCallback};

pub use error::ConnectorError;

pub use schema::{ColumnDetail, Database, ExecutionResult, RowObject, Table, TableStructure};

pub use types::{ConnectionProfile, EngineType, ProfilePatch, SslConfig};
