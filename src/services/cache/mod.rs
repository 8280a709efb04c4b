//! Schema cache and batch orchestration.
//!
//! `SchemaOrchestrator` answers database and table listings from a shared
//! `SchemaCache`, going to a `SchemaBackend` on a miss and merging the answer
//! back without dropping what other fetches already stored.

mod backend;
mod orchestrator;
mod schema_cache;
mod transport;

pub use backend::{tables_with_structure, ConnectorBackend, SchemaBackend};
pub use orchestrator::{ConnectionContext, OrchestratorError, SchemaOrchestrator};
pub use schema_cache::{merge_databases, SchemaCache};
pub use transport::{ApiResponse, SchemaRequest};
