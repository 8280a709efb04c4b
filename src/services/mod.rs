pub mod cache;
pub mod database;
pub mod storage;

pub use cache::{SchemaCache, SchemaOrchestrator};
pub use database::drivers::ConnectorFactory;
pub use storage::ProfileStore;
