//! Database access: the connector contract and one driver per engine.

pub mod drivers;
pub mod traits;

pub use drivers::ConnectorFactory;
pub use traits::{
    BoxedConnector, ConnectionProfile, Connector, ConnectorError, ConnectorResult, Database,
    EngineType, ExecutionResult, Table,
};
