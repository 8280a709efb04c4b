//! Cache-or-fetch orchestration for schema discovery.

use async_lock::RwLock;
use std::sync::Arc;
use thiserror::Error;

use super::backend::SchemaBackend;
use super::schema_cache::SchemaCache;
use super::transport::SchemaRequest;
use crate::services::database::traits::{ConnectionProfile, ConnectorError, Database, Table};
use crate::services::storage::ProfileStore;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// The backend answered with an error message
    #[error("{0}")]
    Remote(String),
}

/// The caller's current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub connection: ConnectionProfile,
    pub database: Option<Database>,
}

impl ConnectionContext {
    pub fn new(connection: ConnectionProfile) -> Self {
        Self {
            connection,
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}

/// Decides between cache hits and backend fetches, and merges what comes back.
///
/// The cache lock is only taken to read a snapshot or to write a merge, never
/// while a backend call is in flight. Racing fetches therefore each run, and
/// the merge rule keeps the cache consistent.
pub struct SchemaOrchestrator<B: SchemaBackend> {
    cache: Arc<SchemaCache>,
    store: ProfileStore,
    backend: B,
    current: RwLock<Option<ConnectionContext>>,
}

impl<B: SchemaBackend> SchemaOrchestrator<B> {
    pub fn new(cache: Arc<SchemaCache>, store: ProfileStore, backend: B) -> Self {
        Self {
            cache,
            store,
            backend,
            current: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Databases of `profile`, from the cache when it has any for the profile.
    ///
    /// With `skip_cache`, or on a miss, the backend is asked once and the result
    /// is merged into the cache. The returned list is the cache's view of the
    /// profile after the merge.
    pub async fn get_or_fetch_database_list(
        &self,
        profile: &ConnectionProfile,
        skip_cache: bool,
    ) -> Result<Vec<Database>, OrchestratorError> {
        if !skip_cache {
            let cached = self.cache.databases_for(&profile.id).await;
            if !cached.is_empty() {
                tracing::debug!("Database list cache hit for {}", profile.id);
                return Ok(cached);
            }
        }

        let names = self
            .backend
            .fetch_databases(SchemaRequest::for_connection(profile.clone()))
            .await?
            .into_result()
            .map_err(OrchestratorError::Remote)?;

        tracing::info!("Fetched {} databases for {}", names.len(), profile.title);
        let fetched = names
            .into_iter()
            .map(|name| Database::new(profile.id.clone(), name))
            .collect();
        self.cache.merge_databases(fetched).await;

        Ok(self.cache.databases_for(&profile.id).await)
    }

    /// Tables of `database`, from the cache when they were already fetched.
    ///
    /// When the owning profile no longer exists the result is empty and the
    /// backend is not called.
    pub async fn get_or_fetch_database_schema(
        &self,
        database: &Database,
        skip_cache: bool,
    ) -> Result<Vec<Table>, OrchestratorError> {
        if !skip_cache {
            if let Some(cached) = self
                .cache
                .find(&database.connection_id, &database.name)
                .await
                .filter(Database::is_fetched)
            {
                tracing::debug!("Schema cache hit for {}/{}", cached.connection_id, cached.name);
                return Ok(cached.table_list);
            }
        }

        let Some(connection) = self.store.get_connection_by_id(&database.connection_id).await
        else {
            tracing::debug!("Connection {} no longer exists", database.connection_id);
            return Ok(Vec::new());
        };

        let tables = self
            .backend
            .fetch_schema(SchemaRequest::for_database(connection, database.name.clone()))
            .await?
            .into_result()
            .map_err(OrchestratorError::Remote)?;

        tracing::info!("Fetched {} tables for {}", tables.len(), database.name);
        self.cache
            .set_table_list(&database.connection_id, &database.name, tables.clone())
            .await;

        Ok(tables)
    }

    /// Evict a profile's cached databases. Profile removal does not do this by
    /// itself.
    pub async fn forget_connection(&self, connection_id: &str) -> usize {
        self.cache.forget_connection(connection_id).await
    }

    pub async fn set_current_context(&self, context: Option<ConnectionContext>) {
        *self.current.write().await = context;
    }

    pub async fn current_context(&self) -> Option<ConnectionContext> {
        self.current.read().await.clone()
    }
}
