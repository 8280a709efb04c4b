//! Client-side cache of discovered databases and their tables.

use async_lock::RwLock;

use crate::services::database::traits::{Database, Table};

/// Databases keyed by `(connection_id, name)`.
///
/// Writes merge into the current contents; nothing fetched for one profile
/// can drop another profile's entries.
#[derive(Debug, Default)]
pub struct SchemaCache {
    databases: RwLock<Vec<Database>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached databases of one profile, in cache order.
    pub async fn databases_for(&self, connection_id: &str) -> Vec<Database> {
        self.databases
            .read()
            .await
            .iter()
            .filter(|db| db.connection_id == connection_id)
            .cloned()
            .collect()
    }

    pub async fn find(&self, connection_id: &str, name: &str) -> Option<Database> {
        self.databases
            .read()
            .await
            .iter()
            .find(|db| db.matches(connection_id, name))
            .cloned()
    }

    /// Merge freshly listed databases in.
    pub async fn merge_databases(&self, fetched: Vec<Database>) {
        let mut databases = self.databases.write().await;
        let existing = std::mem::take(&mut *databases);
        *databases = merge_databases(fetched, existing);
    }

    /// Replace the table list of one entry. Returns `false` when the entry is
    /// not cached, in which case nothing is stored.
    pub async fn set_table_list(&self, connection_id: &str, name: &str, tables: Vec<Table>) -> bool {
        let mut databases = self.databases.write().await;
        match databases.iter_mut().find(|db| db.matches(connection_id, name)) {
            Some(database) => {
                database.table_list = tables;
                true
            }
            None => false,
        }
    }

    /// Drop every entry of one profile; returns how many were dropped.
    pub async fn forget_connection(&self, connection_id: &str) -> usize {
        let mut databases = self.databases.write().await;
        let before = databases.len();
        databases.retain(|db| db.connection_id != connection_id);
        before - databases.len()
    }

    pub async fn snapshot(&self) -> Vec<Database> {
        self.databases.read().await.clone()
    }
}

/// Union of `fetched` and `existing`, unique by key, fetched entries first.
///
/// On a key collision the existing entry wins when its tables were already
/// fetched, so a re-list never wipes a populated table list.
pub fn merge_databases(fetched: Vec<Database>, existing: Vec<Database>) -> Vec<Database> {
    let mut existing: Vec<Option<Database>> = existing.into_iter().map(Some).collect();
    let mut merged: Vec<Database> = Vec::with_capacity(fetched.len() + existing.len());

    for database in fetched {
        if merged.iter().any(|db| db.key() == database.key()) {
            continue;
        }
        let richer = existing.iter_mut().find_map(|slot| {
            slot.take_if(|db| db.key() == database.key() && db.is_fetched())
        });
        merged.push(richer.unwrap_or(database));
    }

    for database in existing.into_iter().flatten() {
        if !merged.iter().any(|db| db.key() == database.key()) {
            merged.push(database);
        }
    }

    merged
}
