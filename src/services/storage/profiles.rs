//! In-memory connection profile store with JSON snapshots.

use anyhow::{Context, Result};
use async_lock::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::samples::sample_profiles;
use crate::services::database::traits::{ConnectionProfile, ProfilePatch};

/// CRUD over connection profiles.
///
/// Cloning the store shares the underlying list.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: Arc<RwLock<Vec<ConnectionProfile>>>,
}

impl ProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with the sample profiles.
    pub fn with_samples() -> Self {
        Self::from_profiles(sample_profiles())
    }

    pub fn from_profiles(profiles: Vec<ConnectionProfile>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(profiles)),
        }
    }

    /// Location of the profile snapshot under the user's home directory.
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".dbscope").join("profiles.json"))
    }

    /// Load a snapshot. A missing file yields the sample profiles.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No profile snapshot at {}, using samples", path.display());
            return Ok(Self::with_samples());
        }

        let contents = smol::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let profiles: Vec<ConnectionProfile> = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid profile snapshot {}", path.display()))?;

        tracing::debug!("Loaded {} profiles from {}", profiles.len(), path.display());
        Ok(Self::from_profiles(profiles))
    }

    /// Write the current profiles as pretty-printed JSON.
    pub async fn persist_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            smol::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = {
            let profiles = self.profiles.read().await;
            serde_json::to_string_pretty(&*profiles)?
        };
        smol::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Add a profile under a freshly generated id and return the stored copy.
    pub async fn create_connection(&self, profile: ConnectionProfile) -> ConnectionProfile {
        let created = ConnectionProfile {
            id: Uuid::new_v4().to_string(),
            ..profile
        };
        self.profiles.write().await.push(created.clone());
        tracing::info!("Created connection {} ({})", created.title, created.id);
        created
    }

    pub async fn get_connection_by_id(&self, id: &str) -> Option<ConnectionProfile> {
        self.profiles
            .read()
            .await
            .iter()
            .find(|profile| profile.id == id)
            .cloned()
    }

    /// All profiles in insertion order.
    pub async fn list(&self) -> Vec<ConnectionProfile> {
        self.profiles.read().await.clone()
    }

    /// Apply `patch` to the profile with `id`. Returns the updated profile, or
    /// `None` when no profile has that id.
    pub async fn update_connection(
        &self,
        id: &str,
        patch: &ProfilePatch,
    ) -> Option<ConnectionProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.iter_mut().find(|profile| profile.id == id)?;
        patch.apply_to(profile);
        Some(profile.clone())
    }

    /// Remove every profile matching `predicate`; returns how many were removed.
    ///
    /// Cached schema entries of removed profiles are left alone.
    pub async fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ConnectionProfile) -> bool,
    {
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|profile| !predicate(profile));
        let removed = before - profiles.len();
        if removed > 0 {
            tracing::info!("Removed {} connection(s)", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::EngineType;
    use crate::services::storage::samples::{SAMPLE_EDU_ID, SAMPLE_FU_ID};

    fn profile(title: &str) -> ConnectionProfile {
        ConnectionProfile::new(
            title.to_string(),
            EngineType::PostgreSQL,
            "db.internal".to_string(),
            5432,
            "app".to_string(),
            "secret".to_string(),
        )
    }

    #[test]
    fn test_create_assigns_fresh_id() {
        smol::block_on(async {
            let store = ProfileStore::new();
            let input = profile("orders");
            let created = store.create_connection(input.clone()).await;

            assert_ne!(created.id, input.id);
            assert_eq!(created.title, "orders");
            assert_eq!(store.get_connection_by_id(&created.id).await, Some(created));
            assert_eq!(store.get_connection_by_id(&input.id).await, None);
        });
    }

    #[test]
    fn test_with_samples() {
        smol::block_on(async {
            let store = ProfileStore::with_samples();
            let ids: Vec<String> = store.list().await.into_iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![SAMPLE_EDU_ID.to_string(), SAMPLE_FU_ID.to_string()]);
        });
    }

    #[test]
    fn test_update_keeps_identity() {
        smol::block_on(async {
            let store = ProfileStore::new();
            let created = store.create_connection(profile("orders")).await;

            let patch = ProfilePatch {
                title: Some("orders-replica".to_string()),
                port: Some(6432),
                database: Some(Some("orders".to_string())),
                ..ProfilePatch::default()
            };
            let updated = store.update_connection(&created.id, &patch).await.unwrap();

            assert_eq!(updated.id, created.id);
            assert_eq!(updated.title, "orders-replica");
            assert_eq!(updated.port, 6432);
            assert_eq!(updated.database.as_deref(), Some("orders"));
            assert_eq!(updated.host, created.host);
            assert!(store.update_connection("missing", &patch).await.is_none());
        });
    }

    #[test]
    fn test_remove_where() {
        smol::block_on(async {
            let store = ProfileStore::with_samples();
            let kept = store.create_connection(profile("orders")).await;

            let removed = store
                .remove_where(|p| p.engine_type == EngineType::MySQL)
                .await;

            assert_eq!(removed, 2);
            assert_eq!(store.list().await, vec![kept]);
            assert_eq!(store.remove_where(|_| false).await, 0);
        });
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("profiles.json");

            let store = ProfileStore::with_samples();
            store.create_connection(profile("orders")).await;
            store.persist_to(&path).await.unwrap();

            let loaded = ProfileStore::load_from(&path).await.unwrap();
            assert_eq!(loaded.list().await, store.list().await);
        });
    }

    #[test]
    fn test_load_missing_file_uses_samples() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = ProfileStore::load_from(&dir.path().join("absent.json"))
                .await
                .unwrap();
            assert_eq!(store.list().await.len(), 2);
        });
    }

    #[test]
    fn test_load_accepts_string_ports() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("profiles.json");
            std::fs::write(
                &path,
                r#"[{"id":"a","title":"A","engineType":"MySQL","host":"h","port":"3306","username":"u","password":"p"}]"#,
            )
            .unwrap();

            let store = ProfileStore::load_from(&path).await.unwrap();
            let profile = store.get_connection_by_id("a").await.unwrap();
            assert_eq!(profile.port, 3306);
            assert_eq!(profile.engine_type, EngineType::MySQL);
        });
    }
}
