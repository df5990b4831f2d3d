//! JSON-file profile store
//!
//! Keeps profiles in memory and rewrites the whole file after each change.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash never leaves a half-written store behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::OperatorId;
use crate::error::{Result, StorageError};

use super::store::{MemoryProfileStore, ProfileStore};
use super::{ExportProfile, NewProfile, ProfileUpdate};

pub struct FileProfileStore {
    path: PathBuf,
    inner: MemoryProfileStore,
    /// Serializes file rewrites
    save_lock: Mutex<()>,
}

impl FileProfileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let profiles: Vec<ExportProfile> = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), profiles = profiles.len(), "profile store opened");

        Ok(Self {
            path,
            inner: MemoryProfileStore::with_profiles(profiles),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;
        let profiles = self.inner.snapshot().await;
        let json = serde_json::to_vec_pretty(&profiles)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), profiles = profiles.len(), "profile store saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn create(&self, new: NewProfile) -> Result<ExportProfile> {
        let profile = self.inner.create(new).await?;
        self.save().await?;
        Ok(profile)
    }

    async fn get(&self, id: Uuid) -> Result<ExportProfile> {
        self.inner.get(id).await
    }

    async fn find_by_hash(&self, hash: &str) -> Result<ExportProfile> {
        self.inner.find_by_hash(hash).await
    }

    async fn touch_access(&self, id: Uuid) -> Result<()> {
        self.inner.touch_access(id).await?;
        self.save().await
    }

    async fn update(&self, id: Uuid, update: ProfileUpdate) -> Result<ExportProfile> {
        let profile = self.inner.update(id, update).await?;
        self.save().await?;
        Ok(profile)
    }

    async fn list_by_owner(&self, owner: OperatorId) -> Result<Vec<ExportProfile>> {
        self.inner.list_by_owner(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterNode;
    use crate::profile::{ExportFormat, ExportOptions, FieldSelection};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("catalog-export-profiles-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_profiles_survive_reopen() {
        let path = temp_path();
        let store = FileProfileStore::open(&path).await.unwrap();
        let created = store
            .create(NewProfile {
                owner: OperatorId(4),
                client: None,
                name: "Остатки".to_string(),
                format: ExportFormat::Xml,
                fields: vec![FieldSelection::new("sku"), FieldSelection::new("stock.total")],
                filters: FilterNode::default(),
                options: ExportOptions::default(),
            })
            .await
            .unwrap();
        store.touch_access(created.id).await.unwrap();

        let reopened = FileProfileStore::open(&path).await.unwrap();
        let found = reopened.find_by_hash(&created.hash).await.unwrap();
        assert_eq!(found.name, "Остатки");
        assert_eq!(found.fields, created.fields);
        assert!(found.last_accessed_at.is_some());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let store = FileProfileStore::open(temp_path()).await.unwrap();
        assert!(store.list_by_owner(OperatorId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_rejected() {
        let path = temp_path();
        tokio::fs::write(&path, "{ not json").await.unwrap();
        assert!(FileProfileStore::open(&path).await.is_err());
        tokio::fs::remove_file(&path).await.ok();
    }
}
