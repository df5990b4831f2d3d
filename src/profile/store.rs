//! Profile persistence boundary and the in-memory store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::OperatorId;
use crate::error::{AccessError, Result};

use super::{ExportProfile, NewProfile, ProfileUpdate, hash};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Persist a new active profile with a freshly generated hash
    async fn create(&self, new: NewProfile) -> Result<ExportProfile>;

    /// Owner-side lookup; finds inactive profiles too
    async fn get(&self, id: Uuid) -> Result<ExportProfile>;

    /// Public lookup; unknown and inactive hashes are both `NotFound`
    async fn find_by_hash(&self, hash: &str) -> Result<ExportProfile>;

    /// Record a download
    async fn touch_access(&self, id: Uuid) -> Result<()>;

    async fn update(&self, id: Uuid, update: ProfileUpdate) -> Result<ExportProfile>;

    /// Profiles of one owner, newest first
    async fn list_by_owner(&self, owner: OperatorId) -> Result<Vec<ExportProfile>>;
}

pub(super) fn build_profile(new: NewProfile) -> ExportProfile {
    let now = Utc::now();
    ExportProfile {
        id: Uuid::new_v4(),
        hash: hash::generate(new.owner),
        owner: new.owner,
        client: new.client,
        name: new.name,
        format: new.format,
        fields: new.fields,
        filters: new.filters,
        options: new.options,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_accessed_at: None,
    }
}

/// Profiles held in a map behind a tokio lock
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<Uuid, ExportProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<ExportProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    /// Every stored profile, ordered by creation time
    pub async fn snapshot(&self) -> Vec<ExportProfile> {
        let mut all: Vec<ExportProfile> = self.profiles.read().await.values().cloned().collect();
        all.sort_by_key(|p| (p.created_at, p.id));
        all
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create(&self, new: NewProfile) -> Result<ExportProfile> {
        let profile = build_profile(new);
        debug!(id = %profile.id, owner = profile.owner.0, "profile created");
        self.profiles
            .write()
            .await
            .insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get(&self, id: Uuid) -> Result<ExportProfile> {
        self.profiles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AccessError::NotFound.into())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<ExportProfile> {
        if !hash::is_well_formed(hash) {
            return Err(AccessError::NotFound.into());
        }
        self.profiles
            .read()
            .await
            .values()
            .find(|p| p.is_active && p.hash == hash)
            .cloned()
            .ok_or_else(|| AccessError::NotFound.into())
    }

    async fn touch_access(&self, id: Uuid) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&id).ok_or(AccessError::NotFound)?;
        profile.last_accessed_at = Some(Utc::now());
        Ok(())
    }

    async fn update(&self, id: Uuid, update: ProfileUpdate) -> Result<ExportProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&id).ok_or(AccessError::NotFound)?;
        update.apply(profile, Utc::now());
        Ok(profile.clone())
    }

    async fn list_by_owner(&self, owner: OperatorId) -> Result<Vec<ExportProfile>> {
        let mut owned: Vec<ExportProfile> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}
