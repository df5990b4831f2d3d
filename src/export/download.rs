//! Public download by profile hash
//!
//! The hash is the only credential. Unknown, malformed and deactivated hashes
//! all fail with the same `NotFound`, so a caller cannot discover which profiles
//! exist.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::info;

use crate::error::Result;
use crate::profile::{ExportProfile, ProfileStore};

use super::coordinator::{ExportEngine, ExportJob, ExportSummary};

/// Outcome of a served download
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: &'static str,
    pub file_name: String,
    pub summary: ExportSummary,
}

#[derive(Clone)]
pub struct DownloadService {
    profiles: Arc<dyn ProfileStore>,
    engine: ExportEngine,
}

impl DownloadService {
    pub fn new(profiles: Arc<dyn ProfileStore>, engine: ExportEngine) -> Self {
        Self { profiles, engine }
    }

    /// Find the active profile behind `hash` and record the access
    pub async fn open(&self, hash: &str) -> Result<ExportProfile> {
        let profile = self.profiles.find_by_hash(hash).await?;
        self.profiles.touch_access(profile.id).await?;
        Ok(profile)
    }

    /// Export the profile behind `hash` into `sink`
    pub async fn download<W>(&self, hash: &str, sink: W) -> Result<Download>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let profile = self.open(hash).await?;
        info!(id = %profile.id, format = ?profile.format, "Serving download");

        let summary = self.engine.run(&ExportJob::from(&profile), sink).await?;
        Ok(Download {
            content_type: profile.format.content_type(),
            file_name: profile.file_name(),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::{OperatorId, fixtures};
    use crate::error::ExportError;
    use crate::filter::FilterNode;
    use crate::profile::{
        ExportFormat, ExportOptions, FieldSelection, MemoryProfileStore, NewProfile, ProfileUpdate,
        hash,
    };

    fn service(store: Arc<MemoryProfileStore>) -> DownloadService {
        let engine = ExportEngine::new(Arc::new(fixtures::catalog()), fixtures::services());
        DownloadService::new(store, engine)
    }

    fn price_list() -> NewProfile {
        NewProfile {
            owner: OperatorId(1),
            client: Some(fixtures::DISCOUNT_CLIENT),
            name: "Прайс клиента".to_string(),
            format: ExportFormat::Csv,
            fields: vec![
                FieldSelection::new("id"),
                FieldSelection::new("discounted_price"),
                FieldSelection::new("base_price"),
            ],
            filters: FilterNode::and(vec![FilterNode::condition("id", "equals", json!(10))]),
            options: ExportOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_download_client_price_list() {
        let store = Arc::new(MemoryProfileStore::new());
        let profile = store.create(price_list()).await.unwrap();
        let service = service(Arc::clone(&store));

        let mut out = Vec::new();
        let download = service.download(&profile.hash, &mut out).await.unwrap();

        assert_eq!(download.content_type, "text/csv; charset=utf-8");
        assert_eq!(download.file_name, "Прайс_клиента.csv");
        assert_eq!(download.summary.rows, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "ID,Цена со скидкой,Базовая цена\n10,900.00,1000.00\n"
        );

        let touched = store.get(profile.id).await.unwrap();
        assert!(touched.last_accessed_at.is_some());
    }

    #[tokio::test]
    async fn test_inactive_and_unknown_hash_look_the_same() {
        let store = Arc::new(MemoryProfileStore::new());
        let profile = store.create(price_list()).await.unwrap();
        store
            .update(
                profile.id,
                ProfileUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let service = service(Arc::clone(&store));

        let mut out = Vec::new();
        let inactive = service.download(&profile.hash, &mut out).await.unwrap_err();
        let unknown = service
            .download(&hash::generate(OperatorId(1)), &mut out)
            .await
            .unwrap_err();
        let malformed = service.download("../etc/passwd", &mut out).await.unwrap_err();

        for err in [&inactive, &unknown, &malformed] {
            assert!(matches!(err, ExportError::Access(_)));
            assert_eq!(err.to_string(), "Export not found");
        }
        assert!(out.is_empty());
        assert!(store.get(profile.id).await.unwrap().last_accessed_at.is_none());
    }
}
