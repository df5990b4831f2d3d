//! In-memory catalog backend
//!
//! Holds fully loaded products and strips each page down to the fetch plan,
//! which makes it a faithful stand-in for a database that loads relations
//! per page. Used by tests and by the CLI's `--catalog-file` mode.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result, StorageError};
use crate::filter::Predicate;
use crate::planner::FetchPlan;

use super::store::{CatalogStore, Page};
use super::{DynamicAttribute, Product};

/// Counters of backend round-trips
#[derive(Debug, Default)]
pub struct FetchStats {
    queries: AtomicU64,
    relation_loads: AtomicU64,
}

impl FetchStats {
    /// Page queries issued
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Relation loads issued; one per planned path per page
    pub fn relation_loads(&self) -> u64 {
        self.relation_loads.load(Ordering::Relaxed)
    }
}

/// On-disk layout read by [`MemoryCatalog::from_json_file`]
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    attributes: Vec<DynamicAttribute>,
    products: Vec<Product>,
}

pub struct MemoryCatalog {
    products: Vec<Product>,
    attributes: Vec<DynamicAttribute>,
    stats: Arc<FetchStats>,
}

impl MemoryCatalog {
    pub fn new(mut products: Vec<Product>, attributes: Vec<DynamicAttribute>) -> Self {
        products.sort_by_key(|p| p.id);
        Self {
            products,
            attributes,
            stats: Arc::new(FetchStats::default()),
        }
    }

    /// Load a catalog from a JSON file with `products` and `attributes` arrays
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string()).into()
            } else {
                crate::error::ExportError::Io(e)
            }
        })?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;
        debug!(
            products = file.products.len(),
            attributes = file.attributes.len(),
            "catalog file loaded"
        );
        Ok(Self::new(file.products, file.attributes))
    }

    /// Add or replace an attribute definition at runtime
    pub fn define_attribute(&mut self, attribute: DynamicAttribute) {
        self.attributes.retain(|a| a.id != attribute.id);
        self.attributes.push(attribute);
    }

    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn attributes(&self) -> Result<Vec<DynamicAttribute>> {
        Ok(self.attributes.clone())
    }

    async fn count(&self, filter: &Predicate) -> Result<u64> {
        Ok(self.products.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn fetch_page(
        &self,
        filter: &Predicate,
        plan: &FetchPlan,
        page: Page,
    ) -> Result<Vec<Product>> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);

        let rows: Vec<Product> = self
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .skip(page.offset as usize)
            .take(page.limit)
            .map(|p| plan.materialize(p))
            .collect();

        if !rows.is_empty() {
            self.stats
                .relation_loads
                .fetch_add(plan.paths().len() as u64, Ordering::Relaxed);
        }
        Ok(rows)
    }
}
