//! Paged product streaming
//!
//! Products are pulled from the catalog one page at a time so an export never
//! holds more than a page of items (plus the rows in flight) in memory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::catalog::{CatalogStore, Page, Product};
use crate::error::Result;
use crate::filter::Predicate;
use crate::planner::FetchPlan;

/// Source of product batches for an export run
#[async_trait]
pub trait StreamingQuery: Send {
    /// Fetch the next batch, or `None` once exhausted
    async fn next_batch(&mut self) -> Result<Option<Vec<Product>>>;

    /// Products fetched so far
    fn fetched(&self) -> u64;
}

/// Walks the filtered catalog in id order, page by page
pub struct CatalogScan {
    store: Arc<dyn CatalogStore>,
    filter: Predicate,
    plan: FetchPlan,
    page: Page,
    fetched: u64,
    exhausted: bool,
}

impl CatalogScan {
    pub fn new(store: Arc<dyn CatalogStore>, filter: Predicate, plan: FetchPlan, batch_size: usize) -> Self {
        Self {
            store,
            filter,
            plan,
            page: Page::first(batch_size.max(1)),
            fetched: 0,
            exhausted: false,
        }
    }
}

#[async_trait]
impl StreamingQuery for CatalogScan {
    async fn next_batch(&mut self) -> Result<Option<Vec<Product>>> {
        if self.exhausted {
            return Ok(None);
        }
        // Nothing can match; skip the round trip
        if matches!(self.filter, Predicate::Nothing) {
            self.exhausted = true;
            return Ok(None);
        }

        let batch = self.store.fetch_page(&self.filter, &self.plan, self.page).await?;
        if batch.len() < self.page.limit {
            self.exhausted = true;
        }
        if batch.is_empty() {
            debug!("Catalog scan exhausted after {} products", self.fetched);
            return Ok(None);
        }

        self.fetched += batch.len() as u64;
        self.page = self.page.next();
        debug!(
            "Fetched page of {} products (total: {})",
            batch.len(),
            self.fetched
        );
        Ok(Some(batch))
    }

    fn fetched(&self) -> u64 {
        self.fetched
    }
}
