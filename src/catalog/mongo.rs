//! MongoDB catalog backend
//!
//! Products are stored denormalized: relations are embedded arrays or
//! sub-documents, so loading a relation means projecting its root field.
//! The projection is derived from the fetch plan, and nested levels the plan
//! does not cover are stripped after decoding.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::error::{Result, StorageError};
use crate::filter::Predicate;
use crate::planner::FetchPlan;

use super::columns::Column;
use super::store::{CatalogStore, Page};
use super::{DynamicAttribute, Product};

pub struct MongoCatalog {
    products: Collection<Document>,
    attributes: Collection<DynamicAttribute>,
}

impl MongoCatalog {
    /// Connect using the `[catalog]` config section
    pub async fn connect(config: &CatalogConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(Duration::from_secs(config.timeout));
        options.server_selection_timeout = Some(Duration::from_secs(config.timeout));

        let client = Client::with_options(options)?;
        let db = client.database(&config.database);
        info!(database = %config.database, "connected to catalog");

        Ok(Self {
            products: db.collection(&config.products_collection),
            attributes: db.collection(&config.attributes_collection),
        })
    }

    /// Scalar columns plus the root of every planned relation
    fn projection(plan: &FetchPlan) -> Document {
        let mut projection = doc! { "_id": 0 };
        for column in Column::all() {
            projection.insert(column.document_path(), 1);
        }
        for path in plan.paths() {
            projection.insert(path.root(), 1);
        }
        projection
    }
}

#[async_trait]
impl CatalogStore for MongoCatalog {
    async fn attributes(&self) -> Result<Vec<DynamicAttribute>> {
        let cursor = self
            .attributes
            .find(doc! {})
            .sort(doc! { "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, filter: &Predicate) -> Result<u64> {
        Ok(self.products.count_documents(filter.to_document()).await?)
    }

    async fn fetch_page(
        &self,
        filter: &Predicate,
        plan: &FetchPlan,
        page: Page,
    ) -> Result<Vec<Product>> {
        let filter_doc = filter.to_document();
        debug!(filter = ?filter_doc, offset = page.offset, limit = page.limit, "fetching page");

        let mut options = mongodb::options::FindOptions::default();
        options.projection = Some(Self::projection(plan));
        options.sort = Some(doc! { "id": 1 });
        options.skip = Some(page.offset);
        options.limit = Some(page.limit as i64);

        let mut cursor = self.products.find(filter_doc).with_options(options).await?;

        let mut products = Vec::with_capacity(page.limit);
        while let Some(document) = cursor.try_next().await? {
            let product: Product = mongodb::bson::from_document(document)
                .map_err(|e| StorageError::Corrupt(format!("product document: {e}")))?;
            products.push(plan.materialize(&product));
        }
        Ok(products)
    }
}
