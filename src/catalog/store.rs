//! Catalog query boundary

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::Predicate;
use crate::planner::FetchPlan;

use super::{DynamicAttribute, Product};

/// One window of the id-ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page after this one
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit as u64,
            limit: self.limit,
        }
    }
}

/// Read access to products and attribute definitions
///
/// Implementations must apply the filter themselves and load exactly the
/// relations the plan names, once per page rather than once per product.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Current dynamic attribute definitions
    async fn attributes(&self) -> Result<Vec<DynamicAttribute>>;

    /// Number of products matching `filter`
    async fn count(&self, filter: &Predicate) -> Result<u64>;

    /// Matching products ordered by id, with planned relations loaded
    async fn fetch_page(
        &self,
        filter: &Predicate,
        plan: &FetchPlan,
        page: Page,
    ) -> Result<Vec<Product>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_advances_by_limit() {
        let page = Page::first(50).next().next();
        assert_eq!(page, Page { offset: 100, limit: 50 });
    }
}
