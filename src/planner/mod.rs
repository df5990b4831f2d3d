//! Eager-fetch planning
//!
//! Given the fields of a profile, the planner computes the minimal set of
//! relation paths the catalog store must load up front. Paths are collapsed by
//! segment prefix: loading `warehouses.pivot` loads `warehouses` too, so the
//! shorter path is dropped from the plan.
//!
//! The plan is also what materializes a product for resolution: relation slots
//! outside the plan are left unloaded, so a field that forgot to declare a path
//! fails loudly instead of triggering a per-row fetch.

use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{Product, RELATION_PATHS};
use crate::error::{ConfigError, Result};
use crate::fields::FieldRegistry;

/// A validated relation path such as `warehouses.pivot`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationPath(String);

impl RelationPath {
    /// Parse a path, accepting only relations a store can load
    pub fn parse(path: &str) -> Option<Self> {
        RELATION_PATHS
            .contains(&path)
            .then(|| RelationPath(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// First segment, the relation on the product itself
    pub fn root(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// True when `other` extends this path by at least one segment
    pub fn is_strict_prefix_of(&self, other: &RelationPath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapsed set of relation paths to prefetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    paths: Vec<RelationPath>,
}

impl FetchPlan {
    /// Plan that loads nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a plan from raw paths, deduplicating and collapsing prefixes
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = RelationPath>,
    {
        let unique: BTreeSet<RelationPath> = paths.into_iter().collect();
        let paths = unique
            .iter()
            .filter(|p| !unique.iter().any(|q| p.is_strict_prefix_of(q)))
            .cloned()
            .collect();
        Self { paths }
    }

    /// Plan the union of prefetch paths for the given field keys
    pub fn for_fields<S: AsRef<str>>(registry: &FieldRegistry, keys: &[S]) -> Result<Self> {
        let mut paths = Vec::new();
        for key in keys {
            let field = registry.lookup(key.as_ref())?;
            for raw in &field.prefetch_paths {
                let path = RelationPath::parse(raw).ok_or_else(|| {
                    ConfigError::UnknownPrefetchPath {
                        field: field.key.clone(),
                        path: raw.clone(),
                    }
                })?;
                paths.push(path);
            }
        }
        Ok(Self::from_paths(paths))
    }

    pub fn paths(&self) -> &[RelationPath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether loading this plan makes `path` available
    pub fn covers(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            p.as_str() == path
                || (p.as_str().starts_with(path) && p.as_str().as_bytes().get(path.len()) == Some(&b'.'))
        })
    }

    /// Copy a fully loaded product, keeping only the relations this plan covers
    pub fn materialize(&self, product: &Product) -> Product {
        let mut item = product.clone();

        if !self.covers("brand") {
            item.brand.unload();
        }

        if !self.covers("categories") {
            item.categories.unload();
        } else if !self.covers("categories.ancestors") {
            if let crate::catalog::Relation::Loaded(cats) = &mut item.categories {
                cats.iter_mut().for_each(|c| c.ancestors.unload());
            }
        }

        if !self.covers("warehouses") {
            item.warehouses.unload();
        } else if !self.covers("warehouses.pivot") {
            if let crate::catalog::Relation::Loaded(whs) = &mut item.warehouses {
                whs.iter_mut().for_each(|w| w.pivot.unload());
            }
        }

        if !self.covers("images") {
            item.images.unload();
        }

        if !self.covers("attribute_values") {
            item.attribute_values.unload();
        }

        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    fn path(p: &str) -> RelationPath {
        RelationPath::parse(p).unwrap()
    }

    #[test]
    fn test_unknown_path_rejected() {
        assert!(RelationPath::parse("suppliers").is_none());
        assert!(RelationPath::parse("warehouses.pivot").is_some());
    }

    #[test]
    fn test_prefix_collapses_to_deeper_path() {
        let plan = FetchPlan::from_paths(vec![path("warehouses"), path("warehouses.pivot")]);
        assert_eq!(plan.paths(), &[path("warehouses.pivot")]);
        assert!(plan.covers("warehouses"));
        assert!(plan.covers("warehouses.pivot"));
    }

    #[test]
    fn test_duplicates_removed_and_unrelated_kept() {
        let plan = FetchPlan::from_paths(vec![
            path("brand"),
            path("categories"),
            path("brand"),
            path("categories.ancestors"),
            path("images"),
        ]);
        let names: Vec<&str> = plan.paths().iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["brand", "categories.ancestors", "images"]);
    }

    #[test]
    fn test_prefix_check_respects_segment_boundary() {
        assert!(!path("images").is_strict_prefix_of(&path("brand")));
        let plan = FetchPlan::from_paths(vec![path("categories")]);
        assert!(!plan.covers("categories.ancestors"));
    }

    #[test]
    fn test_plan_for_fields_merges_descriptors() {
        let registry = fixtures::registry();
        let plan = FetchPlan::for_fields(
            &registry,
            &["id", "brand.name", "stock.total", "warehouses.name", "category_path"],
        )
        .unwrap();
        let names: Vec<&str> = plan.paths().iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["brand", "categories.ancestors", "warehouses.pivot"]);
    }

    #[test]
    fn test_plan_for_unknown_field_fails() {
        let registry = fixtures::registry();
        assert!(FetchPlan::for_fields(&registry, &["nope"]).is_err());
    }

    #[test]
    fn test_materialize_strips_unplanned_relations() {
        let product = fixtures::products().remove(0);
        let plan = FetchPlan::from_paths(vec![path("warehouses")]);
        let item = plan.materialize(&product);

        assert!(item.brand.is_not_loaded());
        assert!(item.images.is_not_loaded());
        let whs = item.warehouses.get("warehouses").unwrap();
        assert!(whs.iter().all(|w| w.pivot.is_not_loaded()));
    }
}
