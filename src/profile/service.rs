//! Validating front for a profile store
//!
//! Profiles are checked against a registry built from the catalog's current
//! attribute definitions, so an attribute added a moment ago is accepted and
//! a misspelled field or non-filterable condition is rejected before the
//! profile is saved.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::catalog::{CatalogStore, OperatorId};
use crate::error::Result;
use crate::fields::FieldRegistry;
use crate::filter::{FilterCompiler, FilterNode};
use crate::resolver::validate_selection;

use super::store::ProfileStore;
use super::{ExportProfile, FieldSelection, NewProfile, ProfileUpdate};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Fresh registry from the catalog's current attributes
    pub async fn registry(&self) -> Result<FieldRegistry> {
        FieldRegistry::build(&self.catalog.attributes().await?)
    }

    /// Validate a field selection and filter tree without saving anything
    pub async fn validate(&self, fields: &[FieldSelection], filters: &FilterNode) -> Result<()> {
        let registry = self.registry().await?;
        validate_selection(&registry, fields)?;
        FilterCompiler::new(&registry).compile(filters)?;
        Ok(())
    }

    pub async fn create(&self, new: NewProfile) -> Result<ExportProfile> {
        self.validate(&new.fields, &new.filters).await?;
        let profile = self.store.create(new).await?;
        info!(id = %profile.id, name = %profile.name, "export profile created");
        Ok(profile)
    }

    pub async fn update(&self, id: Uuid, update: ProfileUpdate) -> Result<ExportProfile> {
        if update.fields.is_some() || update.filters.is_some() {
            let current = self.store.get(id).await?;
            let fields = update.fields.as_ref().unwrap_or(&current.fields);
            let filters = update.filters.as_ref().unwrap_or(&current.filters);
            self.validate(fields, filters).await?;
        }
        self.store.update(id, update).await
    }

    /// Disable the public hash; the profile itself is kept
    pub async fn deactivate(&self, id: Uuid) -> Result<ExportProfile> {
        let profile = self
            .store
            .update(
                id,
                ProfileUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        info!(id = %profile.id, "export profile deactivated");
        Ok(profile)
    }

    pub async fn get(&self, id: Uuid) -> Result<ExportProfile> {
        self.store.get(id).await
    }

    pub async fn list_by_owner(&self, owner: OperatorId) -> Result<Vec<ExportProfile>> {
        self.store.list_by_owner(owner).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::{AttributeType, DynamicAttribute, MemoryCatalog, fixtures};
    use crate::error::{ConfigError, ExportError, ValidationError};
    use crate::profile::{ExportFormat, ExportOptions, MemoryProfileStore};

    fn service_with(catalog: MemoryCatalog) -> ProfileService {
        ProfileService::new(Arc::new(MemoryProfileStore::new()), Arc::new(catalog))
    }

    fn draft(fields: &[&str], filters: FilterNode) -> NewProfile {
        NewProfile {
            owner: OperatorId(1),
            client: None,
            name: "test".to_string(),
            format: ExportFormat::Json,
            fields: fields.iter().map(|k| FieldSelection::new(k)).collect(),
            filters,
            options: ExportOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_non_filterable_condition() {
        let service = service_with(fixtures::catalog());
        let filters = FilterNode::and(vec![FilterNode::condition(
            "discounted_price",
            "gt",
            json!(100),
        )]);
        let err = service.create(draft(&["id"], filters)).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::Validation(ValidationError::FieldNotFilterable(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_field() {
        let service = service_with(fixtures::catalog());
        let err = service
            .create(draft(&["id", "colour"], FilterNode::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::UnknownField(_))));
    }

    #[tokio::test]
    async fn test_new_attribute_usable_immediately() {
        let mut catalog = fixtures::catalog();
        catalog.define_attribute(DynamicAttribute {
            id: 2,
            slug: "material".to_string(),
            name: "Материал".to_string(),
            kind: AttributeType::String,
            unit: None,
            values: Vec::new(),
        });
        let service = service_with(catalog);

        let registry = service.registry().await.unwrap();
        let count = registry
            .all()
            .iter()
            .filter(|f| f.key == "attribute.material")
            .count();
        assert_eq!(count, 1);

        let filters = FilterNode::and(vec![FilterNode::condition(
            "attribute.material",
            "contains",
            json!("дерев"),
        )]);
        assert!(service.create(draft(&["attribute.material"], filters)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_validates_merged_state() {
        let service = service_with(fixtures::catalog());
        let profile = service
            .create(draft(&["id"], FilterNode::default()))
            .await
            .unwrap();

        let err = service
            .update(
                profile.id,
                ProfileUpdate {
                    fields: Some(vec![FieldSelection::new("recommended_price")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Config(ConfigError::FieldNotExportable(_))));

        let deactivated = service.deactivate(profile.id).await.unwrap();
        assert_eq!(deactivated.hash, profile.hash);
        assert!(!deactivated.is_active);
    }
}
