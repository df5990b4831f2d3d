//! Field contract and registry
//!
//! Every exportable or filterable piece of product information is described by
//! one [`FieldDescriptor`]: static metadata plus a [`Resolver`] that computes the
//! value for a product. Descriptors come from two sources that the
//! [`FieldRegistry`] merges behind one lookup:
//!
//! - the built-in catalog of product fields (`builtin`)
//! - one synthesized field per administrator-defined attribute (`attribute`)
//!
//! A field is filterable exactly when it declares a [`FilterSource`]. Fields
//! computed by collaborators (personalized prices and stock) have none, since
//! the catalog store cannot evaluate them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Aggregate, ClientId, Column, Product, RelatedColumn};
use crate::error::Result;
use crate::services::{Services, StockKind};

pub mod attribute;
pub mod builtin;
pub mod registry;
pub mod value;

pub use attribute::AttributeBinding;
pub use registry::FieldRegistry;
pub use value::{FieldValue, Locale};

/// Value type, which gates the filter operators a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Numeric,
    Boolean,
    Date,
}

/// Display transformation applied after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierType {
    #[default]
    None,
    MultiValue,
    Price,
    Boolean,
}

/// Where the filter compiler reads a field's value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// Direct column comparison
    Column(Column),
    /// "Has at least one related row whose value matches"
    Related(RelatedColumn),
    /// Comparison on a folded relation
    Aggregate(Aggregate),
    /// "Has at least one value of this attribute that matches"
    Attribute { attribute_id: i64 },
}

/// Personalized computations delegated to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personalized {
    DiscountPercent,
    DiscountedPrice,
    RegionalStock(StockKind),
}

/// How a field obtains its value
#[derive(Clone)]
pub enum Resolver {
    /// Projection of one scalar column
    Column(Column),
    /// Pure function of the product and its prefetched relations
    Computed(fn(&Product) -> Result<FieldValue>),
    /// Values of a dynamic attribute
    Attribute(AttributeBinding),
    /// Client-dependent value from a collaborator
    Personalized(Personalized),
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Column(column) => f.debug_tuple("Column").field(column).finish(),
            Resolver::Computed(_) => f.write_str("Computed"),
            Resolver::Attribute(binding) => f.debug_tuple("Attribute").field(binding).finish(),
            Resolver::Personalized(kind) => f.debug_tuple("Personalized").field(kind).finish(),
        }
    }
}

/// Explicit inputs to resolution besides the product
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Client whose prices and stock the export reflects
    pub client: Option<ClientId>,
    pub services: &'a Services,
}

/// Static metadata and resolver for one field
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub group: String,
    filter_group: Option<String>,
    pub value_type: ValueType,
    pub exportable: bool,
    pub modifier: ModifierType,
    pub prefetch_paths: Vec<String>,
    pub filter: Option<FilterSource>,
    pub resolver: Resolver,
}

pub const DEFAULT_GROUP: &str = "Основные";

impl FieldDescriptor {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        value_type: ValueType,
        resolver: Resolver,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            description: String::new(),
            group: DEFAULT_GROUP.to_string(),
            filter_group: None,
            value_type,
            exportable: true,
            modifier: ModifierType::None,
            prefetch_paths: Vec::new(),
            filter: None,
            resolver,
        }
    }

    /// Column-backed field, filterable by direct comparison
    pub fn direct(key: &str, display_name: &str, value_type: ValueType, column: Column) -> Self {
        Self::new(key, display_name, value_type, Resolver::Column(column))
            .filter_by(FilterSource::Column(column))
    }

    /// Field computed from prefetched relations
    pub fn derived(
        key: &str,
        display_name: &str,
        value_type: ValueType,
        compute: fn(&Product) -> Result<FieldValue>,
    ) -> Self {
        Self::new(key, display_name, value_type, Resolver::Computed(compute))
    }

    /// Client-dependent field; never filterable
    pub fn personalized(
        key: &str,
        display_name: &str,
        value_type: ValueType,
        kind: Personalized,
    ) -> Self {
        Self::new(key, display_name, value_type, Resolver::Personalized(kind))
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn with_filter_group(mut self, group: &str) -> Self {
        self.filter_group = Some(group.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn modifier(mut self, modifier: ModifierType) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn prefetch(mut self, paths: &[&str]) -> Self {
        self.prefetch_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn filter_by(mut self, source: FilterSource) -> Self {
        self.filter = Some(source);
        self
    }

    /// Usable in filters only, hidden from export selection
    pub fn filter_only(mut self) -> Self {
        self.exportable = false;
        self
    }

    pub fn is_filterable(&self) -> bool {
        self.filter.is_some()
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }

    /// Grouping in the filter UI, defaults to the export group
    pub fn filter_group(&self) -> &str {
        self.filter_group.as_deref().unwrap_or(&self.group)
    }

    /// Resolve the raw (pre-modifier) value for `item`
    pub async fn resolve(&self, item: &Product, ctx: &ResolveContext<'_>) -> Result<FieldValue> {
        match &self.resolver {
            Resolver::Column(column) => Ok(project(*column, item)),
            Resolver::Computed(compute) => compute(item),
            Resolver::Attribute(binding) => binding.resolve(item),
            Resolver::Personalized(kind) => resolve_personalized(*kind, item, ctx).await,
        }
    }

    /// Value substituted when a collaborator fails in non-strict mode
    pub fn neutral_value(&self, item: &Product) -> FieldValue {
        match &self.resolver {
            Resolver::Personalized(kind) => personalized_default(*kind, item),
            _ => FieldValue::Null,
        }
    }
}

fn project(column: Column, item: &Product) -> FieldValue {
    let decimal = |d: Option<Decimal>| d.map_or(FieldValue::Null, FieldValue::Decimal);
    match column {
        Column::Id => FieldValue::Integer(item.id),
        Column::Name => FieldValue::Text(item.name.clone()),
        Column::Sku => FieldValue::Text(item.sku.clone()),
        Column::Slug => FieldValue::Text(item.slug.clone()),
        Column::Description => item
            .description
            .clone()
            .map_or(FieldValue::Null, FieldValue::Text),
        Column::BasePrice => FieldValue::Decimal(item.base_price),
        Column::RecommendedPrice => decimal(item.recommended_price),
        Column::Weight => decimal(item.weight),
        Column::IsNew => FieldValue::Bool(item.is_new),
        Column::IsActive => FieldValue::Bool(item.is_active),
        Column::IsBestseller => FieldValue::Bool(item.is_bestseller),
        Column::BrandId => item.brand_id.map_or(FieldValue::Null, FieldValue::Integer),
        Column::CreatedAt => FieldValue::DateTime(item.created_at),
        Column::UpdatedAt => FieldValue::DateTime(item.updated_at),
    }
}

/// Values used when no client context is given
fn personalized_default(kind: Personalized, item: &Product) -> FieldValue {
    match kind {
        Personalized::DiscountPercent => FieldValue::Decimal(Decimal::ZERO),
        Personalized::DiscountedPrice => FieldValue::Decimal(item.base_price),
        Personalized::RegionalStock(_) => FieldValue::Integer(0),
    }
}

async fn resolve_personalized(
    kind: Personalized,
    item: &Product,
    ctx: &ResolveContext<'_>,
) -> Result<FieldValue> {
    let Some(client) = ctx.client else {
        return Ok(personalized_default(kind, item));
    };

    let services = ctx.services;
    Ok(match kind {
        Personalized::DiscountPercent => {
            FieldValue::Decimal(services.pricing.discount_percent(item, client).await?)
        }
        Personalized::DiscountedPrice => {
            FieldValue::Decimal(services.pricing.discounted_price(item, client).await?)
        }
        Personalized::RegionalStock(stock_kind) => FieldValue::Integer(
            services.stock.regional_stock(item, client, stock_kind).await?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    #[tokio::test]
    async fn test_personalized_without_client_is_neutral() {
        let services = fixtures::services();
        let ctx = ResolveContext {
            client: None,
            services: &services,
        };
        let item = fixtures::product(10);
        let registry = fixtures::registry();

        let price = registry.lookup("discounted_price").unwrap();
        assert_eq!(
            price.resolve(&item, &ctx).await.unwrap(),
            FieldValue::Decimal(Decimal::from(1000))
        );
        let pct = registry.lookup("discount_percent").unwrap();
        assert_eq!(
            pct.resolve(&item, &ctx).await.unwrap(),
            FieldValue::Decimal(Decimal::ZERO)
        );
        let preorder = registry.lookup("stock.regional_preorder").unwrap();
        assert_eq!(preorder.resolve(&item, &ctx).await.unwrap(), FieldValue::Integer(0));
    }

    #[tokio::test]
    async fn test_personalized_with_client_uses_collaborators() {
        let services = fixtures::services();
        let ctx = ResolveContext {
            client: Some(fixtures::DISCOUNT_CLIENT),
            services: &services,
        };
        let item = fixtures::product(10);
        let registry = fixtures::registry();

        let price = registry.lookup("discounted_price").unwrap();
        assert_eq!(
            price.resolve(&item, &ctx).await.unwrap(),
            FieldValue::Decimal(Decimal::from(900))
        );
    }

    #[test]
    fn test_filter_group_defaults_to_group() {
        let field = FieldDescriptor::direct("sku", "Артикул", ValueType::Text, Column::Sku)
            .group("Коды");
        assert_eq!(field.filter_group(), "Коды");
        let field = field.with_filter_group("Поиск");
        assert_eq!(field.filter_group(), "Поиск");
    }

    #[test]
    fn test_personalized_fields_are_not_filterable() {
        let field = FieldDescriptor::personalized(
            "discount_percent",
            "Скидка",
            ValueType::Numeric,
            Personalized::DiscountPercent,
        );
        assert!(!field.is_filterable());
        assert!(field.is_exportable());
    }
}
