//! Catalog model and store backends
//!
//! This module defines the product shape the export engine reads:
//! - `Product`: scalar columns plus relation slots that are only populated
//!   when the fetch plan asks for them
//! - `DynamicAttribute`: administrator-defined dimensions that synthesize fields
//! - `CatalogStore`: the query boundary implemented by the in-memory and MongoDB backends

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};

pub mod columns;
pub mod memory;
pub mod mongo;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use columns::{Aggregate, Column, RelatedColumn, Scalar};
pub use memory::{FetchStats, MemoryCatalog};
pub use mongo::MongoCatalog;
pub use store::{CatalogStore, Page};

/// Relation paths a catalog store knows how to load.
pub const RELATION_PATHS: &[&str] = &[
    "brand",
    "categories",
    "categories.ancestors",
    "warehouses",
    "warehouses.pivot",
    "images",
    "attribute_values",
];

/// Identity of the client whose prices and stock an export reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

/// Identity of the operator who owns export profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

/// A related-data slot that is either loaded by the fetch plan or absent.
///
/// Reading a slot that was not loaded is a configuration error: resolvers
/// never fetch on their own.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
    NotLoaded,
    Loaded(T),
}

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Relation::NotLoaded
    }
}

impl<T> Relation<T> {
    /// Access the loaded value, failing if `path` was not prefetched
    pub fn get(&self, path: &str) -> Result<&T> {
        match self {
            Relation::Loaded(value) => Ok(value),
            Relation::NotLoaded => Err(ConfigError::RelationNotLoaded(path.to_string()).into()),
        }
    }

    /// Loaded value, if any
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Relation::Loaded(value) => Some(value),
            Relation::NotLoaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    pub fn is_not_loaded(&self) -> bool {
        !self.is_loaded()
    }

    /// Drop the loaded value
    pub fn unload(&mut self) {
        *self = Relation::NotLoaded;
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Relation::Loaded(value) => value.serialize(serializer),
            Relation::NotLoaded => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Relation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Relation::Loaded)
    }
}

/// A catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub recommended_price: Option<Decimal>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub brand_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,

    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub brand: Relation<Option<Brand>>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub categories: Relation<Vec<Category>>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub warehouses: Relation<Vec<WarehouseStock>>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub images: Relation<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub attribute_values: Relation<Vec<AttributeValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Category membership; the first category is the product's primary one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Ancestor names, root first
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub ancestors: Relation<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub id: i64,
    pub name: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub pivot: Relation<StockPivot>,
}

/// Per-warehouse quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockPivot {
    pub available: i64,
    #[serde(default)]
    pub preorder: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub position: u32,
}

/// One value of a dynamic attribute attached to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub attribute_id: i64,
    pub value: AttributeScalar,
}

/// Stored attribute value
///
/// Only native numbers decode as `Number`; a numeric-looking string such as
/// a size `"42"` stays `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeScalar {
    Bool(bool),
    Number(Decimal),
    Text(String),
}

impl Serialize for AttributeScalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AttributeScalar::Bool(b) => serializer.serialize_bool(*b),
            AttributeScalar::Number(n) => match n.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => Err(serde::ser::Error::custom(format!("number out of range: {n}"))),
            },
            AttributeScalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for AttributeScalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(AttributeScalarVisitor)
    }
}

struct AttributeScalarVisitor;

impl<'de> serde::de::Visitor<'de> for AttributeScalarVisitor {
    type Value = AttributeScalar;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a boolean, number or string")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(AttributeScalar::Bool(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(AttributeScalar::Number(Decimal::from(v)))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(AttributeScalar::Number(Decimal::from(v)))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Decimal::try_from(v)
            .map(AttributeScalar::Number)
            .map_err(|_| E::custom(format!("number out of range: {v}")))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(AttributeScalar::Text(v.to_string()))
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(AttributeScalar::Text(v))
    }
}

impl AttributeScalar {
    pub fn as_text(&self) -> String {
        match self {
            AttributeScalar::Bool(b) => b.to_string(),
            AttributeScalar::Number(n) => n.normalize().to_string(),
            AttributeScalar::Text(s) => s.clone(),
        }
    }
}

/// Administrator-defined attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Select,
}

/// Runtime-defined product dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAttribute {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub unit: Option<String>,
    /// Ordered predefined values for `select` attributes
    #[serde(default)]
    pub values: Vec<String>,
}

impl Product {
    /// Values of one dynamic attribute, empty when the product has none
    pub fn attribute(&self, attribute_id: i64) -> Result<Vec<&AttributeScalar>> {
        Ok(self
            .attribute_values
            .get("attribute_values")?
            .iter()
            .filter(|v| v.attribute_id == attribute_id)
            .map(|v| &v.value)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_relation_deserializes_as_not_loaded() {
        let json = r#"{
            "id": 1, "name": "Lamp", "sku": "L-1", "slug": "lamp",
            "base_price": "10.50",
            "created_at": "2024-01-01T00:00:00", "updated_at": "2024-01-01T00:00:00",
            "brand": null
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.brand, Relation::Loaded(None));
        assert!(product.categories.is_not_loaded());
        assert!(product.images.get("images").is_err());
    }

    #[test]
    fn test_relation_get_reports_path() {
        let rel: Relation<Vec<Image>> = Relation::NotLoaded;
        let err = rel.get("images").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Relation 'images' is not part of the fetch plan"
        );
    }

    #[test]
    fn test_attribute_scalar_decoding() {
        let values: Vec<AttributeScalar> =
            serde_json::from_str(r#"[true, 12.5, 3, "red", "42"]"#).unwrap();
        assert_eq!(values[0], AttributeScalar::Bool(true));
        assert_eq!(values[1], AttributeScalar::Number(Decimal::new(125, 1)));
        assert_eq!(values[2], AttributeScalar::Number(Decimal::from(3)));
        assert_eq!(values[3], AttributeScalar::Text("red".to_string()));
        assert_eq!(values[4], AttributeScalar::Text("42".to_string()));
    }

    #[test]
    fn test_attribute_scalar_round_trips_through_json() {
        let values = vec![
            AttributeScalar::Number(Decimal::from(42)),
            AttributeScalar::Text("42".to_string()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[42.0,"42"]"#);
        let back: Vec<AttributeScalar> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
