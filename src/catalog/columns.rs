//! Filterable value sources on a product
//!
//! Columns are scalar properties, related columns are values reached through a
//! relation (compiled to existence checks), aggregates fold a relation into a
//! number. Each source can read itself from a product and name its MongoDB path.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::Product;

/// A comparable value used by filter predicates
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(DateBound),
}

/// Date operand: a whole day, or an exact instant when a time was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Day(NaiveDate),
    Instant(NaiveDateTime),
}

impl Scalar {
    /// Order `self` (a stored value) against `bound` (a filter operand).
    ///
    /// Returns `None` when the two are not comparable. A stored instant compared
    /// with a whole-day bound is compared by its date only.
    pub fn compare(&self, bound: &Scalar) -> Option<Ordering> {
        match (self, bound) {
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => Some(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.compare(b)),
            _ => None,
        }
    }
}

impl DateBound {
    fn compare(&self, other: &DateBound) -> Ordering {
        match (self, other) {
            (DateBound::Instant(a), DateBound::Day(b)) => a.date().cmp(b),
            (DateBound::Day(a), DateBound::Instant(b)) => a.cmp(&b.date()),
            (DateBound::Day(a), DateBound::Day(b)) => a.cmp(b),
            (DateBound::Instant(a), DateBound::Instant(b)) => a.cmp(b),
        }
    }
}

/// Scalar product column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Name,
    Sku,
    Slug,
    Description,
    BasePrice,
    RecommendedPrice,
    Weight,
    IsNew,
    IsActive,
    IsBestseller,
    BrandId,
    CreatedAt,
    UpdatedAt,
}

impl Column {
    /// Read the column from a product; `None` for SQL-style nulls
    pub fn value(&self, product: &Product) -> Option<Scalar> {
        match self {
            Column::Id => Some(Scalar::Number(Decimal::from(product.id))),
            Column::Name => Some(Scalar::Text(product.name.clone())),
            Column::Sku => Some(Scalar::Text(product.sku.clone())),
            Column::Slug => Some(Scalar::Text(product.slug.clone())),
            Column::Description => product.description.clone().map(Scalar::Text),
            Column::BasePrice => Some(Scalar::Number(product.base_price)),
            Column::RecommendedPrice => product.recommended_price.map(Scalar::Number),
            Column::Weight => product.weight.map(Scalar::Number),
            Column::IsNew => Some(Scalar::Bool(product.is_new)),
            Column::IsActive => Some(Scalar::Bool(product.is_active)),
            Column::IsBestseller => Some(Scalar::Bool(product.is_bestseller)),
            Column::BrandId => product.brand_id.map(|id| Scalar::Number(Decimal::from(id))),
            Column::CreatedAt => Some(Scalar::Date(DateBound::Instant(product.created_at))),
            Column::UpdatedAt => Some(Scalar::Date(DateBound::Instant(product.updated_at))),
        }
    }

    /// Document path in the MongoDB collection
    pub fn document_path(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Sku => "sku",
            Column::Slug => "slug",
            Column::Description => "description",
            Column::BasePrice => "base_price",
            Column::RecommendedPrice => "recommended_price",
            Column::Weight => "weight",
            Column::IsNew => "is_new",
            Column::IsActive => "is_active",
            Column::IsBestseller => "is_bestseller",
            Column::BrandId => "brand_id",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
        }
    }

    /// All scalar columns, in document order
    pub fn all() -> &'static [Column] {
        &[
            Column::Id,
            Column::Name,
            Column::Sku,
            Column::Slug,
            Column::Description,
            Column::BasePrice,
            Column::RecommendedPrice,
            Column::Weight,
            Column::IsNew,
            Column::IsActive,
            Column::IsBestseller,
            Column::BrandId,
            Column::CreatedAt,
            Column::UpdatedAt,
        ]
    }
}

/// Text column reached through a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedColumn {
    BrandName,
    CategoryName,
    WarehouseName,
}

impl RelatedColumn {
    /// Every related value; an unloaded relation has none
    pub fn values(&self, product: &Product) -> Vec<String> {
        match self {
            RelatedColumn::BrandName => product
                .brand
                .loaded()
                .and_then(|b| b.as_ref())
                .map(|b| vec![b.name.clone()])
                .unwrap_or_default(),
            RelatedColumn::CategoryName => product
                .categories
                .loaded()
                .map(|cats| cats.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default(),
            RelatedColumn::WarehouseName => product
                .warehouses
                .loaded()
                .map(|whs| whs.iter().map(|w| w.name.clone()).collect())
                .unwrap_or_default(),
        }
    }

    /// `(relation, field)` in the MongoDB document
    pub fn document_path(&self) -> (&'static str, &'static str) {
        match self {
            RelatedColumn::BrandName => ("brand", "name"),
            RelatedColumn::CategoryName => ("categories", "name"),
            RelatedColumn::WarehouseName => ("warehouses", "name"),
        }
    }

    /// Whether the relation is to-many (needs `$elemMatch`)
    pub fn is_collection(&self) -> bool {
        !matches!(self, RelatedColumn::BrandName)
    }
}

/// Numeric fold over a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum of available quantity over all warehouses
    TotalStock,
    /// Number of images
    ImageCount,
}

impl Aggregate {
    pub fn value(&self, product: &Product) -> Decimal {
        match self {
            Aggregate::TotalStock => {
                let total: i64 = product
                    .warehouses
                    .loaded()
                    .map(|whs| {
                        whs.iter()
                            .filter_map(|w| w.pivot.loaded())
                            .map(|p| p.available)
                            .sum()
                    })
                    .unwrap_or(0);
                Decimal::from(total)
            }
            Aggregate::ImageCount => {
                Decimal::from(product.images.loaded().map_or(0, |imgs| imgs.len()) as i64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_instant_against_day_uses_date_only() {
        let stored = Scalar::Date(DateBound::Instant(
            day(2024, 3, 5).and_hms_opt(23, 59, 0).unwrap(),
        ));
        let bound = Scalar::Date(DateBound::Day(day(2024, 3, 5)));
        assert_eq!(stored.compare(&bound), Some(Ordering::Equal));
    }

    #[test]
    fn test_instant_against_instant_uses_time() {
        let stored = Scalar::Date(DateBound::Instant(
            day(2024, 3, 5).and_hms_opt(10, 0, 0).unwrap(),
        ));
        let bound = Scalar::Date(DateBound::Instant(
            day(2024, 3, 5).and_hms_opt(12, 0, 0).unwrap(),
        ));
        assert_eq!(stored.compare(&bound), Some(Ordering::Less));
    }

    #[test]
    fn test_mismatched_scalars_do_not_compare() {
        assert_eq!(
            Scalar::Text("1".into()).compare(&Scalar::Number(Decimal::ONE)),
            None
        );
    }
}
