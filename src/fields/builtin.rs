//! Built-in product fields
//!
//! Display names follow the storefront's admin language. Keys are stable and
//! referenced by persisted profiles, so they must never be renamed.

use crate::catalog::{Aggregate, Column, Product, RelatedColumn};
use crate::error::Result;
use crate::services::StockKind;

use super::{FieldDescriptor, FieldValue, FilterSource, ModifierType, Personalized, ValueType};

const GROUP_PRICES: &str = "Цены";
const GROUP_FLAGS: &str = "Признаки";
const GROUP_DATES: &str = "Даты";
const GROUP_RELATIONS: &str = "Бренд и категории";
const GROUP_MEDIA: &str = "Медиа";
const GROUP_STOCK: &str = "Склад";
const GROUP_CLIENT: &str = "Персональные данные клиента";

/// The static field table, in default display order
pub fn builtin_fields() -> Vec<FieldDescriptor> {
    vec![
        // Columns
        FieldDescriptor::direct("id", "ID", ValueType::Numeric, Column::Id),
        FieldDescriptor::direct("name", "Наименование", ValueType::Text, Column::Name),
        FieldDescriptor::direct("sku", "Артикул", ValueType::Text, Column::Sku),
        FieldDescriptor::direct("slug", "ЧПУ", ValueType::Text, Column::Slug),
        FieldDescriptor::direct("description", "Описание", ValueType::Text, Column::Description),
        FieldDescriptor::direct("weight", "Вес, кг", ValueType::Numeric, Column::Weight),
        FieldDescriptor::direct("brand_id", "ID бренда", ValueType::Numeric, Column::BrandId),
        FieldDescriptor::direct("base_price", "Базовая цена", ValueType::Numeric, Column::BasePrice)
            .group(GROUP_PRICES)
            .modifier(ModifierType::Price)
            .describe("Price in the catalog base currency before any discount"),
        FieldDescriptor::direct(
            "recommended_price",
            "Рекомендованная цена",
            ValueType::Numeric,
            Column::RecommendedPrice,
        )
        .group(GROUP_PRICES)
        .modifier(ModifierType::Price)
        .filter_only(),
        FieldDescriptor::direct("is_new", "Новинка", ValueType::Boolean, Column::IsNew)
            .group(GROUP_FLAGS)
            .modifier(ModifierType::Boolean),
        FieldDescriptor::direct("is_active", "Активен", ValueType::Boolean, Column::IsActive)
            .group(GROUP_FLAGS)
            .modifier(ModifierType::Boolean),
        FieldDescriptor::direct("is_bestseller", "Хит продаж", ValueType::Boolean, Column::IsBestseller)
            .group(GROUP_FLAGS)
            .modifier(ModifierType::Boolean),
        FieldDescriptor::direct("created_at", "Дата создания", ValueType::Date, Column::CreatedAt)
            .group(GROUP_DATES),
        FieldDescriptor::direct("updated_at", "Дата изменения", ValueType::Date, Column::UpdatedAt)
            .group(GROUP_DATES),
        // Relations
        FieldDescriptor::derived("brand.name", "Бренд", ValueType::Text, brand_name)
            .group(GROUP_RELATIONS)
            .prefetch(&["brand"])
            .filter_by(FilterSource::Related(RelatedColumn::BrandName)),
        FieldDescriptor::derived("brand.slug", "ЧПУ бренда", ValueType::Text, brand_slug)
            .group(GROUP_RELATIONS)
            .prefetch(&["brand"]),
        FieldDescriptor::derived("categories.name", "Категории", ValueType::Text, category_names)
            .group(GROUP_RELATIONS)
            .modifier(ModifierType::MultiValue)
            .prefetch(&["categories"])
            .filter_by(FilterSource::Related(RelatedColumn::CategoryName)),
        FieldDescriptor::derived("category_path", "Путь категории", ValueType::Text, category_path)
            .group(GROUP_RELATIONS)
            .prefetch(&["categories.ancestors"])
            .describe("Primary category with its ancestors, root first"),
        // Media
        FieldDescriptor::derived("images", "Изображения", ValueType::Text, image_urls)
            .group(GROUP_MEDIA)
            .modifier(ModifierType::MultiValue)
            .prefetch(&["images"]),
        FieldDescriptor::derived("main_image", "Главное изображение", ValueType::Text, main_image)
            .group(GROUP_MEDIA)
            .prefetch(&["images"]),
        FieldDescriptor::derived("images_count", "Количество изображений", ValueType::Numeric, image_count)
            .group(GROUP_MEDIA)
            .prefetch(&["images"])
            .filter_by(FilterSource::Aggregate(Aggregate::ImageCount)),
        // Stock
        FieldDescriptor::derived("warehouses.name", "Склады", ValueType::Text, warehouse_names)
            .group(GROUP_STOCK)
            .modifier(ModifierType::MultiValue)
            .prefetch(&["warehouses"])
            .filter_by(FilterSource::Related(RelatedColumn::WarehouseName)),
        FieldDescriptor::derived("stock.total", "Общий остаток", ValueType::Numeric, total_stock)
            .group(GROUP_STOCK)
            .prefetch(&["warehouses.pivot"])
            .filter_by(FilterSource::Aggregate(Aggregate::TotalStock)),
        FieldDescriptor::derived(
            "stock.by_warehouse",
            "Остатки по складам",
            ValueType::Text,
            stock_by_warehouse,
        )
        .group(GROUP_STOCK)
        .modifier(ModifierType::MultiValue)
        .prefetch(&["warehouses.pivot"]),
        FieldDescriptor::derived("in_stock", "В наличии", ValueType::Boolean, in_stock)
            .group(GROUP_STOCK)
            .modifier(ModifierType::Boolean)
            .prefetch(&["warehouses.pivot"]),
        // Client context
        FieldDescriptor::personalized(
            "discount_percent",
            "Скидка клиента, %",
            ValueType::Numeric,
            Personalized::DiscountPercent,
        )
        .group(GROUP_CLIENT),
        FieldDescriptor::personalized(
            "discounted_price",
            "Цена со скидкой",
            ValueType::Numeric,
            Personalized::DiscountedPrice,
        )
        .group(GROUP_CLIENT)
        .modifier(ModifierType::Price)
        .describe("Base price less the client's discount; the base price without a client"),
        FieldDescriptor::personalized(
            "stock.regional_available",
            "Доступно в регионе клиента",
            ValueType::Numeric,
            Personalized::RegionalStock(StockKind::Available),
        )
        .group(GROUP_CLIENT)
        .prefetch(&["warehouses.pivot"]),
        FieldDescriptor::personalized(
            "stock.regional_preorder",
            "Предзаказ в регионе клиента",
            ValueType::Numeric,
            Personalized::RegionalStock(StockKind::Preorder),
        )
        .group(GROUP_CLIENT)
        .prefetch(&["warehouses.pivot"]),
    ]
}

fn brand_name(item: &Product) -> Result<FieldValue> {
    Ok(item
        .brand
        .get("brand")?
        .as_ref()
        .map_or(FieldValue::Null, |b| FieldValue::Text(b.name.clone())))
}

fn brand_slug(item: &Product) -> Result<FieldValue> {
    Ok(item
        .brand
        .get("brand")?
        .as_ref()
        .map_or(FieldValue::Null, |b| FieldValue::Text(b.slug.clone())))
}

fn category_names(item: &Product) -> Result<FieldValue> {
    let cats = item.categories.get("categories")?;
    Ok(FieldValue::List(cats.iter().map(|c| c.name.clone()).collect()))
}

fn category_path(item: &Product) -> Result<FieldValue> {
    let cats = item.categories.get("categories")?;
    let Some(primary) = cats.first() else {
        return Ok(FieldValue::Null);
    };
    let mut path = primary.ancestors.get("categories.ancestors")?.clone();
    path.push(primary.name.clone());
    Ok(FieldValue::Text(path.join(" / ")))
}

fn sorted_images(item: &Product) -> Result<Vec<&crate::catalog::Image>> {
    let mut images: Vec<_> = item.images.get("images")?.iter().collect();
    images.sort_by_key(|img| img.position);
    Ok(images)
}

fn image_urls(item: &Product) -> Result<FieldValue> {
    Ok(FieldValue::List(
        sorted_images(item)?.into_iter().map(|img| img.url.clone()).collect(),
    ))
}

fn main_image(item: &Product) -> Result<FieldValue> {
    Ok(sorted_images(item)?
        .first()
        .map_or(FieldValue::Null, |img| FieldValue::Text(img.url.clone())))
}

fn image_count(item: &Product) -> Result<FieldValue> {
    Ok(FieldValue::Integer(item.images.get("images")?.len() as i64))
}

fn warehouse_names(item: &Product) -> Result<FieldValue> {
    let whs = item.warehouses.get("warehouses")?;
    Ok(FieldValue::List(whs.iter().map(|w| w.name.clone()).collect()))
}

fn available_total(item: &Product) -> Result<i64> {
    let mut total = 0;
    for warehouse in item.warehouses.get("warehouses")? {
        total += warehouse.pivot.get("warehouses.pivot")?.available;
    }
    Ok(total)
}

fn total_stock(item: &Product) -> Result<FieldValue> {
    available_total(item).map(FieldValue::Integer)
}

fn in_stock(item: &Product) -> Result<FieldValue> {
    available_total(item).map(|total| FieldValue::Bool(total > 0))
}

fn stock_by_warehouse(item: &Product) -> Result<FieldValue> {
    let mut entries = Vec::new();
    for warehouse in item.warehouses.get("warehouses")? {
        let pivot = warehouse.pivot.get("warehouses.pivot")?;
        entries.push(format!("{}: {}", warehouse.name, pivot.available));
    }
    Ok(FieldValue::List(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::planner::{FetchPlan, RelationPath};

    #[test]
    fn test_builtin_keys_are_unique() {
        let fields = builtin_fields();
        let mut keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        keys.sort();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn test_recommended_price_is_filter_only() {
        let fields = builtin_fields();
        let field = fields.iter().find(|f| f.key == "recommended_price").unwrap();
        assert!(field.is_filterable());
        assert!(!field.is_exportable());
    }

    #[test]
    fn test_category_path_joins_ancestors() {
        let item = fixtures::product(2);
        assert_eq!(
            category_path(&item).unwrap(),
            FieldValue::Text("Электроника / Телефоны".to_string())
        );
    }

    #[test]
    fn test_stock_fields_need_pivot() {
        let plan = FetchPlan::from_paths(vec![RelationPath::parse("warehouses").unwrap()]);
        let item = plan.materialize(&fixtures::product(2));
        assert!(warehouse_names(&item).is_ok());
        assert!(total_stock(&item).is_err());
    }

    #[test]
    fn test_images_sorted_by_position() {
        let item = fixtures::product(4);
        assert_eq!(
            main_image(&item).unwrap(),
            FieldValue::Text("https://cdn.example.com/p4/front.jpg".to_string())
        );
    }
}
