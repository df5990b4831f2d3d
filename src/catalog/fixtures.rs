//! Deterministic test catalog shared by unit tests

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::fields::FieldRegistry;
use crate::services::{FixedRateCurrency, Services, StaticPricing, StaticStock};

use super::{
    AttributeScalar, AttributeType, AttributeValue, Brand, Category, ClientId, DynamicAttribute,
    Image, MemoryCatalog, Product, Relation, StockPivot, WarehouseStock,
};

pub const PRODUCT_COUNT: i64 = 20;
pub const COLOR_ATTRIBUTE: i64 = 1;

/// 10% discount, Moscow region
pub const DISCOUNT_CLIENT: ClientId = ClientId(7);
/// Known client with no discount and no region
pub const ZERO_DISCOUNT_CLIENT: ClientId = ClientId(8);

fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

pub fn color_attribute() -> DynamicAttribute {
    DynamicAttribute {
        id: COLOR_ATTRIBUTE,
        slug: "color".to_string(),
        name: "Цвет".to_string(),
        kind: AttributeType::Select,
        unit: None,
        values: vec![
            "красный".to_string(),
            "синий".to_string(),
            "зелёный".to_string(),
        ],
    }
}

/// Fully loaded product number `i` (1-based)
pub fn product(i: i64) -> Product {
    let brand = (i % 3 != 0).then(|| {
        if i % 2 == 1 {
            Brand {
                id: 1,
                name: "Acme".to_string(),
                slug: "acme".to_string(),
            }
        } else {
            Brand {
                id: 2,
                name: "Globex".to_string(),
                slug: "globex".to_string(),
            }
        }
    });

    let category = if i % 2 == 0 {
        Category {
            id: 10,
            name: "Телефоны".to_string(),
            slug: "phones".to_string(),
            ancestors: Relation::Loaded(vec!["Электроника".to_string()]),
        }
    } else {
        Category {
            id: 20,
            name: "Светильники".to_string(),
            slug: "lamps".to_string(),
            ancestors: Relation::Loaded(vec!["Дом".to_string()]),
        }
    };

    let mut warehouses = vec![WarehouseStock {
        id: 1,
        name: "Central".to_string(),
        region: "msk".to_string(),
        pivot: Relation::Loaded(StockPivot {
            available: i,
            preorder: 2,
        }),
    }];
    if i % 2 == 0 {
        warehouses.push(WarehouseStock {
            id: 2,
            name: "North".to_string(),
            region: "spb".to_string(),
            pivot: Relation::Loaded(StockPivot {
                available: 3,
                preorder: 0,
            }),
        });
    }

    let front = Image {
        url: format!("https://cdn.example.com/p{i}/front.jpg"),
        position: 0,
    };
    let images = if i % 4 == 0 {
        vec![
            Image {
                url: format!("https://cdn.example.com/p{i}/back.jpg"),
                position: 1,
            },
            front,
        ]
    } else {
        vec![front]
    };

    let colors: &[&str] = if i % 3 == 0 {
        &["красный", "синий"]
    } else {
        &["зелёный"]
    };
    let attribute_values = colors
        .iter()
        .map(|c| AttributeValue {
            attribute_id: COLOR_ATTRIBUTE,
            value: AttributeScalar::Text(c.to_string()),
        })
        .collect();

    Product {
        id: i,
        name: format!("Товар {i}"),
        sku: format!("SKU-{i:03}"),
        slug: format!("product-{i}"),
        description: (i % 2 == 0).then(|| format!("Описание товара {i}")),
        base_price: Decimal::from(100 * i),
        recommended_price: Some(Decimal::from(120 * i)),
        weight: Some(Decimal::new(5 * i, 1)),
        is_new: matches!(i % 5, 0 | 1),
        is_active: i % 7 != 0,
        is_bestseller: i % 4 == 0,
        brand_id: brand.as_ref().map(|b| b.id),
        created_at: at(1, i as u32, 10),
        updated_at: at(2, i as u32, 12),
        brand: Relation::Loaded(brand),
        categories: Relation::Loaded(vec![category]),
        warehouses: Relation::Loaded(warehouses),
        images: Relation::Loaded(images),
        attribute_values: Relation::Loaded(attribute_values),
    }
}

pub fn products() -> Vec<Product> {
    (1..=PRODUCT_COUNT).map(product).collect()
}

pub fn registry() -> FieldRegistry {
    FieldRegistry::build(&[color_attribute()]).unwrap()
}

pub fn services() -> Services {
    Services {
        pricing: Arc::new(StaticPricing::new(HashMap::from([
            (DISCOUNT_CLIENT, Decimal::from(10)),
            (ZERO_DISCOUNT_CLIENT, Decimal::ZERO),
        ]))),
        stock: Arc::new(StaticStock::new(HashMap::from([(
            DISCOUNT_CLIENT,
            "msk".to_string(),
        )]))),
        currency: Arc::new(FixedRateCurrency::new(
            "RUB",
            HashMap::from([("USD".to_string(), Decimal::new(125, 4))]),
            Decimal::ONE,
        )),
        base_currency: "RUB".to_string(),
    }
}

pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::new(products(), vec![color_attribute()])
}
